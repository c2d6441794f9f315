// Turns the device's screen info into the rectangle we capture and the byte
// layout of the bitmap that will hold it.
// Result: a CaptureGeometry that the row reader and the encoder both follow.
use tracing::debug;

use crate::bmp::HEADER_SIZE;
use crate::error::CaptureError;
use crate::types::{CaptureGeometry, FramebufferGeometry, Viewport};

/// Work out what to capture.
///
/// With `full_virtual` the whole backing buffer is taken and the pan offsets
/// are ignored; otherwise only the visible area at the current pan position.
/// Pure function: no device access happens here, so format and size problems
/// surface before anything is read.
pub fn resolve(
    fb: &FramebufferGeometry,
    full_virtual: bool,
) -> Result<CaptureGeometry, CaptureError> {
    // 1) Whole bytes per pixel only; 1/2/4-bit packed formats are not handled.
    if fb.bits_per_pixel == 0
        || fb.bits_per_pixel % 8 != 0
        || fb.bits_per_pixel > u32::from(u16::MAX)
    {
        return Err(CaptureError::UnsupportedFormat {
            bits_per_pixel: fb.bits_per_pixel,
        });
    }
    let bytes_per_pixel = fb.bits_per_pixel / 8;

    // 2) Pick the rectangle: either all of the virtual buffer or the visible window.
    let (width, height, viewport) = if full_virtual {
        (
            fb.virtual_width,
            fb.virtual_height,
            Viewport { x_offset: 0, y_offset: 0, virtual_width: fb.virtual_width },
        )
    } else {
        let fits = u64::from(fb.x_offset) + u64::from(fb.width) <= u64::from(fb.virtual_width)
            && u64::from(fb.y_offset) + u64::from(fb.height) <= u64::from(fb.virtual_height);
        if !fits {
            return Err(CaptureError::ViewportOutOfBounds {
                width: fb.width,
                height: fb.height,
                x_offset: fb.x_offset,
                y_offset: fb.y_offset,
                virtual_width: fb.virtual_width,
                virtual_height: fb.virtual_height,
            });
        }
        (
            fb.width,
            fb.height,
            Viewport {
                x_offset: fb.x_offset,
                y_offset: fb.y_offset,
                virtual_width: fb.virtual_width,
            },
        )
    };

    // 3) Row layout: bitmap rows are padded out to a 4-byte boundary.
    let overflow = || CaptureError::GeometryOverflow { width, height, bytes_per_pixel };
    let row_bytes = u64::from(width) * u64::from(bytes_per_pixel);
    let row_padding = (4 - row_bytes % 4) % 4;
    let padded_row = row_bytes + row_padding;

    // 4) Total size must fit the header's u32 fields, the signed width/height
    //    fields, and this machine's address space.
    let image_size = padded_row.checked_mul(u64::from(height)).ok_or_else(overflow)?;
    let file_size = image_size + HEADER_SIZE as u64;
    if padded_row > u64::from(u32::MAX)
        || file_size > u64::from(u32::MAX)
        || usize::try_from(file_size).is_err()
        || i32::try_from(width).is_err()
        || i32::try_from(height).is_err()
    {
        return Err(overflow());
    }

    let geometry = CaptureGeometry {
        width,
        height,
        bytes_per_pixel,
        row_padding: row_padding as u32,
        image_size: image_size as u32,
        viewport,
    };
    debug!(
        width,
        height,
        bytes_per_pixel,
        row_padding = geometry.row_padding,
        image_size = geometry.image_size,
        full_virtual,
        "resolved capture geometry"
    );
    Ok(geometry)
}
