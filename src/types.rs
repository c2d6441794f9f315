// Core types shared by the resolver, the row reader and the encoder.

/// Screen-info snapshot taken from the device once per capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FramebufferGeometry {
    pub width: u32,          // visible columns (xres)
    pub height: u32,         // visible rows (yres)
    pub virtual_width: u32,  // columns in the backing buffer (xres_virtual)
    pub virtual_height: u32, // rows in the backing buffer (yres_virtual)
    pub x_offset: u32,       // horizontal pan of the visible area
    pub y_offset: u32,       // vertical pan of the visible area
    pub bits_per_pixel: u32,
}

/// Where the captured rectangle sits inside the virtual buffer.
/// Offsets are zero for a full-virtual capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub x_offset: u32,
    pub y_offset: u32,
    pub virtual_width: u32, // row stride of the device, in pixels
}

/// Everything derived from a [`FramebufferGeometry`] that the capture needs.
///
/// `width * bytes_per_pixel + row_padding` is always a multiple of 4, and
/// `54 + image_size` always fits the 32-bit size field of a bitmap header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureGeometry {
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
    pub row_padding: u32,  // zero bytes appended to each row, 0..=3
    pub image_size: u32,   // padded rows * height
    pub viewport: Viewport,
}

impl CaptureGeometry {
    /// Pixel bytes in one captured row, without padding.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.bytes_per_pixel as usize
    }

    /// Bytes one row occupies in the bitmap.
    pub fn padded_row_bytes(&self) -> usize {
        self.row_bytes() + self.row_padding as usize
    }

    /// Bytes in one full row of the device's virtual buffer.
    pub fn virtual_row_bytes(&self) -> u64 {
        u64::from(self.viewport.virtual_width) * u64::from(self.bytes_per_pixel)
    }

    pub fn bits_per_pixel(&self) -> u16 {
        // resolve() rejects depths that do not fit a u16
        (self.bytes_per_pixel * 8) as u16
    }
}
