// Opens a framebuffer device, asks it for its geometry, and reads pixel rows
// out of it one at a time.
// Result: `Framebuffer::open("/dev/fb0")` gives you the screen-info snapshot
// plus a Read + Seek handle; `FramebufferRows` walks that handle row by row.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::CaptureError;
use crate::types::{CaptureGeometry, FramebufferGeometry};

/// Anything that can fill the next captured row. The encoder calls this once
/// per row, top to bottom, with a slice exactly `width * bytes_per_pixel` long.
pub trait RowSource {
    fn read_row(&mut self, row: &mut [u8]) -> Result<(), CaptureError>;
}

// ── Device ──────────────────────────────────────────────────────────────────

/// An open framebuffer device and the geometry it reported when opened.
pub struct Framebuffer {
    file: File,
    path: PathBuf,
    geometry: FramebufferGeometry,
}

impl Framebuffer {
    /// Open the device read-only and query its screen info once.
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        // 1) Open the node (usually needs the `video` group or root).
        let file = File::open(path).map_err(|source| CaptureError::DeviceOpen {
            path: path.to_path_buf(),
            source,
        })?;

        // 2) Snapshot the geometry; it is not re-read during the capture.
        let geometry = query_geometry(&file).map_err(|source| CaptureError::GeometryQuery {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(
            device = %path.display(),
            xres = geometry.width,
            yres = geometry.height,
            xres_virtual = geometry.virtual_width,
            yres_virtual = geometry.virtual_height,
            xoffset = geometry.x_offset,
            yoffset = geometry.y_offset,
            bits_per_pixel = geometry.bits_per_pixel,
            "framebuffer opened"
        );

        Ok(Self { file, path: path.to_path_buf(), geometry })
    }

    pub fn geometry(&self) -> FramebufferGeometry {
        self.geometry
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw pixel store, for handing to [`FramebufferRows`].
    pub fn device(&mut self) -> &mut File {
        &mut self.file
    }
}

#[cfg(target_os = "linux")]
fn query_geometry(file: &File) -> io::Result<FramebufferGeometry> {
    use std::os::fd::AsRawFd;

    // <linux/fb.h>
    const FBIOGET_VSCREENINFO: u32 = 0x4600;

    #[repr(C)]
    #[derive(Default)]
    #[allow(dead_code)]
    struct FbBitfield {
        offset: u32,
        length: u32,
        msb_right: u32,
    }

    #[repr(C)]
    #[derive(Default)]
    #[allow(dead_code)]
    struct FbVarScreeninfo {
        xres: u32,
        yres: u32,
        xres_virtual: u32,
        yres_virtual: u32,
        xoffset: u32,
        yoffset: u32,
        bits_per_pixel: u32,
        grayscale: u32,
        red: FbBitfield,
        green: FbBitfield,
        blue: FbBitfield,
        transp: FbBitfield,
        nonstd: u32,
        activate: u32,
        height: u32,
        width: u32,
        accel_flags: u32,
        pixclock: u32,
        left_margin: u32,
        right_margin: u32,
        upper_margin: u32,
        lower_margin: u32,
        hsync_len: u32,
        vsync_len: u32,
        sync: u32,
        vmode: u32,
        rotate: u32,
        colorspace: u32,
        reserved: [u32; 4],
    }

    let mut info = FbVarScreeninfo::default();
    // SAFETY: FBIOGET_VSCREENINFO writes exactly one fb_var_screeninfo into the
    // pointer, and `info` is a live, properly laid out value of that type.
    let rc = unsafe {
        libc::ioctl(
            file.as_raw_fd(),
            FBIOGET_VSCREENINFO as _,
            &mut info as *mut FbVarScreeninfo,
        )
    };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }

    Ok(FramebufferGeometry {
        width: info.xres,
        height: info.yres,
        virtual_width: info.xres_virtual,
        virtual_height: info.yres_virtual,
        x_offset: info.xoffset,
        y_offset: info.yoffset,
        bits_per_pixel: info.bits_per_pixel,
    })
}

#[cfg(not(target_os = "linux"))]
fn query_geometry(_file: &File) -> io::Result<FramebufferGeometry> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "framebuffer devices are only supported on Linux",
    ))
}

// ── Row reader ──────────────────────────────────────────────────────────────

/// Reads the captured rectangle out of a device laid out as `virtual_height`
/// rows of `virtual_width` pixels.
///
/// The first read rewinds to offset 0 and skips `y_offset` whole rows; each
/// row then skips `x_offset` pixels, reads `width` pixels, and leaves the rest
/// of its virtual row to be skipped before the next one. Produces exactly
/// `height` rows; asking for more is an error.
pub struct FramebufferRows<R> {
    device: R,
    geometry: CaptureGeometry,
    next_row: u32,
    positioned: bool,
}

impl<R: Read + Seek> FramebufferRows<R> {
    pub fn new(device: R, geometry: &CaptureGeometry) -> Self {
        Self { device, geometry: *geometry, next_row: 0, positioned: false }
    }

    /// Rows handed out so far.
    pub fn rows_read(&self) -> u32 {
        self.next_row
    }

    fn read_next(&mut self, row: &mut [u8]) -> io::Result<()> {
        let g = &self.geometry;
        if row.len() != g.row_bytes() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("row buffer is {} bytes, expected {}", row.len(), g.row_bytes()),
            ));
        }

        let bpp = u64::from(g.bytes_per_pixel);
        let lead = u64::from(g.viewport.x_offset) * bpp;

        // 1) Get to the start of this row's pixels.
        let skip = if self.positioned {
            // tail of the previous virtual row + left pan of this one
            g.virtual_row_bytes() - g.row_bytes() as u64
        } else {
            // rewind: the handle may not start at offset 0
            self.device.seek(SeekFrom::Start(0))?;
            self.positioned = true;
            u64::from(g.viewport.y_offset) * g.virtual_row_bytes() + lead
        };
        self.skip(skip)?;

        // 2) Copy the visible pixels; a short read is an error, not a partial row.
        self.device.read_exact(row)?;
        trace!(row = self.next_row, bytes = row.len(), "row read");
        Ok(())
    }

    fn skip(&mut self, bytes: u64) -> io::Result<()> {
        if bytes == 0 {
            return Ok(());
        }
        let offset = i64::try_from(bytes)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "seek distance too large"))?;
        self.device.seek(SeekFrom::Current(offset))?;
        Ok(())
    }
}

impl<R: Read + Seek> RowSource for FramebufferRows<R> {
    fn read_row(&mut self, row: &mut [u8]) -> Result<(), CaptureError> {
        let index = self.next_row;
        if index >= self.geometry.height {
            return Err(CaptureError::ReadFailure {
                row: index,
                source: io::Error::new(io::ErrorKind::UnexpectedEof, "all rows already read"),
            });
        }
        self.read_next(row)
            .map_err(|source| CaptureError::ReadFailure { row: index, source })?;
        self.next_row += 1;
        Ok(())
    }
}
