// Every way a capture can fail. All of them abort the run; nothing is retried.
// Each variant states *where* things went wrong and carries the I/O cause.
use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    /// The framebuffer device could not be opened.
    #[error("cannot open framebuffer device {}", .path.display())]
    DeviceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The device refused the screen-info query (or the platform has none).
    #[error("cannot query framebuffer geometry of {}", .path.display())]
    GeometryQuery {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unsupported pixel format: {bits_per_pixel} bits per pixel is not a whole number of bytes")]
    UnsupportedFormat { bits_per_pixel: u32 },

    #[error("capture of {width}x{height} at {bytes_per_pixel} bytes per pixel is too large for a bitmap")]
    GeometryOverflow {
        width: u32,
        height: u32,
        bytes_per_pixel: u32,
    },

    /// Visible area shifted by the pan offsets does not fit in the virtual buffer.
    #[error(
        "viewport {width}x{height}+{x_offset}+{y_offset} exceeds virtual framebuffer {virtual_width}x{virtual_height}"
    )]
    ViewportOutOfBounds {
        width: u32,
        height: u32,
        x_offset: u32,
        y_offset: u32,
        virtual_width: u32,
        virtual_height: u32,
    },

    #[error("failed to read framebuffer row {row}")]
    ReadFailure {
        row: u32,
        #[source]
        source: io::Error,
    },

    #[error("cannot create output file {}", .path.display())]
    OutputOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write output file {}", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
