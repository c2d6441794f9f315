// fbshot: take a screenshot of a Linux framebuffer console.
//
// What happens on a run:
// • the device (default /dev/fb0) is opened and asked for its geometry once,
// • the visible area (or with -v the whole virtual buffer) is read row by row,
// • the rows are packed into a top-down, uncompressed BMP in memory,
// • the finished file is written out with a single write (default output.bmp).
// Any failure stops the run with exit code 1 and nothing is written.

mod bmp;
mod config;
mod error;
mod framebuffer;
mod geometry;
mod output;
mod types;

use std::io::{Read, Seek};
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use config::{CaptureConfig, Cli};
use error::CaptureError;
use framebuffer::{Framebuffer, FramebufferRows};
use types::FramebufferGeometry;

fn main() -> ExitCode {
    /* --- Arguments ---
       --help prints usage and exits 0; any other parse error is exit 1. */
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    init_logging(cli.verbose);
    let config = CaptureConfig::from(&cli);

    /* --- Capture --- */
    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(?err, "capture failed");
            eprintln!("error: {}", error_chain(&err));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(config: &CaptureConfig) -> Result<(), CaptureError> {
    let mut fb = Framebuffer::open(&config.device)?;
    let geometry = fb.geometry();
    info!(
        device = %fb.path().display(),
        "{}x{} visible, {}x{} virtual, {} bpp",
        geometry.width,
        geometry.height,
        geometry.virtual_width,
        geometry.virtual_height,
        geometry.bits_per_pixel
    );
    capture_to_file(&geometry, fb.device(), config)
}

/// Resolve, read, encode, write. The output file is only touched once the
/// whole bitmap exists in memory.
fn capture_to_file<R: Read + Seek>(
    fb: &FramebufferGeometry,
    device: R,
    config: &CaptureConfig,
) -> Result<(), CaptureError> {
    // 1) Geometry first, so format/size problems never touch the device.
    let capture = geometry::resolve(fb, config.full_virtual)?;

    // 2) Rows -> bitmap.
    let mut rows = FramebufferRows::new(device, &capture);
    let data = bmp::encode(&capture, &mut rows)?;

    // 3) One write of the finished buffer.
    output::write_bmp(&config.output, &data)?;
    info!(
        width = capture.width,
        height = capture.height,
        rows = rows.rows_read(),
        bytes = data.len(),
        path = %config.output.display(),
        "screenshot saved"
    );
    Ok(())
}

/// "outer: inner: innermost" for an error and its sources.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
