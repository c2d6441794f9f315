// Persists a finished bitmap. The buffer goes out in one write; a file that
// could not be written completely is removed again.
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use tracing::{info, warn};

use crate::error::CaptureError;

pub fn write_bmp(path: &Path, data: &[u8]) -> Result<(), CaptureError> {
    let mut file = File::create(path).map_err(|source| CaptureError::OutputOpen {
        path: path.to_path_buf(),
        source,
    })?;

    if let Err(source) = file.write_all(data).and_then(|()| file.flush()) {
        drop(file);
        discard_partial(path);
        return Err(CaptureError::OutputWrite { path: path.to_path_buf(), source });
    }

    info!(path = %path.display(), bytes = data.len(), "bitmap written");
    Ok(())
}

// Only regular files are removed; a fifo or device given as -o is left alone.
fn discard_partial(path: &Path) {
    let is_file = fs::metadata(path).map(|m| m.is_file()).unwrap_or(false);
    if is_file {
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), "could not remove partial output: {e}");
        }
    }
}
