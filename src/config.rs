// Command-line surface and the immutable settings one capture runs with.
use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_DEVICE: &str = "/dev/fb0";
pub const DEFAULT_OUTPUT: &str = "output.bmp";

#[derive(Parser, Debug)]
#[command(name = "fbshot")]
#[command(about = "Save the contents of a framebuffer device as a BMP file")]
pub struct Cli {
    /// Framebuffer device to read
    #[arg(short = 'f', value_name = "PATH", default_value = DEFAULT_DEVICE)]
    pub device: PathBuf,

    /// Where to write the bitmap
    #[arg(short = 'o', value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Capture the whole virtual framebuffer, including any off-screen area
    #[arg(short = 'v')]
    pub full_virtual: bool,

    /// Log progress to stderr (RUST_LOG overrides)
    #[arg(long)]
    pub verbose: bool,
}

/// Settings for one capture, built once from the command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureConfig {
    pub device: PathBuf,
    pub output: PathBuf,
    pub full_virtual: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEVICE),
            output: PathBuf::from(DEFAULT_OUTPUT),
            full_virtual: false,
        }
    }
}

impl From<&Cli> for CaptureConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            device: cli.device.clone(),
            output: cli.output.clone(),
            full_virtual: cli.full_virtual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("fbshot").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]).unwrap();
        assert_eq!(CaptureConfig::from(&cli), CaptureConfig::default());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_overrides() {
        let cli = parse(&["-f", "/dev/fb1", "-o", "/tmp/shot.bmp", "-v"]).unwrap();
        let config = CaptureConfig::from(&cli);
        assert_eq!(config.device, PathBuf::from("/dev/fb1"));
        assert_eq!(config.output, PathBuf::from("/tmp/shot.bmp"));
        assert!(config.full_virtual);
    }

    #[test]
    fn test_missing_values_are_errors() {
        assert_eq!(parse(&["-f"]).unwrap_err().kind(), ErrorKind::InvalidValue);
        assert_eq!(parse(&["-o"]).unwrap_err().kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn test_unknown_flag_is_error() {
        assert_eq!(parse(&["-x"]).unwrap_err().kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_help_is_not_a_capture() {
        assert_eq!(parse(&["--help"]).unwrap_err().kind(), ErrorKind::DisplayHelp);
    }
}
