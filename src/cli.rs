//! Command-line interface for dropcue
//!
//! Provides argument parsing using clap derive macros.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Find the right moment to drop a voicemail message
#[derive(Parser, Debug)]
#[command(
    name = "dropcue",
    version,
    about = "Finds the drop point in answered-machine call audio"
)]
pub struct Cli {
    /// WAV file or directory of WAV files to analyze
    pub input: PathBuf,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Deliver chunks at wall-clock speed, as on a live call
    /// (implied when transcription is active)
    #[arg(long)]
    pub paced: bool,

    /// Disable speech-to-text even if an API key is configured
    #[arg(long)]
    pub no_stt: bool,

    /// One summary line per file instead of the full report
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose output (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Override the silence wait before dropping without a beep.
    /// Examples: 2s, 1500ms, 1m
    #[arg(long, value_name = "DURATION", value_parser = parse_wait)]
    pub beep_wait: Option<Duration>,
}

/// Parse a wait duration string.
///
/// Supports any duration format accepted by `humantime`: bare numbers
/// (seconds), single-unit (`2s`, `800ms`), and compound (`1m30s`).
fn parse_wait(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    // Bare number → seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_invocation() {
        let cli = Cli::try_parse_from(["dropcue", "greeting.wav"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("greeting.wav"));
        assert!(!cli.paced);
        assert!(!cli.no_stt);
        assert!(cli.beep_wait.is_none());
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "dropcue",
            "calls/",
            "--paced",
            "--no-stt",
            "-q",
            "-vv",
            "--beep-wait",
            "3s",
        ])
        .unwrap();

        assert!(cli.paced);
        assert!(cli.no_stt);
        assert!(cli.quiet);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.beep_wait, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_parse_wait_formats() {
        assert_eq!(parse_wait("2"), Ok(Duration::from_secs(2)));
        assert_eq!(parse_wait("800ms"), Ok(Duration::from_millis(800)));
        assert_eq!(parse_wait("1m30s"), Ok(Duration::from_secs(90)));
        assert!(parse_wait("soon").is_err());
    }

    #[test]
    fn test_input_is_required() {
        assert!(Cli::try_parse_from(["dropcue"]).is_err());
    }
}
