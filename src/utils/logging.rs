//! Logging setup for the command line

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable multi-line format
    Pretty,
    /// Single-line text format
    #[default]
    Compact,
    /// One JSON object per line
    Json,
}

/// Filter used when `RUST_LOG` is unset; our own crate logs at `level`, everything else at warn
pub fn default_directive(level: &str) -> String {
    format!("warn,reelsmith={}", level.trim().to_lowercase())
}

/// Install the global subscriber. Logs always go to stderr so stdout stays machine readable.
pub fn init_logging(level: &str, format: LogFormat) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(level)))
        .map_err(|e| format!("invalid log level '{}': {}", level, e))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = match format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive("DEBUG"), "warn,reelsmith=debug");
        assert!(EnvFilter::try_new(default_directive("info")).is_ok());
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(LogFormat::from_str("json", true), Ok(LogFormat::Json));
        assert_eq!(LogFormat::default(), LogFormat::Compact);
    }
}
