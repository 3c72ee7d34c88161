//! Error handling module for infrastructure concerns

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for process, file and format operations
#[derive(Error, Debug)]
pub enum ReelsmithError {
    /// External tool could not be found on PATH
    #[error("{program} not found; install it or set its path in the configuration")]
    ToolNotFound { program: String },

    /// External tool could not be started
    #[error("Failed to start {program}: {message}")]
    ToolSpawn { program: String, message: String },

    /// External tool ran and failed
    #[error("{program} exited with status {status}: {}", summarize(.stderr))]
    ToolFailed {
        program: String,
        status: String,
        /// Last lines written to stderr
        stderr: Vec<String>,
    },

    /// External tool produced output that could not be understood
    #[error("Unexpected {program} output: {message}")]
    ToolOutput { program: String, message: String },

    /// Manifest could not be read
    #[error("Invalid manifest {path}: {message}")]
    ManifestError { path: String, message: String },

    /// Configuration value error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Domain rule violation
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML error
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl ReelsmithError {
    /// Stderr lines of a failed tool run, empty for other errors
    pub fn stderr(&self) -> &[String] {
        match self {
            ReelsmithError::ToolFailed { stderr, .. } => stderr,
            _ => &[],
        }
    }
}

fn summarize(stderr: &[String]) -> String {
    match stderr.last() {
        Some(line) => line.clone(),
        None => "no error output".to_string(),
    }
}

/// Result type alias for infrastructure operations
pub type ReelsmithResult<T> = std::result::Result<T, ReelsmithError>;
