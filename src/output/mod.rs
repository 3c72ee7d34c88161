//! Output file publishing, sequence persistence and final verification

use serde::{Deserialize, Serialize};

pub mod sequence_store;
pub mod verifier;
pub mod writer;

pub use sequence_store::SequenceStore;
pub use verifier::OutputVerifier;
pub use writer::OutputWriter;

/// Output naming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// File name prefix before the timestamp
    pub prefix: String,
    /// Container extension
    pub extension: String,
    /// chrono format string for the timestamp part
    pub timestamp_format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            prefix: "assembled_video".to_string(),
            extension: "mp4".to_string(),
            timestamp_format: "%Y%m%d_%H%M%S".to_string(),
        }
    }
}

/// Outcome of the final duration check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub success: bool,
    pub expected_duration: f64,
    pub actual_duration: Option<f64>,
    /// Accepted absolute difference in seconds
    pub tolerance: f64,
    pub message: Option<String>,
}
