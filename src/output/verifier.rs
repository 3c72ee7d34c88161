//! Final output verification

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::rules::frame_interval;
use crate::output::VerificationResult;
use crate::ports::ProbePort;

/// Checks the rendered file against the planned timeline length
pub struct OutputVerifier {
    probe: Arc<dyn ProbePort>,
    fps: u32,
}

impl OutputVerifier {
    pub fn new(probe: Arc<dyn ProbePort>, fps: u32) -> Self {
        Self { probe, fps }
    }

    /// Accepted drift for `entries` joined clips: one frame per clip plus container slack
    pub fn tolerance(&self, entries: usize) -> f64 {
        frame_interval(self.fps) * entries.max(1) as f64 + 0.05
    }

    /// Compare the duration of `output` with `expected_duration`
    pub async fn verify(&self, output: &Path, expected_duration: f64, entries: usize) -> VerificationResult {
        info!("Verifying output: {}", output.display());
        let tolerance = self.tolerance(entries);

        let probed = match self.probe.probe(output).await {
            Ok(probe) => probe,
            Err(err) => {
                warn!("Could not probe output: {}", err);
                return VerificationResult {
                    success: false,
                    expected_duration,
                    actual_duration: None,
                    tolerance,
                    message: Some(format!("could not probe output: {}", err)),
                };
            }
        };

        let (success, message) = match probed.duration {
            Some(actual) if (actual - expected_duration).abs() <= tolerance => (true, None),
            Some(actual) => (
                false,
                Some(format!(
                    "output is {:.3}s, expected {:.3}s",
                    actual, expected_duration
                )),
            ),
            None => (false, Some("output has no duration".to_string())),
        };

        if success {
            info!("Verification passed");
        } else {
            warn!("Verification failed: {:?}", message);
        }

        VerificationResult {
            success,
            expected_duration,
            actual_duration: probed.duration,
            tolerance,
            message,
        }
    }
}
