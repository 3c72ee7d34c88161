//! Media engine: per-entry normalization, timeline rendering and progress reporting

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

pub mod normalizer;
pub mod progress;
pub mod renderer;

pub use normalizer::MediaNormalizer;
pub use progress::{ProgressCallback, ProgressPhase, ProgressTracker};
pub use renderer::{ConcatDemuxRenderer, FilterGraphRenderer};

/// Fixed encoding contract shared by normalization and rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingSettings {
    /// Output frame rate
    pub fps: u32,
    /// Video encoder
    pub video_codec: String,
    /// Audio encoder for the final file
    pub audio_codec: String,
    /// Encoder preset
    pub preset: String,
    /// Constant Rate Factor (0-51)
    pub crf: u8,
    /// Pixel format of every produced clip
    pub pixel_format: String,
    /// Audio bitrate for the final file
    pub audio_bitrate: String,
    /// Sample rate of intermediate and final audio
    pub sample_rate: u32,
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            fps: 30,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "medium".to_string(),
            crf: 22,
            pixel_format: "yuv420p".to_string(),
            audio_bitrate: "192k".to_string(),
            sample_rate: 44100,
        }
    }
}

impl EncodingSettings {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.fps == 0 || self.fps > 120 {
            return Err(DomainError::Config(format!(
                "fps must be between 1 and 120, got {}",
                self.fps
            )));
        }
        if self.crf > 51 {
            return Err(DomainError::Config(
                "CRF value cannot exceed 51".to_string(),
            ));
        }
        if self.video_codec.trim().is_empty() || self.audio_codec.trim().is_empty() {
            return Err(DomainError::Config("codec names cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Video encoder arguments
    pub fn video_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.video_codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
            "-r".to_string(),
            self.fps.to_string(),
        ]
    }

    /// Final audio encoder arguments
    pub fn audio_args(&self) -> Vec<String> {
        vec![
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
            "-ar".to_string(),
            self.sample_rate.to_string(),
        ]
    }
}

/// Leading arguments of every ffmpeg run
pub(crate) fn base_args() -> Vec<String> {
    vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-nostdin".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
    ]
}
