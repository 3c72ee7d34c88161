// Probe LibAV adapter - Media file analysis using libav, enabled by the `libav` feature

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ffmpeg_next as ffmpeg;

use crate::domain::errors::*;
use crate::ports::*;

/// LibAV-based media probing adapter
pub struct ProbeLibavAdapter;

impl ProbeLibavAdapter {
    pub fn new() -> Result<Self, DomainError> {
        ffmpeg::init().map_err(|e| DomainError::Config(format!("libav initialization failed: {}", e)))?;
        Ok(Self)
    }

    fn probe_blocking(path: PathBuf) -> Result<MediaProbe, DomainError> {
        let probe_error = |message: String| DomainError::Probe {
            path: path.clone(),
            message,
        };

        let input = ffmpeg::format::input(&path).map_err(|e| probe_error(e.to_string()))?;

        let duration = match input.duration() {
            d if d > 0 => Some(d as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE)),
            _ => None,
        };

        let (width, height) = match input.streams().best(ffmpeg::media::Type::Video) {
            Some(stream) => {
                let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
                    .map_err(|e| probe_error(e.to_string()))?;
                let video = context
                    .decoder()
                    .video()
                    .map_err(|e| probe_error(e.to_string()))?;
                (Some(video.width()), Some(video.height()))
            }
            None => (None, None),
        };

        Ok(MediaProbe {
            duration,
            width,
            height,
            has_video: width.is_some(),
            has_audio: input.streams().best(ffmpeg::media::Type::Audio).is_some(),
        })
    }
}

#[async_trait]
impl ProbePort for ProbeLibavAdapter {
    async fn probe(&self, path: &Path) -> Result<MediaProbe, DomainError> {
        if !path.exists() {
            return Err(DomainError::Probe {
                path: path.to_path_buf(),
                message: "file does not exist".to_string(),
            });
        }

        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::probe_blocking(owned))
            .await
            .map_err(|e| DomainError::Probe {
                path: path.to_path_buf(),
                message: format!("probe task failed: {}", e),
            })?
    }
}
