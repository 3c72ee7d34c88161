//! FFprobe adapter for media file probing
//!
//! Reads container duration, the first video stream's frame size and stream presence
//! from ffprobe's JSON output.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::adapters::exec_ffmpeg::{locate_tool, spawn_error, stderr_tail};
use crate::domain::errors::*;
use crate::ports::*;

#[derive(Debug, Default, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

fn parse_seconds(value: Option<&String>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// Turn ffprobe JSON into a [`MediaProbe`]
pub fn parse_probe_json(json: &[u8]) -> Result<MediaProbe, serde_json::Error> {
    let output: ProbeOutput = serde_json::from_slice(json)?;

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = output
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let duration = output
        .format
        .as_ref()
        .and_then(|f| parse_seconds(f.duration.as_ref()))
        .or_else(|| {
            output
                .streams
                .iter()
                .filter_map(|s| parse_seconds(s.duration.as_ref()))
                .reduce(f64::max)
        });

    Ok(MediaProbe {
        duration,
        width: video.and_then(|s| s.width),
        height: video.and_then(|s| s.height),
        has_video: video.is_some(),
        has_audio,
    })
}

/// FFprobe-based probe adapter
#[derive(Debug, Clone)]
pub struct FfprobeAdapter {
    program: PathBuf,
}

impl FfprobeAdapter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Adapter for the configured binary or the one found on PATH
    pub fn locate(configured: Option<&Path>) -> Self {
        Self::new(locate_tool("ffprobe", configured))
    }
}

#[async_trait]
impl ProbePort for FfprobeAdapter {
    async fn probe(&self, path: &Path) -> Result<MediaProbe, DomainError> {
        let probe_error = |message: String| DomainError::Probe {
            path: path.to_path_buf(),
            message,
        };

        if !path.exists() {
            return Err(probe_error("file does not exist".to_string()));
        }

        let output = Command::new(&self.program)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration:stream=codec_type,width,height,duration",
                "-of",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| probe_error(spawn_error(&self.program, err).to_string()))?;

        if !output.status.success() {
            let detail = stderr_tail(&output.stderr)
                .pop()
                .unwrap_or_else(|| "no error output".to_string());
            return Err(probe_error(format!(
                "ffprobe exited with status {:?}: {}",
                output.status.code(),
                detail
            )));
        }

        let probe = parse_probe_json(&output.stdout)
            .map_err(|err| probe_error(format!("unreadable ffprobe output: {}", err)))?;
        debug!(
            path = %path.display(),
            duration = ?probe.duration,
            width = ?probe.width,
            height = ?probe.height,
            "Probed media"
        );
        Ok(probe)
    }
}
