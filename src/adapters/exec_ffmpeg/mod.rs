//! FFmpeg execution adapter
//!
//! Runs the ffmpeg command line tool as a child process and keeps the tail of its
//! error output for diagnostics.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::{ReelsmithError, ReelsmithResult};
use crate::ports::FfmpegPort;

/// Stderr lines kept from a failed run
const STDERR_TAIL: usize = 20;

/// Resolve a tool: configured path first, then PATH, then the bare name
pub fn locate_tool(name: &str, configured: Option<&Path>) -> PathBuf {
    if let Some(path) = configured {
        return path.to_path_buf();
    }
    which::which(name).unwrap_or_else(|_| PathBuf::from(name))
}

/// Last non-empty lines of a process' stderr
pub(crate) fn stderr_tail(stderr: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    let skip = lines.len().saturating_sub(STDERR_TAIL);
    lines.into_iter().skip(skip).collect()
}

/// Map a spawn failure, distinguishing a missing binary
pub(crate) fn spawn_error(program: &Path, err: std::io::Error) -> ReelsmithError {
    let program = program.display().to_string();
    if err.kind() == std::io::ErrorKind::NotFound {
        ReelsmithError::ToolNotFound { program }
    } else {
        ReelsmithError::ToolSpawn {
            program,
            message: err.to_string(),
        }
    }
}

/// FFmpeg CLI adapter
#[derive(Debug, Clone)]
pub struct FfmpegCliAdapter {
    program: PathBuf,
}

impl FfmpegCliAdapter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Adapter for the configured binary or the one found on PATH
    pub fn locate(configured: Option<&Path>) -> Self {
        Self::new(locate_tool("ffmpeg", configured))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl FfmpegPort for FfmpegCliAdapter {
    async fn run(&self, args: &[String]) -> ReelsmithResult<()> {
        debug!(
            program = %self.program.display(),
            output = args.last().map(String::as_str).unwrap_or(""),
            "Running ffmpeg"
        );
        trace!("ffmpeg {}", args.join(" "));

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| spawn_error(&self.program, err))?;

        if output.status.success() {
            return Ok(());
        }

        let status = match output.status.code() {
            Some(code) => code.to_string(),
            None => "terminated by signal".to_string(),
        };
        Err(ReelsmithError::ToolFailed {
            program: "ffmpeg".to_string(),
            status,
            stderr: stderr_tail(&output.stderr),
        })
    }
}
