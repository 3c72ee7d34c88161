// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::error::ReelsmithResult;

/// What a locator knows about one segment
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedMedia {
    pub path: PathBuf,
    /// Duration when the locator already knows it
    pub duration: Option<f64>,
}

/// Which kind of segment a lookup is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentRole {
    ARoll,
    BRoll,
}

/// Port resolving segment ids to files; hides every path-search heuristic
#[async_trait]
pub trait MediaLocator: Send + Sync {
    /// Resolve a segment id to an existing file
    async fn resolve(&self, segment_id: &str, role: SegmentRole)
        -> Result<LocatedMedia, DomainError>;
}

/// Stream facts needed for normalization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaProbe {
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub has_video: bool,
    pub has_audio: bool,
}

impl MediaProbe {
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }
}

/// Port for media file probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Probe duration, picture size and stream presence
    async fn probe(&self, path: &Path) -> Result<MediaProbe, DomainError>;
}

/// Port for running the ffmpeg command line tool
#[async_trait]
pub trait FfmpegPort: Send + Sync {
    /// Run ffmpeg with `args`; the output file is the last argument
    async fn run(&self, args: &[String]) -> ReelsmithResult<()>;
}

/// Normalized clip pair handed to a render backend
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEntry {
    pub order_index: usize,
    pub audio_segment_id: String,
    pub visual_segment_id: String,
    pub visual_path: PathBuf,
    pub audio_path: PathBuf,
    /// Exact visual length in seconds
    pub duration: f64,
    /// Audio length including crossfade lead and tail
    pub audio_duration: f64,
}

/// Everything a render backend needs
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub entries: Vec<NormalizedEntry>,
    pub resolution: Resolution,
    /// Effective crossfade length; zero means plain concatenation
    pub crossfade: f64,
    /// Scratch directory for backend intermediates
    pub work_dir: PathBuf,
}

impl RenderJob {
    pub fn total_duration(&self) -> f64 {
        self.entries.iter().map(|entry| entry.duration).sum()
    }
}

/// Port for render backends
#[async_trait]
pub trait RenderPort: Send + Sync {
    /// Short backend name used in logs and diagnostics
    fn name(&self) -> &str;

    /// Render the job into `output`
    async fn render(&self, job: &RenderJob, output: &Path) -> Result<(), DomainError>;
}

/// Port asking the caller whether to continue past duplicate audio
pub trait OverlapConfirmation: Send + Sync {
    fn confirm(&self, overlaps: &[AudioOverlap]) -> bool;
}

/// Fixed answer, used for the non-interactive override flag
pub struct StaticConfirmation(pub bool);

impl OverlapConfirmation for StaticConfirmation {
    fn confirm(&self, _overlaps: &[AudioOverlap]) -> bool {
        self.0
    }
}

/// Port for configuration files
pub trait ConfigPort: Send + Sync {
    /// Load a partial configuration from `path`
    fn load_config(&self, path: &Path) -> Result<crate::config_initialization::ConfigFile, DomainError>;

    /// Candidate paths checked when no explicit file is given
    fn default_config_paths(&self) -> Vec<PathBuf>;
}
