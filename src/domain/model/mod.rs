// Domain models - Segments, timeline entries and assembly results

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Extensions treated as still images
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp"];
/// Extensions treated as video clips
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm", "avi", "m4v"];
/// Extensions accepted as narration sources besides video
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "m4a", "aac", "flac"];

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Kind of visual material a B-Roll segment holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Image,
    Video,
}

impl ContentType {
    /// Infer the content type from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = extension_of(path)?;
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(ContentType::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(ContentType::Video)
        } else {
            None
        }
    }

    /// Parse content type from string
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_lowercase().as_str() {
            "image" | "img" | "still" => Ok(ContentType::Image),
            "video" | "clip" => Ok(ContentType::Video),
            other => Err(DomainError::BadArgs(format!(
                "Invalid content type: {}. Valid types: image, video",
                other
            ))),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Image => write!(f, "image"),
            ContentType::Video => write!(f, "video"),
        }
    }
}

/// Narration clip whose audio must appear in the timeline.
///
/// `start_time`/`end_time` bound the slice of the source file that belongs to this
/// segment. When `end_time <= start_time` the segment is unbounded and the whole
/// file, from `start_time`, is used for `duration` seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ARollRecord")]
pub struct ARollSegment {
    id: String,
    #[serde(rename = "audio_video_path")]
    path: PathBuf,
    start_time: f64,
    end_time: f64,
    duration: f64,
}

#[derive(Deserialize)]
struct ARollRecord {
    id: String,
    #[serde(rename = "audio_video_path", alias = "path")]
    path: PathBuf,
    #[serde(default)]
    start_time: f64,
    #[serde(default)]
    end_time: f64,
    duration: f64,
}

impl TryFrom<ARollRecord> for ARollSegment {
    type Error = DomainError;

    fn try_from(record: ARollRecord) -> Result<Self, Self::Error> {
        ARollSegment::new(
            record.id,
            record.path,
            record.start_time,
            record.end_time,
            record.duration,
        )
    }
}

/// Allowed drift between `duration` and the slice bounds, in seconds
const BOUNDS_TOLERANCE: f64 = 0.001;

impl ARollSegment {
    /// Create a validated A-Roll segment
    pub fn new(
        id: impl Into<String>,
        path: impl Into<PathBuf>,
        start_time: f64,
        end_time: f64,
        duration: f64,
    ) -> Result<Self, DomainError> {
        let id = id.into();
        let invalid = |message: &str| DomainError::InvalidSegment {
            segment_id: id.clone(),
            message: message.to_string(),
        };

        if id.trim().is_empty() {
            return Err(DomainError::InvalidSegment {
                segment_id: String::new(),
                message: "segment id cannot be empty".to_string(),
            });
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(invalid("duration must be positive"));
        }
        if !start_time.is_finite() || start_time < 0.0 {
            return Err(invalid("start_time cannot be negative"));
        }
        if !end_time.is_finite() || end_time < 0.0 {
            return Err(invalid("end_time cannot be negative"));
        }
        if end_time > start_time && (duration - (end_time - start_time)).abs() > BOUNDS_TOLERANCE {
            return Err(invalid("duration must equal end_time - start_time"));
        }

        Ok(Self {
            id,
            path: path.into(),
            start_time,
            end_time,
            duration,
        })
    }

    /// Segment that uses its whole source file
    pub fn whole_file(
        id: impl Into<String>,
        path: impl Into<PathBuf>,
        duration: f64,
    ) -> Result<Self, DomainError> {
        Self::new(id, path, 0.0, 0.0, duration)
    }

    /// Segment bounded by `[start_time, end_time]`, with the duration derived from the bounds
    pub fn bounded(
        id: impl Into<String>,
        path: impl Into<PathBuf>,
        start_time: f64,
        end_time: f64,
    ) -> Result<Self, DomainError> {
        Self::new(id, path, start_time, end_time, end_time - start_time)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Whether explicit slice bounds were given
    pub fn is_bounded(&self) -> bool {
        self.end_time > self.start_time
    }
}

/// Supplementary visual; may be reused across entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BRollRecord")]
pub struct BRollSegment {
    id: String,
    path: PathBuf,
    content_type: ContentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    explicit_duration: Option<f64>,
}

#[derive(Deserialize)]
struct BRollRecord {
    id: String,
    path: PathBuf,
    content_type: Option<ContentType>,
    explicit_duration: Option<f64>,
}

impl TryFrom<BRollRecord> for BRollSegment {
    type Error = DomainError;

    fn try_from(record: BRollRecord) -> Result<Self, Self::Error> {
        let content_type = match record.content_type {
            Some(content_type) => content_type,
            None => ContentType::from_path(&record.path).ok_or_else(|| {
                DomainError::InvalidSegment {
                    segment_id: record.id.clone(),
                    message: format!(
                        "cannot infer content type from {}",
                        record.path.display()
                    ),
                }
            })?,
        };
        let segment = BRollSegment::new(record.id, record.path, content_type)?;
        match record.explicit_duration {
            Some(duration) => segment.with_explicit_duration(duration),
            None => Ok(segment),
        }
    }
}

impl BRollSegment {
    /// Create a validated B-Roll segment
    pub fn new(
        id: impl Into<String>,
        path: impl Into<PathBuf>,
        content_type: ContentType,
    ) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidSegment {
                segment_id: String::new(),
                message: "segment id cannot be empty".to_string(),
            });
        }
        Ok(Self {
            id,
            path: path.into(),
            content_type,
            explicit_duration: None,
        })
    }

    /// Record the known length of the source clip
    pub fn with_explicit_duration(mut self, duration: f64) -> Result<Self, DomainError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(DomainError::InvalidSegment {
                segment_id: self.id,
                message: "explicit_duration must be positive".to_string(),
            });
        }
        self.explicit_duration = Some(duration);
        Ok(self)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn explicit_duration(&self) -> Option<f64> {
        self.explicit_duration
    }
}

/// Any segment known to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    ARoll(ARollSegment),
    BRoll(BRollSegment),
}

impl Segment {
    pub fn id(&self) -> &str {
        match self {
            Segment::ARoll(segment) => segment.id(),
            Segment::BRoll(segment) => segment.id(),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Segment::ARoll(segment) => segment.path(),
            Segment::BRoll(segment) => segment.path(),
        }
    }

    /// Split a mixed list into A-Roll and B-Roll, keeping their relative order
    pub fn partition(segments: Vec<Segment>) -> (Vec<ARollSegment>, Vec<BRollSegment>) {
        let mut a_roll = Vec::new();
        let mut b_roll = Vec::new();
        for segment in segments {
            match segment {
                Segment::ARoll(segment) => a_roll.push(segment),
                Segment::BRoll(segment) => b_roll.push(segment),
            }
        }
        (a_roll, b_roll)
    }
}

/// How an entry's visual relates to its audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    /// The A-Roll clip supplies both picture and sound
    ArollFull,
    /// B-Roll picture over the A-Roll sound
    BrollWithArollAudio,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::ArollFull => write!(f, "AROLL_FULL"),
            EntryKind::BrollWithArollAudio => write!(f, "BROLL_WITH_AROLL_AUDIO"),
        }
    }
}

/// Picture source for one timeline entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualSource {
    pub segment_id: String,
    pub path: PathBuf,
    pub content_type: ContentType,
    /// Offset into the source where the picture starts
    #[serde(default)]
    pub start_time: f64,
    /// Known length of the source clip, when the caller supplied it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_duration: Option<f64>,
}

/// One ordered unit of output video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub order_index: usize,
    pub kind: EntryKind,
    pub visual_source: VisualSource,
    /// Id of the A-Roll segment whose audio plays under this entry
    pub audio_source: String,
    pub duration: f64,
}

impl TimelineEntry {
    /// Entry showing the A-Roll clip with its own sound
    pub fn aroll_full(order_index: usize, segment: &ARollSegment) -> Self {
        Self {
            order_index,
            kind: EntryKind::ArollFull,
            visual_source: VisualSource {
                segment_id: segment.id().to_string(),
                path: segment.path().to_path_buf(),
                content_type: ContentType::Video,
                start_time: segment.start_time(),
                source_duration: None,
            },
            audio_source: segment.id().to_string(),
            duration: segment.duration(),
        }
    }

    /// Entry showing B-Roll over the A-Roll sound
    pub fn broll_with_aroll_audio(
        order_index: usize,
        segment: &ARollSegment,
        broll: &BRollSegment,
    ) -> Self {
        Self {
            order_index,
            kind: EntryKind::BrollWithArollAudio,
            visual_source: VisualSource {
                segment_id: broll.id().to_string(),
                path: broll.path().to_path_buf(),
                content_type: broll.content_type(),
                start_time: 0.0,
                source_duration: broll.explicit_duration(),
            },
            audio_source: segment.id().to_string(),
            duration: segment.duration(),
        }
    }
}

/// Output frame size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const PORTRAIT_1080: Resolution = Resolution {
        width: 1080,
        height: 1920,
    };
    pub const PORTRAIT_720: Resolution = Resolution {
        width: 720,
        height: 1280,
    };
    pub const LANDSCAPE_1080: Resolution = Resolution {
        width: 1920,
        height: 1080,
    };

    /// Create a resolution, rejecting zero or odd dimensions
    pub fn new(width: u32, height: u32) -> Result<Self, DomainError> {
        if width == 0 || height == 0 {
            return Err(DomainError::BadArgs(
                "Resolution dimensions cannot be zero".to_string(),
            ));
        }
        if width % 2 != 0 || height % 2 != 0 {
            return Err(DomainError::BadArgs(format!(
                "Resolution {}x{} must have even dimensions",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    /// Parse `WIDTHxHEIGHT`
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let trimmed = value.trim().to_lowercase();
        let (w, h) = trimmed.split_once('x').ok_or_else(|| {
            DomainError::BadArgs(format!(
                "Invalid resolution: {}. Expected WIDTHxHEIGHT, e.g. 1080x1920",
                value
            ))
        })?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|_| DomainError::BadArgs(format!("Invalid resolution width: {}", w)))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|_| DomainError::BadArgs(format!("Invalid resolution height: {}", h)))?;
        Self::new(width, height)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::PORTRAIT_1080
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl TryFrom<String> for Resolution {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Resolution::parse(&value)
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.to_string()
    }
}

/// Ordered timeline ready for normalization and rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblySequence {
    #[serde(rename = "sequence")]
    pub entries: Vec<TimelineEntry>,
    #[serde(default)]
    pub target_resolution: Resolution,
    #[serde(default = "default_crossfade")]
    pub crossfade_duration: f64,
    /// A-Roll segments referenced by `audio_source`
    #[serde(default)]
    pub audio_segments: Vec<ARollSegment>,
}

/// Default audio crossfade at entry boundaries, in seconds
pub const DEFAULT_CROSSFADE: f64 = 0.3;

fn default_crossfade() -> f64 {
    DEFAULT_CROSSFADE
}

impl AssemblySequence {
    pub fn new(
        entries: Vec<TimelineEntry>,
        target_resolution: Resolution,
        crossfade_duration: f64,
        audio_segments: Vec<ARollSegment>,
    ) -> Self {
        Self {
            entries,
            target_resolution,
            crossfade_duration,
            audio_segments,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of entry durations
    pub fn total_duration(&self) -> f64 {
        self.entries.iter().map(|entry| entry.duration).sum()
    }

    /// Look up the A-Roll segment an entry's audio comes from
    pub fn audio_segment(&self, id: &str) -> Option<&ARollSegment> {
        self.audio_segments.iter().find(|segment| segment.id() == id)
    }

    /// Check entry durations, crossfade, and that every audio source is known
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.entries.is_empty() {
            return Err(DomainError::EmptyInput {
                input: "timeline entries".to_string(),
            });
        }
        if !self.crossfade_duration.is_finite() || self.crossfade_duration < 0.0 {
            return Err(DomainError::BadArgs(format!(
                "crossfade_duration must be zero or positive, got {}",
                self.crossfade_duration
            )));
        }

        let catalogue: HashMap<&str, &ARollSegment> = self
            .audio_segments
            .iter()
            .map(|segment| (segment.id(), segment))
            .collect();

        let mut unresolved = Vec::new();
        for (index, entry) in self.entries.iter().enumerate() {
            if !entry.duration.is_finite() || entry.duration <= 0.0 {
                return Err(DomainError::InvalidSegment {
                    segment_id: entry.audio_source.clone(),
                    message: format!("entry {} has non-positive duration", index),
                });
            }
            if !catalogue.contains_key(entry.audio_source.as_str()) {
                unresolved.push(crate::domain::errors::UnresolvedReference {
                    entry_index: Some(index),
                    segment_id: entry.audio_source.clone(),
                    reason: "is not a known A-Roll audio source".to_string(),
                });
            }
        }

        if unresolved.is_empty() {
            Ok(())
        } else {
            Err(DomainError::UnresolvedReferences(unresolved))
        }
    }
}

/// Stage of the assembly pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Planning,
    Validation,
    SourceCheck,
    Normalization,
    Rendering,
    Publishing,
    Complete,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Planning => "planning",
            PipelineStage::Validation => "validation",
            PipelineStage::SourceCheck => "source check",
            PipelineStage::Normalization => "normalization",
            PipelineStage::Rendering => "rendering",
            PipelineStage::Publishing => "publishing",
            PipelineStage::Complete => "complete",
        };
        write!(f, "{}", name)
    }
}

/// A referenced file that is not on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingFile {
    pub segment_id: String,
    pub path: PathBuf,
}

/// A repeated use of one A-Roll audio source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioOverlap {
    pub entry_index: usize,
    pub audio_segment_id: String,
    pub first_used_index: usize,
}

impl fmt::Display for AudioOverlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entry {} reuses audio '{}' first used at entry {}",
            self.entry_index, self.audio_segment_id, self.first_used_index
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

/// Message attached to an assembly result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub stage: PipelineStage,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<String>,
}

impl Diagnostic {
    pub fn info(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            stage,
            message: message.into(),
            segment_id: None,
        }
    }

    pub fn warning(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            stage,
            message: message.into(),
            segment_id: None,
        }
    }

    pub fn error(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            stage,
            message: message.into(),
            segment_id: None,
        }
    }

    pub fn for_segment(mut self, segment_id: impl Into<String>) -> Self {
        self.segment_id = Some(segment_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssemblyStatus {
    Success,
    Error,
}

/// Outcome reported to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyResult {
    pub status: AssemblyStatus,
    pub output_path: Option<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
    pub missing_files: Vec<MissingFile>,
}

impl AssemblyResult {
    pub fn is_success(&self) -> bool {
        self.status == AssemblyStatus::Success
    }
}
