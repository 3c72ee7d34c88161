// Domain use cases - Requests and inputs accepted by the application layer

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::model::*;
use crate::planner::SequencePolicy;

/// A-Roll entry of a project manifest; path and duration may be left to the locator and probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ARollSpec {
    pub id: String,
    #[serde(default, alias = "audio_video_path")]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub end_time: f64,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// B-Roll entry of a project manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BRollSpec {
    pub id: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub content_type: Option<ContentType>,
    #[serde(default)]
    pub explicit_duration: Option<f64>,
}

/// Project manifest listing the segments of one video
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectManifest {
    #[serde(default)]
    pub a_roll: Vec<ARollSpec>,
    #[serde(default)]
    pub b_roll: Vec<BRollSpec>,
    /// Directories searched for segments without a path
    #[serde(default)]
    pub media_dirs: Vec<PathBuf>,
    /// Hand-edited entry list used with the custom policy
    #[serde(default)]
    pub custom_sequence: Option<Vec<TimelineEntry>>,
}

/// What the orchestrator should assemble
#[derive(Debug, Clone)]
pub enum AssemblyInput {
    /// Plan a new sequence from resolved segments
    Plan {
        a_roll: Vec<ARollSegment>,
        b_roll: Vec<BRollSegment>,
        policy: SequencePolicy,
    },
    /// Render a sequence that was planned (and possibly edited) earlier
    Sequence(AssemblySequence),
}

/// Full request for one assembly run
#[derive(Debug, Clone)]
pub struct AssemblyRequest {
    pub input: AssemblyInput,
    pub output_dir: PathBuf,
    /// Continue past duplicate audio without asking
    pub allow_overlap: bool,
    /// Persist the planned sequence here before rendering
    pub save_sequence: Option<PathBuf>,
}

impl AssemblyRequest {
    pub fn plan(
        a_roll: Vec<ARollSegment>,
        b_roll: Vec<BRollSegment>,
        policy: SequencePolicy,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input: AssemblyInput::Plan {
                a_roll,
                b_roll,
                policy,
            },
            output_dir: output_dir.into(),
            allow_overlap: false,
            save_sequence: None,
        }
    }

    pub fn from_sequence(sequence: AssemblySequence, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: AssemblyInput::Sequence(sequence),
            output_dir: output_dir.into(),
            allow_overlap: false,
            save_sequence: None,
        }
    }

    pub fn allow_overlap(mut self, allow: bool) -> Self {
        self.allow_overlap = allow;
        self
    }

    pub fn save_sequence_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_sequence = Some(path.into());
        self
    }
}
