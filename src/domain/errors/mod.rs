// Domain errors - Error types for the assembly pipeline

use std::fmt;
use std::path::PathBuf;

use crate::domain::model::{AudioOverlap, MissingFile, PipelineStage};

/// A segment reference that could not be resolved against the known segments
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedReference {
    /// Entry position in a caller-supplied list, when the reference came from one
    pub entry_index: Option<usize>,
    pub segment_id: String,
    pub reason: String,
}

impl fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entry_index {
            Some(index) => write!(f, "entry {}: '{}' {}", index, self.segment_id, self.reason),
            None => write!(f, "'{}' {}", self.segment_id, self.reason),
        }
    }
}

/// Domain-specific error types
#[derive(Debug, Clone)]
pub enum DomainError {
    /// Invalid arguments provided
    BadArgs(String),
    /// A segment failed validation at construction time
    InvalidSegment { segment_id: String, message: String },
    /// Required input list was empty
    EmptyInput { input: String },
    /// Segment references that could not be resolved
    UnresolvedReferences(Vec<UnresolvedReference>),
    /// Source files that do not exist on disk
    MissingSource {
        missing: Vec<MissingFile>,
        stage: PipelineStage,
    },
    /// Caller declined to continue after duplicate audio was reported
    OverlapRejected { overlaps: Vec<AudioOverlap> },
    /// Media probing failed
    Probe { path: PathBuf, message: String },
    /// Decode or encode failure while normalizing one entry
    Normalization {
        segment_id: String,
        path: PathBuf,
        message: String,
    },
    /// Concatenation or encoding failure in a render backend
    Render {
        backend: String,
        segment_id: Option<String>,
        path: Option<PathBuf>,
        message: String,
    },
    /// Output could not be published
    Publish { path: PathBuf, message: String },
    /// Run stopped on request between stages
    Cancelled { stage: PipelineStage },
    /// Configuration problem
    Config(String),
}

impl DomainError {
    /// Pipeline stage the error belongs to
    pub fn stage(&self) -> PipelineStage {
        match self {
            DomainError::BadArgs(_)
            | DomainError::InvalidSegment { .. }
            | DomainError::EmptyInput { .. }
            | DomainError::UnresolvedReferences(_)
            | DomainError::Config(_) => PipelineStage::Planning,
            DomainError::MissingSource { stage, .. } => *stage,
            DomainError::OverlapRejected { .. } => PipelineStage::Validation,
            DomainError::Probe { .. } | DomainError::Normalization { .. } => {
                PipelineStage::Normalization
            }
            DomainError::Render { .. } => PipelineStage::Rendering,
            DomainError::Publish { .. } => PipelineStage::Publishing,
            DomainError::Cancelled { stage } => *stage,
        }
    }

    /// Segment the error is about, if a single one can be named
    pub fn segment_id(&self) -> Option<&str> {
        match self {
            DomainError::InvalidSegment { segment_id, .. }
            | DomainError::Normalization { segment_id, .. } => Some(segment_id),
            DomainError::Render { segment_id, .. } => segment_id.as_deref(),
            DomainError::MissingSource { missing, .. } if missing.len() == 1 => {
                Some(&missing[0].segment_id)
            }
            DomainError::UnresolvedReferences(refs) if refs.len() == 1 => {
                Some(&refs[0].segment_id)
            }
            _ => None,
        }
    }

    /// File the error is about, if a single one can be named
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            DomainError::Probe { path, .. }
            | DomainError::Normalization { path, .. }
            | DomainError::Publish { path, .. } => Some(path),
            DomainError::Render { path, .. } => path.as_ref(),
            DomainError::MissingSource { missing, .. } if missing.len() == 1 => {
                Some(&missing[0].path)
            }
            _ => None,
        }
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::BadArgs(msg) => write!(f, "Bad arguments: {}", msg),
            DomainError::InvalidSegment {
                segment_id,
                message,
            } => write!(f, "Invalid segment '{}': {}", segment_id, message),
            DomainError::EmptyInput { input } => {
                write!(f, "No {} provided; nothing to assemble", input)
            }
            DomainError::UnresolvedReferences(refs) => {
                write!(f, "Unresolved segment references: ")?;
                for (i, r) in refs.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", r)?;
                }
                Ok(())
            }
            DomainError::MissingSource { missing, stage } => {
                write!(f, "Missing source files during {}: ", stage)?;
                for (i, m) in missing.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} ({})", m.segment_id, m.path.display())?;
                }
                Ok(())
            }
            DomainError::OverlapRejected { overlaps } => write!(
                f,
                "Assembly stopped: {} duplicate audio use(s) were not approved",
                overlaps.len()
            ),
            DomainError::Probe { path, message } => {
                write!(f, "Failed to probe {}: {}", path.display(), message)
            }
            DomainError::Normalization {
                segment_id,
                path,
                message,
            } => write!(
                f,
                "Normalization failed for segment '{}' ({}): {}",
                segment_id,
                path.display(),
                message
            ),
            DomainError::Render {
                backend,
                segment_id,
                path,
                message,
            } => {
                write!(f, "Render failed in {} backend", backend)?;
                if let Some(id) = segment_id {
                    write!(f, " at segment '{}'", id)?;
                }
                if let Some(path) = path {
                    write!(f, " ({})", path.display())?;
                }
                write!(f, ": {}", message)
            }
            DomainError::Publish { path, message } => {
                write!(f, "Failed to publish {}: {}", path.display(), message)
            }
            DomainError::Cancelled { stage } => write!(f, "Assembly cancelled during {}", stage),
            DomainError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
