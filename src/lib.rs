//! Reelsmith timeline assembly library
//!
//! Plans an ordered timeline from narration (A-Roll) and cutaway (B-Roll) segments,
//! normalizes every entry to a common format and renders one output video.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;
pub mod planner;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use app::{AssemblyOrchestrator, AssemblyState};
pub use domain::errors::DomainError;
pub use domain::model::{AssemblyResult, AssemblySequence, TimelineEntry};
pub use error::{ReelsmithError, ReelsmithResult};
pub use planner::{SequencePlanner, SequencePolicy};
