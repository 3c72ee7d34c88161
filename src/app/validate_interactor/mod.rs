// Validate interactor - Checks a planned sequence without rendering it

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::domain::rules::OverlapValidator;

/// Everything wrong with a sequence, gathered in one pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub entries: usize,
    pub total_duration: f64,
    pub overlaps: Vec<AudioOverlap>,
    pub missing_files: Vec<MissingFile>,
    /// Structural problems (empty sequence, unknown references, bad durations)
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.overlaps.is_empty() && self.missing_files.is_empty() && self.errors.is_empty()
    }
}

/// Source files a sequence needs that do not exist, each reported once
pub fn missing_sources(sequence: &AssemblySequence) -> Vec<MissingFile> {
    let mut missing: Vec<MissingFile> = Vec::new();
    let mut record = |segment_id: &str, path: &std::path::Path| {
        if !path.exists() && !missing.iter().any(|m| m.path == path) {
            missing.push(MissingFile {
                segment_id: segment_id.to_string(),
                path: path.to_path_buf(),
            });
        }
    };

    for entry in &sequence.entries {
        record(&entry.visual_source.segment_id, &entry.visual_source.path);
        if let Some(audio) = sequence.audio_segment(&entry.audio_source) {
            record(audio.id(), audio.path());
        }
    }
    missing
}

/// Interactor for sequence validation
#[derive(Debug, Default)]
pub struct ValidateInteractor;

impl ValidateInteractor {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, sequence: &AssemblySequence) -> ValidationReport {
        info!(entries = sequence.len(), "Validating sequence");

        let mut errors = Vec::new();
        match sequence.validate() {
            Ok(()) => {}
            Err(DomainError::UnresolvedReferences(refs)) => {
                errors.extend(refs.iter().map(|r| r.to_string()));
            }
            Err(other) => errors.push(other.to_string()),
        }

        let report = ValidationReport {
            entries: sequence.len(),
            total_duration: sequence.total_duration(),
            overlaps: OverlapValidator::validate(sequence),
            missing_files: missing_sources(sequence),
            errors,
        };

        if !report.is_clean() {
            warn!(
                overlaps = report.overlaps.len(),
                missing = report.missing_files.len(),
                errors = report.errors.len(),
                "Sequence has problems"
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clean_sequence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mp4");
        std::fs::write(&path, b"x").unwrap();
        let a = ARollSegment::whole_file("a", &path, 3.0).unwrap();
        let sequence = AssemblySequence::new(
            vec![TimelineEntry::aroll_full(0, &a)],
            Resolution::default(),
            0.3,
            vec![a],
        );

        let report = ValidateInteractor::new().validate(&sequence);
        assert!(report.is_clean());
        assert_eq!(report.total_duration, 3.0);
    }

    #[test]
    fn test_reports_overlap_and_missing_once() {
        let a = ARollSegment::whole_file("a", "/nonexistent/a.mp4", 3.0).unwrap();
        let b = ARollSegment::whole_file("b", "/nonexistent/b.mp4", 2.0).unwrap();
        let sequence = AssemblySequence::new(
            vec![
                TimelineEntry::aroll_full(0, &a),
                TimelineEntry::aroll_full(1, &b),
                TimelineEntry::aroll_full(2, &a),
            ],
            Resolution::default(),
            0.3,
            vec![a, b],
        );

        let report = ValidateInteractor::new().validate(&sequence);
        assert_eq!(report.overlaps.len(), 1);
        assert_eq!(report.overlaps[0].first_used_index, 0);
        assert_eq!(report.missing_files.len(), 2);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_unknown_audio_reference() {
        let a = ARollSegment::whole_file("a", "/nonexistent/a.mp4", 3.0).unwrap();
        let sequence = AssemblySequence::new(
            vec![TimelineEntry::aroll_full(0, &a)],
            Resolution::default(),
            0.3,
            vec![],
        );
        let report = ValidateInteractor::new().validate(&sequence);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains('a'));
    }
}
