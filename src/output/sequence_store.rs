//! JSON persistence for assembly sequences

use std::path::Path;

use tracing::info;

use crate::domain::model::AssemblySequence;
use crate::error::ReelsmithResult;
use crate::output::OutputWriter;

/// Saves and loads sequences so a plan can be reviewed or re-run
#[derive(Debug, Clone, Default)]
pub struct SequenceStore {
    writer: OutputWriter,
}

impl SequenceStore {
    pub fn new(writer: OutputWriter) -> Self {
        Self { writer }
    }

    pub fn save(&self, sequence: &AssemblySequence, path: &Path) -> ReelsmithResult<()> {
        let json = serde_json::to_vec_pretty(sequence)?;
        self.writer.write_atomic(path, &json)?;
        info!(entries = sequence.len(), "Sequence saved to {}", path.display());
        Ok(())
    }

    /// Parse a saved sequence. Segment fields are checked on parse; references are not.
    pub fn load(&self, path: &Path) -> ReelsmithResult<AssemblySequence> {
        let data = std::fs::read(path)?;
        let sequence: AssemblySequence = serde_json::from_slice(&data)?;
        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let a = ARollSegment::whole_file("a1", "/media/a1.mp4", 4.0).unwrap();
        let sequence = AssemblySequence::new(
            vec![TimelineEntry::aroll_full(0, &a)],
            Resolution::PORTRAIT_720,
            0.2,
            vec![a],
        );

        let store = SequenceStore::default();
        let path = dir.path().join("plan.json");
        store.save(&sequence, &path).unwrap();
        let loaded = store.load(&path).unwrap();

        assert_eq!(loaded, sequence);
    }

    #[test]
    fn test_load_rejects_bad_segment() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(
            &path,
            r#"{"sequence": [], "crossfade_duration": 0.3,
                "audio_segments": [{"id": "a", "audio_video_path": "/a.mp4",
                                    "start_time": 0, "end_time": 0, "duration": -2}]}"#,
        )
        .unwrap();
        assert!(SequenceStore::default().load(&path).is_err());
    }
}
