// Directory locator - Finds segment files by id under media directories

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use walkdir::WalkDir;

use crate::domain::errors::*;
use crate::domain::model::{AUDIO_EXTENSIONS, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use crate::ports::*;

/// Depth searched below each media directory
const MAX_DEPTH: usize = 4;

/// Locates `<id>.<ext>` files in a list of directories
#[derive(Debug, Clone, Default)]
pub struct DirectoryLocator {
    roots: Vec<PathBuf>,
}

impl DirectoryLocator {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn accepts(role: SegmentRole, path: &Path) -> bool {
        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => ext.to_ascii_lowercase(),
            None => return false,
        };
        let ext = ext.as_str();
        match role {
            SegmentRole::ARoll => VIDEO_EXTENSIONS.contains(&ext) || AUDIO_EXTENSIONS.contains(&ext),
            SegmentRole::BRoll => IMAGE_EXTENSIONS.contains(&ext) || VIDEO_EXTENSIONS.contains(&ext),
        }
    }

    /// All matching files, in a stable order
    pub fn find(&self, segment_id: &str, role: SegmentRole) -> Vec<PathBuf> {
        let mut matches: Vec<PathBuf> = self
            .roots
            .iter()
            .flat_map(|root| {
                WalkDir::new(root)
                    .max_depth(MAX_DEPTH)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(Result::ok)
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.file_stem().and_then(|s| s.to_str()) == Some(segment_id)
                    && Self::accepts(role, path)
            })
            .collect();
        matches.dedup();
        matches
    }
}

#[async_trait]
impl MediaLocator for DirectoryLocator {
    async fn resolve(&self, segment_id: &str, role: SegmentRole) -> Result<LocatedMedia, DomainError> {
        let matches = self.find(segment_id, role);
        if matches.len() > 1 {
            debug!(
                segment = segment_id,
                candidates = matches.len(),
                "Several files match, using the first"
            );
        }

        match matches.into_iter().next() {
            Some(path) => {
                debug!(segment = segment_id, path = %path.display(), "Located segment");
                Ok(LocatedMedia {
                    path,
                    duration: None,
                })
            }
            None => Err(DomainError::UnresolvedReferences(vec![UnresolvedReference {
                entry_index: None,
                segment_id: segment_id.to_string(),
                reason: if self.roots.is_empty() {
                    "has no path and no media directories are configured".to_string()
                } else {
                    format!("was not found in {} media director(ies)", self.roots.len())
                },
            }])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[tokio::test]
    async fn test_resolves_by_stem_and_role() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a_roll/segment_1.mp4"));
        touch(&dir.path().join("b_roll/segment_1.png"));
        touch(&dir.path().join("b_roll/city.webm"));

        let locator = DirectoryLocator::new(vec![dir.path().to_path_buf()]);

        let a = locator.resolve("segment_1", SegmentRole::ARoll).await.unwrap();
        assert_eq!(a.path, dir.path().join("a_roll/segment_1.mp4"));

        let b = locator.resolve("city", SegmentRole::BRoll).await.unwrap();
        assert_eq!(b.path, dir.path().join("b_roll/city.webm"));

        // Images are not narration sources
        assert_eq!(locator.find("segment_1", SegmentRole::BRoll).len(), 2);
        assert_eq!(locator.find("segment_1", SegmentRole::ARoll).len(), 1);
    }

    #[tokio::test]
    async fn test_unresolved_id() {
        let dir = TempDir::new().unwrap();
        let locator = DirectoryLocator::new(vec![dir.path().to_path_buf()]);
        let err = locator.resolve("ghost", SegmentRole::ARoll).await.unwrap_err();
        match err {
            DomainError::UnresolvedReferences(refs) => assert_eq!(refs[0].segment_id, "ghost"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
