// Manifest file adapter - Project manifests in YAML, JSON or TOML

use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::usecases::ProjectManifest;
use crate::error::{ReelsmithError, ReelsmithResult};

/// Manifest document formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Json,
    Toml,
}

impl ManifestFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Reads project manifests from disk
pub struct ManifestFileAdapter;

impl ManifestFileAdapter {
    /// Load a manifest; relative paths inside it are resolved against its directory
    pub fn load(path: &Path) -> ReelsmithResult<ProjectManifest> {
        let format = ManifestFormat::from_path(path).ok_or_else(|| ReelsmithError::ManifestError {
            path: path.display().to_string(),
            message: "unknown extension; use .yaml, .yml, .json or .toml".to_string(),
        })?;
        let content = std::fs::read_to_string(path).map_err(|e| ReelsmithError::ManifestError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut manifest = Self::parse(&content, format)?;
        if let Some(base) = path.parent() {
            Self::resolve_relative(&mut manifest, base);
        }

        info!(
            a_roll = manifest.a_roll.len(),
            b_roll = manifest.b_roll.len(),
            "Loaded manifest {}",
            path.display()
        );
        Ok(manifest)
    }

    pub fn parse(content: &str, format: ManifestFormat) -> ReelsmithResult<ProjectManifest> {
        let manifest = match format {
            ManifestFormat::Yaml => serde_yaml::from_str(content)?,
            ManifestFormat::Json => serde_json::from_str(content)?,
            ManifestFormat::Toml => toml::from_str(content)?,
        };
        Ok(manifest)
    }

    fn resolve_relative(manifest: &mut ProjectManifest, base: &Path) {
        let join = |path: &PathBuf| -> PathBuf {
            if path.is_relative() {
                base.join(path)
            } else {
                path.clone()
            }
        };

        for spec in &mut manifest.a_roll {
            spec.path = spec.path.as_ref().map(join);
        }
        for spec in &mut manifest.b_roll {
            spec.path = spec.path.as_ref().map(join);
        }
        manifest.media_dirs = manifest.media_dirs.iter().map(join).collect();
        if let Some(entries) = manifest.custom_sequence.as_mut() {
            for entry in entries {
                entry.visual_source.path = join(&entry.visual_source.path);
            }
        }
    }
}
