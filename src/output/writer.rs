//! Output file writer: unique naming, staging and atomic publishing

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::error::{ReelsmithError, ReelsmithResult};
use crate::output::OutputConfig;

/// Output file writer
#[derive(Debug, Clone, Default)]
pub struct OutputWriter {
    config: OutputConfig,
}

impl OutputWriter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    /// File name for an output produced at `timestamp`
    pub fn file_name_at(&self, timestamp: DateTime<Local>) -> String {
        format!(
            "{}_{}.{}",
            self.config.prefix,
            timestamp.format(&self.config.timestamp_format),
            self.config.extension
        )
    }

    /// Fresh output path in `dir`; never names an existing file
    pub fn next_output_path(&self, dir: &Path) -> ReelsmithResult<PathBuf> {
        self.ensure_output_directory(dir)?;

        let name = self.file_name_at(Local::now());
        let candidate = dir.join(&name);
        if !candidate.exists() {
            return Ok(candidate);
        }

        let stem = name
            .strip_suffix(&format!(".{}", self.config.extension))
            .unwrap_or(&name)
            .to_string();
        let mut counter = 1u32;
        loop {
            let candidate = dir.join(format!("{}_{}.{}", stem, counter, self.config.extension));
            if !candidate.exists() {
                debug!("Output name taken, using {}", candidate.display());
                return Ok(candidate);
            }
            counter += 1;
        }
    }

    /// Hidden staging path next to the final file, so publishing is a same-volume rename
    pub fn staging_path(&self, final_path: &Path) -> PathBuf {
        let name = final_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("output.{}", self.config.extension));
        final_path.with_file_name(format!(".tmp_{}", name))
    }

    /// Move a finished staging file into place
    pub fn publish(&self, staging: &Path, final_path: &Path) -> ReelsmithResult<()> {
        let metadata = std::fs::metadata(staging)?;
        if metadata.len() == 0 {
            return Err(ReelsmithError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("staged output {} is empty", staging.display()),
            )));
        }
        let already_exists = || {
            ReelsmithError::IoError(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", final_path.display()),
            ))
        };

        // Linking fails instead of replacing a file that appeared after naming
        match std::fs::hard_link(staging, final_path) {
            Ok(()) => {
                if let Err(e) = std::fs::remove_file(staging) {
                    warn!("Failed to remove staged output {}: {}", staging.display(), e);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Err(already_exists()),
            Err(e) => {
                debug!("Hard link unavailable ({}), renaming instead", e);
                if final_path.exists() {
                    return Err(already_exists());
                }
                std::fs::rename(staging, final_path)?;
            }
        }
        info!("Output published: {}", final_path.display());
        Ok(())
    }

    /// Remove a staging file left by a failed or cancelled render
    pub fn discard(&self, staging: &Path) {
        if staging.exists() {
            if let Err(e) = std::fs::remove_file(staging) {
                warn!("Failed to remove staged output {}: {}", staging.display(), e);
            }
        }
    }

    /// Write `data` to `path` atomically using a temporary file in the same directory
    pub fn write_atomic(&self, path: &Path, data: &[u8]) -> ReelsmithResult<()> {
        if let Some(parent) = path.parent() {
            self.ensure_output_directory(parent)?;
        }
        let temp_path = self.staging_path(path);

        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&temp_path)?;
            file.write_all(data)?;
            file.sync_all()?;
        }

        if let Err(e) = std::fs::rename(&temp_path, path) {
            self.discard(&temp_path);
            return Err(e.into());
        }
        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn ensure_output_directory(&self, dir: &Path) -> ReelsmithResult<()> {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
