//! Configuration initialization and hierarchy management
//!
//! Precedence: CLI flags > `REELSMITH_*` environment (both handled by clap) > config file
//! > built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::errors::DomainError;
use crate::domain::model::{Resolution, DEFAULT_CROSSFADE};
use crate::engine::EncodingSettings;
use crate::planner::{SequencePolicy, DEFAULT_BROLL_DENSITY};
use crate::ports::ConfigPort;

/// `[reelsmith]` section of the config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralSection {
    pub output_dir: Option<PathBuf>,
    pub resolution: Option<String>,
    pub crossfade_duration: Option<f64>,
    pub policy: Option<String>,
    pub broll_density: Option<f64>,
    pub jobs: Option<usize>,
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
    pub media_dirs: Option<Vec<PathBuf>>,
    /// Parent directory for per-run scratch directories
    pub work_dir: Option<PathBuf>,
}

/// `[encoding]` section of the config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncodingSection {
    pub fps: Option<u32>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub preset: Option<String>,
    pub crf: Option<u8>,
    pub audio_bitrate: Option<String>,
}

/// Partial configuration as read from a file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub reelsmith: GeneralSection,
    #[serde(default)]
    pub encoding: EncodingSection,
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_dir: Option<PathBuf>,
    pub resolution: Option<String>,
    pub crossfade_duration: Option<f64>,
    pub policy: Option<String>,
    pub broll_density: Option<f64>,
    pub jobs: Option<usize>,
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
    pub media_dirs: Vec<PathBuf>,
    pub crf: Option<u8>,
    pub preset: Option<String>,
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub output_dir: PathBuf,
    pub resolution: Resolution,
    pub crossfade_duration: f64,
    pub policy_name: String,
    pub broll_density: f64,
    pub jobs: usize,
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
    pub media_dirs: Vec<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub encoding: EncodingSettings,
    /// File the configuration was read from, if any
    pub source: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            resolution: Resolution::default(),
            crossfade_duration: DEFAULT_CROSSFADE,
            policy_name: SequencePolicy::NoOverlap.name().to_string(),
            broll_density: DEFAULT_BROLL_DENSITY,
            jobs: num_cpus::get().max(1),
            ffmpeg: None,
            ffprobe: None,
            media_dirs: Vec::new(),
            work_dir: None,
            encoding: EncodingSettings::default(),
            source: None,
        }
    }
}

impl AppConfig {
    /// Named policy with the configured density
    pub fn policy(&self) -> Result<SequencePolicy, DomainError> {
        SequencePolicy::parse(&self.policy_name, self.broll_density)
    }

    fn apply_file(&mut self, file: ConfigFile) -> Result<(), DomainError> {
        let general = file.reelsmith;
        if let Some(dir) = general.output_dir {
            self.output_dir = dir;
        }
        if let Some(resolution) = general.resolution {
            self.resolution = Resolution::parse(&resolution)?;
        }
        if let Some(crossfade) = general.crossfade_duration {
            self.crossfade_duration = crossfade;
        }
        if let Some(policy) = general.policy {
            self.policy_name = policy;
        }
        if let Some(density) = general.broll_density {
            self.broll_density = density;
        }
        if let Some(jobs) = general.jobs {
            self.jobs = jobs;
        }
        self.ffmpeg = general.ffmpeg.or(self.ffmpeg.take());
        self.ffprobe = general.ffprobe.or(self.ffprobe.take());
        if let Some(dirs) = general.media_dirs {
            self.media_dirs = dirs;
        }
        self.work_dir = general.work_dir.or(self.work_dir.take());

        let encoding = file.encoding;
        if let Some(fps) = encoding.fps {
            self.encoding.fps = fps;
        }
        if let Some(codec) = encoding.video_codec {
            self.encoding.video_codec = codec;
        }
        if let Some(codec) = encoding.audio_codec {
            self.encoding.audio_codec = codec;
        }
        if let Some(preset) = encoding.preset {
            self.encoding.preset = preset;
        }
        if let Some(crf) = encoding.crf {
            self.encoding.crf = crf;
        }
        if let Some(bitrate) = encoding.audio_bitrate {
            self.encoding.audio_bitrate = bitrate;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<(), DomainError> {
        if let Some(ref dir) = overrides.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(ref resolution) = overrides.resolution {
            self.resolution = Resolution::parse(resolution)?;
        }
        if let Some(crossfade) = overrides.crossfade_duration {
            self.crossfade_duration = crossfade;
        }
        if let Some(ref policy) = overrides.policy {
            self.policy_name = policy.clone();
        }
        if let Some(density) = overrides.broll_density {
            self.broll_density = density;
        }
        if let Some(jobs) = overrides.jobs {
            self.jobs = jobs;
        }
        if let Some(ref ffmpeg) = overrides.ffmpeg {
            self.ffmpeg = Some(ffmpeg.clone());
        }
        if let Some(ref ffprobe) = overrides.ffprobe {
            self.ffprobe = Some(ffprobe.clone());
        }
        if !overrides.media_dirs.is_empty() {
            self.media_dirs = overrides.media_dirs.clone();
        }
        if let Some(crf) = overrides.crf {
            self.encoding.crf = crf;
        }
        if let Some(ref preset) = overrides.preset {
            self.encoding.preset = preset.clone();
        }
        Ok(())
    }

    /// Effective values as a config document
    pub fn to_file(&self) -> ConfigFile {
        ConfigFile {
            reelsmith: GeneralSection {
                output_dir: Some(self.output_dir.clone()),
                resolution: Some(self.resolution.to_string()),
                crossfade_duration: Some(self.crossfade_duration),
                policy: Some(self.policy_name.clone()),
                broll_density: Some(self.broll_density),
                jobs: Some(self.jobs),
                ffmpeg: self.ffmpeg.clone(),
                ffprobe: self.ffprobe.clone(),
                media_dirs: Some(self.media_dirs.clone()),
                work_dir: self.work_dir.clone(),
            },
            encoding: EncodingSection {
                fps: Some(self.encoding.fps),
                video_codec: Some(self.encoding.video_codec.clone()),
                audio_codec: Some(self.encoding.audio_codec.clone()),
                preset: Some(self.encoding.preset.clone()),
                crf: Some(self.encoding.crf),
                audio_bitrate: Some(self.encoding.audio_bitrate.clone()),
            },
        }
    }

    /// Reject values no stage could work with
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.crossfade_duration.is_finite() || self.crossfade_duration < 0.0 {
            return Err(DomainError::Config(format!(
                "crossfade_duration cannot be negative, got {}",
                self.crossfade_duration
            )));
        }
        if !(0.0..=1.0).contains(&self.broll_density) {
            return Err(DomainError::Config(format!(
                "broll_density must be between 0 and 1, got {}",
                self.broll_density
            )));
        }
        if self.jobs == 0 {
            return Err(DomainError::Config("jobs must be at least 1".to_string()));
        }
        // `custom` is selected by a manifest entry list, not parsed from a name
        if !self.policy_name.eq_ignore_ascii_case("custom") {
            self.policy()?;
        }
        self.encoding.validate()
    }
}

/// Build the effective configuration from defaults, the config file and overrides
pub fn initialize_configuration_hierarchy(
    config_port: &dyn ConfigPort,
    explicit_file: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<AppConfig, DomainError> {
    info!("Initializing configuration hierarchy");
    let mut config = AppConfig::default();

    let file_path = match explicit_file {
        Some(path) => {
            if !path.exists() {
                return Err(DomainError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            Some(path.to_path_buf())
        }
        None => config_port
            .default_config_paths()
            .into_iter()
            .find(|candidate| candidate.is_file()),
    };

    match file_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            let file = config_port.load_config(&path)?;
            config.apply_file(file)?;
            config.source = Some(path);
        }
        None => debug!("No configuration file found, using defaults"),
    }

    config.apply_overrides(overrides)?;
    config.validate()?;

    debug!(
        output_dir = %config.output_dir.display(),
        resolution = %config.resolution,
        crossfade = config.crossfade_duration,
        policy = %config.policy_name,
        jobs = config.jobs,
        "Configuration resolved"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapConfigPort {
        files: HashMap<PathBuf, ConfigFile>,
    }

    impl ConfigPort for MapConfigPort {
        fn load_config(&self, path: &Path) -> Result<ConfigFile, DomainError> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| DomainError::Config("missing".to_string()))
        }

        fn default_config_paths(&self) -> Vec<PathBuf> {
            vec![PathBuf::from("/nonexistent/reelsmith.toml")]
        }
    }

    #[test]
    fn test_defaults_without_file() {
        let port = MapConfigPort {
            files: HashMap::new(),
        };
        let config =
            initialize_configuration_hierarchy(&port, None, &ConfigOverrides::default()).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.resolution, Resolution::PORTRAIT_1080);
        assert_eq!(config.crossfade_duration, 0.3);
        assert_eq!(config.encoding.crf, 22);
        assert_eq!(config.policy().unwrap(), SequencePolicy::NoOverlap);
        assert!(config.source.is_none());
    }

    #[test]
    fn test_file_then_overrides() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("reelsmith.toml");
        std::fs::write(&path, "").unwrap();

        let mut file = ConfigFile::default();
        file.reelsmith.resolution = Some("720x1280".to_string());
        file.reelsmith.policy = Some("standard".to_string());
        file.encoding.crf = Some(28);
        file.encoding.preset = Some("slow".to_string());
        let port = MapConfigPort {
            files: HashMap::from([(path.clone(), file)]),
        };

        let overrides = ConfigOverrides {
            crf: Some(18),
            broll_density: Some(0.5),
            ..Default::default()
        };
        let config = initialize_configuration_hierarchy(&port, Some(&path), &overrides).unwrap();

        assert_eq!(config.resolution, Resolution::PORTRAIT_720);
        assert_eq!(config.encoding.crf, 18);
        assert_eq!(config.encoding.preset, "slow");
        assert_eq!(
            config.policy().unwrap(),
            SequencePolicy::Standard { broll_density: 0.5 }
        );
        assert_eq!(config.source, Some(path));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let port = MapConfigPort {
            files: HashMap::new(),
        };
        for overrides in [
            ConfigOverrides {
                crossfade_duration: Some(-1.0),
                ..Default::default()
            },
            ConfigOverrides {
                broll_density: Some(1.5),
                ..Default::default()
            },
            ConfigOverrides {
                jobs: Some(0),
                ..Default::default()
            },
            ConfigOverrides {
                policy: Some("zigzag".to_string()),
                ..Default::default()
            },
            ConfigOverrides {
                resolution: Some("1081x1920".to_string()),
                ..Default::default()
            },
        ] {
            assert!(initialize_configuration_hierarchy(&port, None, &overrides).is_err());
        }
    }

    #[test]
    fn test_missing_explicit_file() {
        let port = MapConfigPort {
            files: HashMap::new(),
        };
        let err = initialize_configuration_hierarchy(
            &port,
            Some(Path::new("/nonexistent/custom.toml")),
            &ConfigOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Config(_)));
    }
}
