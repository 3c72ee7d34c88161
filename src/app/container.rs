use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::{DirectoryLocator, FfmpegCliAdapter};
use crate::app::{AssemblyOrchestrator, ResolveInteractor, ValidateInteractor};
use crate::config_initialization::AppConfig;
use crate::domain::errors::DomainError;
use crate::engine::{ConcatDemuxRenderer, FilterGraphRenderer, MediaNormalizer};
use crate::output::SequenceStore;
use crate::planner::SequencePlanner;
use crate::ports::{FfmpegPort, MediaLocator, OverlapConfirmation, ProbePort, RenderPort};

pub trait AppContainer: Send + Sync {
    fn assembly_orchestrator(&self) -> Arc<AssemblyOrchestrator>;
    fn validate_interactor(&self) -> Arc<ValidateInteractor>;
    /// Resolver searching the configured media directories plus `extra_dirs`
    fn resolve_interactor(&self, extra_dirs: &[PathBuf]) -> ResolveInteractor;
    fn sequence_store(&self) -> &SequenceStore;
    fn config(&self) -> &AppConfig;
}

pub struct DefaultAppContainer {
    config: AppConfig,
    probe_port: Arc<dyn ProbePort>,
    assembly_orchestrator: Arc<AssemblyOrchestrator>,
    validate_interactor: Arc<ValidateInteractor>,
    sequence_store: SequenceStore,
}

impl DefaultAppContainer {
    pub fn new(config: AppConfig, confirmation: Arc<dyn OverlapConfirmation>) -> Result<Self, DomainError> {
        let ffmpeg_port: Arc<dyn FfmpegPort> =
            Arc::new(FfmpegCliAdapter::locate(config.ffmpeg.as_deref()));
        let probe_port = Self::probe_port(&config)?;

        Self::with_ports(config, ffmpeg_port, probe_port, confirmation)
    }

    /// Wire the application around explicit tool ports
    pub fn with_ports(
        config: AppConfig,
        ffmpeg_port: Arc<dyn FfmpegPort>,
        probe_port: Arc<dyn ProbePort>,
        confirmation: Arc<dyn OverlapConfirmation>,
    ) -> Result<Self, DomainError> {
        config.encoding.validate()?;

        let planner = SequencePlanner::new(config.resolution, config.crossfade_duration);
        let normalizer = MediaNormalizer::new(
            Arc::clone(&ffmpeg_port),
            Arc::clone(&probe_port),
            config.encoding.clone(),
        )
        .with_max_parallel(config.jobs);
        let primary: Arc<dyn RenderPort> = Arc::new(FilterGraphRenderer::new(
            Arc::clone(&ffmpeg_port),
            config.encoding.clone(),
        ));
        let fallback: Arc<dyn RenderPort> = Arc::new(ConcatDemuxRenderer::new(
            Arc::clone(&ffmpeg_port),
            config.encoding.clone(),
        ));

        let assembly_orchestrator = Arc::new(
            AssemblyOrchestrator::new(
                planner,
                normalizer,
                primary,
                fallback,
                Arc::clone(&probe_port),
                confirmation,
            )
            .with_work_root(config.work_dir.clone()),
        );

        Ok(Self {
            config,
            probe_port,
            assembly_orchestrator,
            validate_interactor: Arc::new(ValidateInteractor::new()),
            sequence_store: SequenceStore::default(),
        })
    }

    #[cfg(feature = "libav")]
    fn probe_port(_config: &AppConfig) -> Result<Arc<dyn ProbePort>, DomainError> {
        Ok(Arc::new(crate::adapters::ProbeLibavAdapter::new()?))
    }

    #[cfg(not(feature = "libav"))]
    fn probe_port(config: &AppConfig) -> Result<Arc<dyn ProbePort>, DomainError> {
        Ok(Arc::new(crate::adapters::FfprobeAdapter::locate(config.ffprobe.as_deref())))
    }
}

impl AppContainer for DefaultAppContainer {
    fn assembly_orchestrator(&self) -> Arc<AssemblyOrchestrator> {
        Arc::clone(&self.assembly_orchestrator)
    }

    fn validate_interactor(&self) -> Arc<ValidateInteractor> {
        Arc::clone(&self.validate_interactor)
    }

    fn resolve_interactor(&self, extra_dirs: &[PathBuf]) -> ResolveInteractor {
        let mut roots = extra_dirs.to_vec();
        roots.extend(self.config.media_dirs.iter().cloned());
        let locator: Arc<dyn MediaLocator> = Arc::new(DirectoryLocator::new(roots));
        ResolveInteractor::new(locator, Arc::clone(&self.probe_port))
    }

    fn sequence_store(&self) -> &SequenceStore {
        &self.sequence_store
    }

    fn config(&self) -> &AppConfig {
        &self.config
    }
}
