// Assemble interactor - Drives planning, validation, normalization, rendering and publishing

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tempfile::TempDir;
use tracing::{error, info, warn};

use crate::app::validate_interactor::missing_sources;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::{CrossfadePlan, OverlapValidator};
use crate::domain::usecases::*;
use crate::engine::{MediaNormalizer, ProgressPhase, ProgressTracker};
use crate::output::{OutputVerifier, OutputWriter, SequenceStore};
use crate::planner::SequencePlanner;
use crate::ports::*;

/// Progress reached at the end of each stage
mod band {
    pub const PLANNED: f64 = 10.0;
    pub const VALIDATED: f64 = 12.0;
    pub const SOURCES_CHECKED: f64 = 15.0;
    pub const NORMALIZED: f64 = 75.0;
    pub const RENDER_START: f64 = 80.0;
    pub const RENDER_RETRY: f64 = 82.0;
    pub const RENDERED: f64 = 95.0;
}

/// Everything one assembly run produced, successful or not
#[derive(Debug, Clone, Serialize)]
pub struct AssemblyState {
    /// Last stage entered
    pub stage: PipelineStage,
    pub sequence: Option<AssemblySequence>,
    pub overlaps: Vec<AudioOverlap>,
    #[serde(skip)]
    pub normalized: Vec<NormalizedEntry>,
    pub diagnostics: Vec<Diagnostic>,
    pub missing_files: Vec<MissingFile>,
    pub output_path: Option<PathBuf>,
    pub backend_used: Option<String>,
    #[serde(skip)]
    pub error: Option<DomainError>,
}

impl Default for AssemblyState {
    fn default() -> Self {
        Self {
            stage: PipelineStage::Planning,
            sequence: None,
            overlaps: Vec::new(),
            normalized: Vec::new(),
            diagnostics: Vec::new(),
            missing_files: Vec::new(),
            output_path: None,
            backend_used: None,
            error: None,
        }
    }
}

impl AssemblyState {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.output_path.is_some()
    }

    /// Caller-facing summary
    pub fn result(&self) -> AssemblyResult {
        AssemblyResult {
            status: if self.is_success() {
                AssemblyStatus::Success
            } else {
                AssemblyStatus::Error
            },
            output_path: self.output_path.clone(),
            diagnostics: self.diagnostics.clone(),
            missing_files: self.missing_files.clone(),
        }
    }

    fn warn(&mut self, stage: PipelineStage, message: impl Into<String>) {
        let message = message.into();
        warn!(stage = %stage, "{}", message);
        self.diagnostics.push(Diagnostic::warning(stage, message));
    }

    fn fail(&mut self, err: DomainError) {
        let mut diagnostic = Diagnostic::error(err.stage(), err.to_string());
        if let Some(segment_id) = err.segment_id() {
            diagnostic = diagnostic.for_segment(segment_id);
        }
        if let DomainError::MissingSource { ref missing, .. } = err {
            self.missing_files = missing.clone();
        }
        self.diagnostics.push(diagnostic);
        self.error = Some(err);
    }
}

fn progress_phase(stage: PipelineStage) -> ProgressPhase {
    match stage {
        PipelineStage::Planning => ProgressPhase::Planning,
        PipelineStage::Validation => ProgressPhase::Validating,
        PipelineStage::SourceCheck => ProgressPhase::CheckingSources,
        PipelineStage::Normalization => ProgressPhase::Normalizing,
        PipelineStage::Rendering => ProgressPhase::Rendering,
        PipelineStage::Publishing => ProgressPhase::Publishing,
        PipelineStage::Complete => ProgressPhase::Complete,
    }
}

/// Stops the run when cancellation was requested
fn checkpoint(tracker: &ProgressTracker, stage: PipelineStage) -> Result<(), DomainError> {
    if tracker.is_cancelled() {
        info!(stage = %stage, "Cancellation requested");
        return Err(DomainError::Cancelled { stage });
    }
    Ok(())
}

/// Interactor running a whole assembly
pub struct AssemblyOrchestrator {
    planner: SequencePlanner,
    normalizer: MediaNormalizer,
    primary: Arc<dyn RenderPort>,
    fallback: Arc<dyn RenderPort>,
    verifier: OutputVerifier,
    writer: OutputWriter,
    store: SequenceStore,
    confirmation: Arc<dyn OverlapConfirmation>,
    work_root: Option<PathBuf>,
}

impl AssemblyOrchestrator {
    pub fn new(
        planner: SequencePlanner,
        normalizer: MediaNormalizer,
        primary: Arc<dyn RenderPort>,
        fallback: Arc<dyn RenderPort>,
        probe_port: Arc<dyn ProbePort>,
        confirmation: Arc<dyn OverlapConfirmation>,
    ) -> Self {
        let fps = normalizer.settings().fps;
        let writer = OutputWriter::default();
        Self {
            planner,
            normalizer,
            primary,
            fallback,
            verifier: OutputVerifier::new(probe_port, fps),
            store: SequenceStore::new(writer.clone()),
            writer,
            confirmation,
            work_root: None,
        }
    }

    pub fn with_writer(mut self, writer: OutputWriter) -> Self {
        self.store = SequenceStore::new(writer.clone());
        self.writer = writer;
        self
    }

    /// Parent directory for the per-run scratch directory; the system temp dir otherwise
    pub fn with_work_root(mut self, root: Option<PathBuf>) -> Self {
        self.work_root = root;
        self
    }

    pub fn planner(&self) -> &SequencePlanner {
        &self.planner
    }

    /// Run the pipeline. Failures are recorded in the returned state, never panicked on.
    pub async fn assemble(&self, request: AssemblyRequest, tracker: &ProgressTracker) -> AssemblyState {
        let mut state = AssemblyState::default();
        tracker.start("assembly");

        match self.run(&request, &mut state, tracker).await {
            Ok(path) => {
                state.stage = PipelineStage::Complete;
                state.diagnostics.push(Diagnostic::info(
                    PipelineStage::Complete,
                    format!("Output written to {}", path.display()),
                ));
                tracker.complete(Some(path.display().to_string()));
                info!(output = %path.display(), "Assembly complete");
                state.output_path = Some(path);
            }
            Err(err) => {
                match err {
                    DomainError::Cancelled { .. } => tracker.cancel(),
                    _ => tracker.error(&err.to_string()),
                }
                error!(stage = %err.stage(), "Assembly failed: {}", err);
                state.fail(err);
            }
        }
        state
    }

    async fn run(
        &self,
        request: &AssemblyRequest,
        state: &mut AssemblyState,
        tracker: &ProgressTracker,
    ) -> Result<PathBuf, DomainError> {
        let sequence = self.plan(request, state, tracker)?;
        checkpoint(tracker, PipelineStage::Planning)?;

        self.gate_overlaps(request, &sequence, state, tracker)?;
        checkpoint(tracker, PipelineStage::Validation)?;

        state.stage = PipelineStage::SourceCheck;
        let missing = missing_sources(&sequence);
        if !missing.is_empty() {
            return Err(DomainError::MissingSource {
                missing,
                stage: PipelineStage::SourceCheck,
            });
        }
        self.report(tracker, PipelineStage::SourceCheck, band::SOURCES_CHECKED, "all sources present");
        checkpoint(tracker, PipelineStage::SourceCheck)?;

        let work = self.create_work_dir()?;
        let outcome = self.normalize_and_render(request, &sequence, work.path(), state, tracker).await;
        if let Err(e) = work.close() {
            state.warn(
                PipelineStage::Complete,
                format!("could not remove working directory: {}", e),
            );
        }
        outcome
    }

    fn plan(
        &self,
        request: &AssemblyRequest,
        state: &mut AssemblyState,
        tracker: &ProgressTracker,
    ) -> Result<AssemblySequence, DomainError> {
        state.stage = PipelineStage::Planning;
        let sequence = match &request.input {
            AssemblyInput::Plan {
                a_roll,
                b_roll,
                policy,
            } => self.planner.plan(a_roll, b_roll, policy)?,
            AssemblyInput::Sequence(sequence) => {
                sequence.validate()?;
                sequence.clone()
            }
        };
        state.sequence = Some(sequence.clone());

        if let Some(path) = &request.save_sequence {
            if let Err(e) = self.store.save(&sequence, path) {
                state.warn(
                    PipelineStage::Planning,
                    format!("could not save sequence to {}: {}", path.display(), e),
                );
            }
        }

        self.report(
            tracker,
            PipelineStage::Planning,
            band::PLANNED,
            format!(
                "planned {} entries ({:.1}s)",
                sequence.len(),
                sequence.total_duration()
            ),
        );
        Ok(sequence)
    }

    fn gate_overlaps(
        &self,
        request: &AssemblyRequest,
        sequence: &AssemblySequence,
        state: &mut AssemblyState,
        tracker: &ProgressTracker,
    ) -> Result<(), DomainError> {
        state.stage = PipelineStage::Validation;
        let overlaps = OverlapValidator::validate(sequence);
        state.overlaps = overlaps.clone();

        if !overlaps.is_empty() {
            for overlap in &overlaps {
                state.diagnostics.push(
                    Diagnostic::warning(PipelineStage::Validation, overlap.to_string())
                        .for_segment(overlap.audio_segment_id.clone()),
                );
            }
            let accepted = request.allow_overlap || self.confirmation.confirm(&overlaps);
            if !accepted {
                return Err(DomainError::OverlapRejected { overlaps });
            }
            warn!(overlaps = overlaps.len(), "Continuing with duplicate audio");
        }

        self.report(
            tracker,
            PipelineStage::Validation,
            band::VALIDATED,
            format!("{} audio overlap(s)", overlaps.len()),
        );
        Ok(())
    }

    async fn normalize_and_render(
        &self,
        request: &AssemblyRequest,
        sequence: &AssemblySequence,
        work_dir: &Path,
        state: &mut AssemblyState,
        tracker: &ProgressTracker,
    ) -> Result<PathBuf, DomainError> {
        state.stage = PipelineStage::Normalization;
        let durations: Vec<f64> = sequence.entries.iter().map(|e| e.duration).collect();
        let crossfade = CrossfadePlan::new(sequence.crossfade_duration, &durations);
        if crossfade.duration < sequence.crossfade_duration && sequence.len() > 1 {
            state.warn(
                PipelineStage::Normalization,
                format!(
                    "crossfade shortened to {:.3}s to fit the shortest entry",
                    crossfade.duration
                ),
            );
        }

        let span = band::NORMALIZED - band::SOURCES_CHECKED;
        let normalized = self
            .normalizer
            .normalize_sequence(sequence, &crossfade, work_dir, |done, total, entry| {
                let percent = band::SOURCES_CHECKED + span * done as f64 / total.max(1) as f64;
                tracker.report(
                    ProgressPhase::Normalizing,
                    percent,
                    format!("normalized {}/{} ({})", done, total, entry.visual_segment_id),
                );
                !tracker.is_cancelled()
            })
            .await?;
        state.normalized = normalized.clone();
        checkpoint(tracker, PipelineStage::Normalization)?;

        state.stage = PipelineStage::Rendering;
        let final_path = self
            .writer
            .next_output_path(&request.output_dir)
            .map_err(|e| DomainError::Publish {
                path: request.output_dir.clone(),
                message: e.to_string(),
            })?;
        let staging = self.writer.staging_path(&final_path);
        let job = RenderJob {
            entries: normalized,
            resolution: sequence.target_resolution,
            crossfade: crossfade.duration,
            work_dir: work_dir.to_path_buf(),
        };

        let backend = match self.render_with_fallback(&job, &staging, state, tracker).await {
            Ok(backend) => backend,
            Err(err) => {
                self.writer.discard(&staging);
                return Err(err);
            }
        };
        state.backend_used = Some(backend.clone());
        self.report(
            tracker,
            PipelineStage::Rendering,
            band::RENDERED,
            format!("render complete ({})", backend),
        );

        let verification = self
            .verifier
            .verify(&staging, sequence.total_duration(), sequence.len())
            .await;
        if !verification.success {
            state.warn(
                PipelineStage::Rendering,
                verification
                    .message
                    .unwrap_or_else(|| "output verification failed".to_string()),
            );
        }

        if let Err(err) = checkpoint(tracker, PipelineStage::Publishing) {
            self.writer.discard(&staging);
            return Err(err);
        }

        state.stage = PipelineStage::Publishing;
        if let Err(e) = self.writer.publish(&staging, &final_path) {
            self.writer.discard(&staging);
            return Err(DomainError::Publish {
                path: final_path,
                message: e.to_string(),
            });
        }
        self.report(tracker, PipelineStage::Publishing, 100.0, "published");
        Ok(final_path)
    }

    /// Primary backend, then one retry of the whole render with the fallback
    async fn render_with_fallback(
        &self,
        job: &RenderJob,
        staging: &Path,
        state: &mut AssemblyState,
        tracker: &ProgressTracker,
    ) -> Result<String, DomainError> {
        self.report(
            tracker,
            PipelineStage::Rendering,
            band::RENDER_START,
            format!("render start ({})", self.primary.name()),
        );

        let primary_err = match self.primary.render(job, staging).await {
            Ok(()) => return Ok(self.primary.name().to_string()),
            Err(err) => err,
        };

        let mut diagnostic = Diagnostic::warning(
            PipelineStage::Rendering,
            format!(
                "{} backend failed, retrying with {}: {}",
                self.primary.name(),
                self.fallback.name(),
                primary_err
            ),
        );
        if let Some(segment_id) = primary_err.segment_id() {
            diagnostic = diagnostic.for_segment(segment_id);
        }
        warn!("{}", diagnostic.message);
        state.diagnostics.push(diagnostic);
        self.writer.discard(staging);
        checkpoint(tracker, PipelineStage::Rendering)?;

        self.report(
            tracker,
            PipelineStage::Rendering,
            band::RENDER_RETRY,
            format!("render retry ({})", self.fallback.name()),
        );
        self.fallback.render(job, staging).await?;
        Ok(self.fallback.name().to_string())
    }

    fn create_work_dir(&self) -> Result<TempDir, DomainError> {
        let builder_result = match &self.work_root {
            Some(root) => std::fs::create_dir_all(root).and_then(|_| {
                tempfile::Builder::new().prefix("reelsmith-").tempdir_in(root)
            }),
            None => tempfile::Builder::new().prefix("reelsmith-").tempdir(),
        };
        builder_result.map_err(|e| DomainError::Normalization {
            segment_id: "-".to_string(),
            path: self.work_root.clone().unwrap_or_else(std::env::temp_dir),
            message: format!("cannot create working directory: {}", e),
        })
    }

    fn report(&self, tracker: &ProgressTracker, stage: PipelineStage, percent: f64, message: impl Into<String>) {
        tracker.report(progress_phase(stage), percent, message);
    }
}
