//! End-to-end tests for the assembly pipeline
//!
//! ffmpeg and the prober are replaced with fakes: the fake ffmpeg writes the last
//! `-t` value of each invocation into its output file and the fake prober reads a
//! file's content back as its duration.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use assert_cmd::Command;
use async_trait::async_trait;
use predicates::prelude::*;
use tempfile::TempDir;

use reelsmith::app::container::{AppContainer, DefaultAppContainer};
use reelsmith::config_initialization::AppConfig;
use reelsmith::domain::errors::DomainError;
use reelsmith::domain::model::*;
use reelsmith::domain::usecases::AssemblyRequest;
use reelsmith::engine::progress::ProgressCallback;
use reelsmith::engine::ProgressTracker;
use reelsmith::error::{ReelsmithError, ReelsmithResult};
use reelsmith::output::SequenceStore;
use reelsmith::planner::SequencePolicy;
use reelsmith::ports::{FfmpegPort, MediaProbe, OverlapConfirmation, ProbePort, StaticConfirmation};

// Test utilities

/// Fake ffmpeg recording every invocation
#[derive(Default)]
struct FakeFfmpeg {
    calls: Mutex<Vec<Vec<String>>>,
    /// Fail any run whose arguments contain this token
    fail_on: Option<String>,
}

impl FakeFfmpeg {
    fn failing_on(token: &str) -> Self {
        Self {
            fail_on: Some(token.to_string()),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FfmpegPort for FakeFfmpeg {
    async fn run(&self, args: &[String]) -> ReelsmithResult<()> {
        self.calls.lock().unwrap().push(args.to_vec());

        if let Some(token) = &self.fail_on {
            if args.iter().any(|arg| arg.contains(token.as_str())) {
                return Err(ReelsmithError::ToolFailed {
                    program: "ffmpeg".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: vec!["Error initializing complex filters".to_string()],
                });
            }
        }

        let output = PathBuf::from(args.last().unwrap());
        let duration = args
            .iter()
            .rposition(|arg| arg == "-t")
            .and_then(|i| args.get(i + 1))
            .cloned()
            .unwrap_or_else(|| "1.0".to_string());
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output, duration)?;
        Ok(())
    }
}

/// Fake prober reading a file's content as its duration
#[derive(Default)]
struct FakeProbe;

#[async_trait]
impl ProbePort for FakeProbe {
    async fn probe(&self, path: &Path) -> Result<MediaProbe, DomainError> {
        let content = fs::read_to_string(path).map_err(|e| DomainError::Probe {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(MediaProbe {
            duration: content.trim().parse().ok(),
            width: Some(1920),
            height: Some(1080),
            has_video: true,
            has_audio: true,
        })
    }
}

/// Requests cancellation once progress passes a threshold
struct CancelAfter {
    threshold: f64,
    flag: AtomicBool,
    cancelled_events: AtomicUsize,
}

impl CancelAfter {
    fn new(threshold: f64) -> Self {
        Self {
            threshold,
            flag: AtomicBool::new(false),
            cancelled_events: AtomicUsize::new(0),
        }
    }
}

impl ProgressCallback for CancelAfter {
    fn on_start(&self, _operation: &str) {}
    fn on_progress(&self, percent: f64, _stage: &str) {
        if percent >= self.threshold {
            self.flag.store(true, Ordering::SeqCst);
        }
    }
    fn on_complete(&self, _message: Option<String>) {}
    fn on_error(&self, _error: &str) {}
    fn on_cancel(&self) {
        self.cancelled_events.fetch_add(1, Ordering::SeqCst);
    }
    fn should_cancel(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Keeps every reported percentage
#[derive(Default)]
struct RecordProgress {
    percents: Mutex<Vec<f64>>,
}

impl RecordProgress {
    fn percents(&self) -> Vec<f64> {
        self.percents.lock().unwrap().clone()
    }
}

impl ProgressCallback for RecordProgress {
    fn on_start(&self, _operation: &str) {}
    fn on_progress(&self, percent: f64, _stage: &str) {
        self.percents.lock().unwrap().push(percent);
    }
    fn on_complete(&self, _message: Option<String>) {}
    fn on_error(&self, _error: &str) {}
    fn on_cancel(&self) {}
    fn should_cancel(&self) -> bool {
        false
    }
}

fn position_of(percents: &[f64], value: f64) -> usize {
    percents
        .iter()
        .position(|p| *p == value)
        .unwrap_or_else(|| panic!("{} not reported in {:?}", value, percents))
}

/// Source files for three narration clips and one still
struct Project {
    dir: TempDir,
    a_roll: Vec<ARollSegment>,
    b_roll: Vec<BRollSegment>,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let media = dir.path().join("media");
        fs::create_dir_all(&media).unwrap();

        let mut a_roll = Vec::new();
        for (i, duration) in [4.0, 3.0, 5.0].iter().enumerate() {
            let path = media.join(format!("segment_{}.mp4", i));
            fs::write(&path, duration.to_string()).unwrap();
            a_roll.push(ARollSegment::whole_file(format!("segment_{}", i), path, *duration).unwrap());
        }

        let still = media.join("broll_0.png");
        fs::write(&still, "still").unwrap();
        let b_roll = vec![BRollSegment::new("broll_0", still, ContentType::Image).unwrap()];

        Self { dir, a_roll, b_roll }
    }

    fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    fn config(&self) -> AppConfig {
        AppConfig {
            output_dir: self.output_dir(),
            work_dir: Some(self.dir.path().join("work")),
            jobs: 2,
            ..AppConfig::default()
        }
    }

    fn container(
        &self,
        ffmpeg: Arc<FakeFfmpeg>,
        confirmation: Arc<dyn OverlapConfirmation>,
    ) -> DefaultAppContainer {
        DefaultAppContainer::with_ports(self.config(), ffmpeg, Arc::new(FakeProbe), confirmation)
            .unwrap()
    }

    fn request(&self, policy: SequencePolicy) -> AssemblyRequest {
        AssemblyRequest::plan(self.a_roll.clone(), self.b_roll.clone(), policy, self.output_dir())
    }

    fn published_files(&self) -> Vec<PathBuf> {
        match fs::read_dir(self.output_dir()) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

// Pipeline tests

#[tokio::test]
async fn test_assemble_end_to_end() {
    let project = Project::new();
    let ffmpeg = Arc::new(FakeFfmpeg::default());
    let container = project.container(ffmpeg.clone(), Arc::new(StaticConfirmation(false)));
    let tracker = ProgressTracker::new("test");
    let recorder = Arc::new(RecordProgress::default());
    tracker.add_callback(recorder.clone());

    let state = container
        .assembly_orchestrator()
        .assemble(project.request(SequencePolicy::NoOverlap), &tracker)
        .await;

    assert!(state.is_success(), "diagnostics: {:?}", state.diagnostics);
    let output = state.output_path.clone().unwrap();
    assert!(output.exists());
    assert!(output.file_name().unwrap().to_string_lossy().starts_with("assembled_video_"));
    assert_eq!(state.backend_used.as_deref(), Some("filter-graph"));
    assert_eq!(project.published_files(), vec![output]);

    let sequence = state.sequence.as_ref().unwrap();
    assert_eq!(sequence.len(), 3);
    assert_eq!(sequence.entries[1].kind, EntryKind::BrollWithArollAudio);
    assert_eq!(sequence.total_duration(), 12.0);

    // Two runs per entry plus one render
    assert_eq!(ffmpeg.calls().len(), 7);
    let info = tracker.get_info().unwrap();
    assert_eq!(info.percent, 100.0);

    // Planned, one report per normalized entry, render start, rendered, published
    let percents = recorder.percents();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{:?}", percents);
    assert!(percents.iter().all(|p| (0.0..=100.0).contains(p)));
    let planned = position_of(&percents, 10.0);
    let render_start = position_of(&percents, 80.0);
    let rendered = position_of(&percents, 95.0);
    let published = position_of(&percents, 100.0);
    assert!(planned < render_start && render_start < rendered && rendered < published);
    let normalized: Vec<f64> = percents[planned..render_start]
        .iter()
        .cloned()
        .filter(|p| *p > 15.0 && *p <= 75.0)
        .collect();
    assert_eq!(normalized.len(), 3, "{:?}", percents);
    assert_eq!(normalized.last(), Some(&75.0));
    assert!(!percents.contains(&82.0));

    // Scratch files are gone
    let work = project.dir.path().join("work");
    assert_eq!(fs::read_dir(work).unwrap().count(), 0);
}

#[tokio::test]
async fn test_overlap_rejected_without_confirmation() {
    let project = Project::new();
    let ffmpeg = Arc::new(FakeFfmpeg::default());
    let container = project.container(ffmpeg.clone(), Arc::new(StaticConfirmation(false)));

    let a = &project.a_roll;
    let entries = vec![
        TimelineEntry::aroll_full(0, &a[0]),
        TimelineEntry::aroll_full(1, &a[1]),
        TimelineEntry::aroll_full(2, &a[0]),
    ];
    let sequence = AssemblySequence::new(entries, Resolution::default(), 0.3, a.clone());

    let tracker = ProgressTracker::new("test");
    let state = container
        .assembly_orchestrator()
        .assemble(AssemblyRequest::from_sequence(sequence.clone(), project.output_dir()), &tracker)
        .await;

    assert!(!state.is_success());
    assert!(matches!(state.error, Some(DomainError::OverlapRejected { .. })));
    assert_eq!(state.overlaps.len(), 1);
    assert_eq!(state.overlaps[0].entry_index, 2);
    assert!(ffmpeg.calls().is_empty());
    assert!(project.published_files().is_empty());

    // The override flag lets the same sequence through
    let state = container
        .assembly_orchestrator()
        .assemble(
            AssemblyRequest::from_sequence(sequence, project.output_dir()).allow_overlap(true),
            &ProgressTracker::new("test"),
        )
        .await;
    assert!(state.is_success(), "diagnostics: {:?}", state.diagnostics);
    assert!(state
        .diagnostics
        .iter()
        .any(|d| d.level == DiagnosticLevel::Warning && d.segment_id.as_deref() == Some("segment_0")));
}

#[tokio::test]
async fn test_missing_sources_reported_before_rendering() {
    let project = Project::new();
    fs::remove_file(project.a_roll[2].path()).unwrap();
    fs::remove_file(project.b_roll[0].path()).unwrap();

    let ffmpeg = Arc::new(FakeFfmpeg::default());
    let container = project.container(ffmpeg.clone(), Arc::new(StaticConfirmation(false)));
    let state = container
        .assembly_orchestrator()
        .assemble(project.request(SequencePolicy::NoOverlap), &ProgressTracker::new("test"))
        .await;

    let result = state.result();
    assert_eq!(result.status, AssemblyStatus::Error);
    assert_eq!(state.stage, PipelineStage::SourceCheck);
    let mut ids: Vec<&str> = result.missing_files.iter().map(|m| m.segment_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["broll_0", "segment_2"]);
    assert!(ffmpeg.calls().is_empty());
}

#[tokio::test]
async fn test_fallback_backend_after_primary_failure() {
    let project = Project::new();
    let ffmpeg = Arc::new(FakeFfmpeg::failing_on("[vout]"));
    let container = project.container(ffmpeg.clone(), Arc::new(StaticConfirmation(false)));
    let tracker = ProgressTracker::new("test");
    let recorder = Arc::new(RecordProgress::default());
    tracker.add_callback(recorder.clone());

    let state = container
        .assembly_orchestrator()
        .assemble(project.request(SequencePolicy::NoOverlap), &tracker)
        .await;

    assert!(state.is_success(), "diagnostics: {:?}", state.diagnostics);
    assert_eq!(state.backend_used.as_deref(), Some("concat-demuxer"));
    assert!(state
        .diagnostics
        .iter()
        .any(|d| d.level == DiagnosticLevel::Warning && d.message.contains("filter-graph")));
    assert_eq!(project.published_files().len(), 1);

    let percents = recorder.percents();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{:?}", percents);
    let render_start = position_of(&percents, 80.0);
    let retry = position_of(&percents, 82.0);
    let rendered = position_of(&percents, 95.0);
    assert!(render_start < retry && retry < rendered);
}

#[tokio::test]
async fn test_both_backends_failing_publishes_nothing() {
    let project = Project::new();
    let ffmpeg = Arc::new(FakeFfmpeg::failing_on("+faststart"));
    let container = project.container(ffmpeg, Arc::new(StaticConfirmation(false)));

    let state = container
        .assembly_orchestrator()
        .assemble(project.request(SequencePolicy::NoOverlap), &ProgressTracker::new("test"))
        .await;

    assert!(!state.is_success());
    assert_eq!(state.stage, PipelineStage::Rendering);
    assert!(matches!(state.error, Some(DomainError::Render { .. })));
    assert!(project.published_files().is_empty());
}

#[tokio::test]
async fn test_cancellation_during_normalization() {
    let project = Project::new();
    let ffmpeg = Arc::new(FakeFfmpeg::default());
    let container = project.container(ffmpeg, Arc::new(StaticConfirmation(false)));

    let callback = Arc::new(CancelAfter::new(30.0));
    let tracker = ProgressTracker::new("test");
    tracker.add_callback(callback.clone());

    let state = container
        .assembly_orchestrator()
        .assemble(project.request(SequencePolicy::NoOverlap), &tracker)
        .await;

    assert!(matches!(state.error, Some(DomainError::Cancelled { .. })));
    assert_eq!(callback.cancelled_events.load(Ordering::SeqCst), 1);
    assert!(project.published_files().is_empty());
}

#[tokio::test]
async fn test_save_sequence_then_render_it() {
    let project = Project::new();
    let saved = project.dir.path().join("sequence.json");
    let ffmpeg = Arc::new(FakeFfmpeg::default());
    let container = project.container(ffmpeg, Arc::new(StaticConfirmation(false)));

    let state = container
        .assembly_orchestrator()
        .assemble(
            project
                .request(SequencePolicy::Standard { broll_density: 1.0 })
                .save_sequence_to(&saved),
            &ProgressTracker::new("test"),
        )
        .await;
    assert!(state.is_success(), "diagnostics: {:?}", state.diagnostics);

    let loaded = SequenceStore::default().load(&saved).unwrap();
    assert_eq!(Some(&loaded), state.sequence.as_ref());

    let state = container
        .assembly_orchestrator()
        .assemble(
            AssemblyRequest::from_sequence(loaded, project.output_dir()),
            &ProgressTracker::new("test"),
        )
        .await;
    assert!(state.is_success());
    assert_eq!(project.published_files().len(), 2);
}

// CLI tests

fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("reelsmith.toml");
    fs::write(
        &path,
        "[reelsmith]\nresolution = \"1080x1920\"\ncrossfade_duration = 0.25\n",
    )
    .unwrap();
    path
}

#[test]
fn test_cli_plan_prints_table() {
    let project = Project::new();
    let config = write_config(project.dir.path());
    let manifest = project.dir.path().join("project.yaml");
    fs::write(
        &manifest,
        "a_roll:\n  - id: segment_0\n    path: media/segment_0.mp4\n    duration: 4.0\n  - id: segment_1\n    path: media/segment_1.mp4\n    duration: 3.0\n  - id: segment_2\n    path: media/segment_2.mp4\n    duration: 5.0\nb_roll:\n  - id: broll_0\n    path: media/broll_0.png\n",
    )
    .unwrap();
    let out = project.dir.path().join("planned.json");

    Command::cargo_bin("reelsmith")
        .unwrap()
        .args(["--config"])
        .arg(&config)
        .args(["plan", "--policy", "no-overlap", "--manifest"])
        .arg(&manifest)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("BROLL_WITH_AROLL_AUDIO"))
        .stdout(predicate::str::contains("No duplicate audio."));

    let saved = SequenceStore::default().load(&out).unwrap();
    assert_eq!(saved.len(), 3);
    assert_eq!(saved.crossfade_duration, 0.25);
}

#[test]
fn test_cli_validate_reports_problems() {
    let project = Project::new();
    let config = write_config(project.dir.path());
    let a = &project.a_roll;
    let sequence = AssemblySequence::new(
        vec![
            TimelineEntry::aroll_full(0, &a[0]),
            TimelineEntry::aroll_full(1, &a[0]),
        ],
        Resolution::default(),
        0.3,
        a.clone(),
    );
    let path = project.dir.path().join("sequence.json");
    SequenceStore::default().save(&sequence, &path).unwrap();

    Command::cargo_bin("reelsmith")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .args(["validate", "--sequence"])
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Duplicate audio"));

    fs::remove_file(a[0].path()).unwrap();
    let clean = AssemblySequence::new(
        vec![TimelineEntry::aroll_full(0, &a[1])],
        Resolution::default(),
        0.3,
        a.clone(),
    );
    SequenceStore::default().save(&clean, &path).unwrap();

    Command::cargo_bin("reelsmith")
        .unwrap()
        .args(["validate", "--sequence"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Sequence is valid."));
}

#[test]
fn test_cli_config_shows_effective_values() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    Command::cargo_bin("reelsmith")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("1080x1920"))
        .stdout(predicate::str::contains("loaded from"));
}
