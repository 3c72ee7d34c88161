//! Progress tracking and callback system for UI integration

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Progress callback trait for UI integration
pub trait ProgressCallback: Send + Sync {
    /// Called when an assembly starts
    fn on_start(&self, operation: &str);

    /// Called with the overall percentage and a short stage label
    fn on_progress(&self, percent: f64, stage: &str);

    /// Called when the assembly completes successfully
    fn on_complete(&self, message: Option<String>);

    /// Called when the assembly fails
    fn on_error(&self, error: &str);

    /// Called when the assembly is cancelled
    fn on_cancel(&self);

    /// Check if the assembly should be cancelled
    fn should_cancel(&self) -> bool;
}

/// Pipeline phases as reported to callbacks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    Initializing,
    Planning,
    Validating,
    CheckingSources,
    Normalizing,
    Rendering,
    Publishing,
    Complete,
    Failed,
    Cancelled,
}

/// Snapshot of the tracker state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressInfo {
    pub phase: ProgressPhase,
    /// Overall percentage (0.0 - 100.0), never decreasing
    pub percent: f64,
    /// Last stage label
    pub message: String,
    /// Time elapsed since start
    pub elapsed: Duration,
}

/// Progress tracker with thread-safe updates
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<Mutex<ProgressTrackerInner>>,
    callbacks: Arc<Mutex<Vec<Arc<dyn ProgressCallback>>>>,
}

struct ProgressTrackerInner {
    info: ProgressInfo,
    start_time: Instant,
    cancelled: bool,
}

impl ProgressTracker {
    pub fn new(operation: &str) -> Self {
        let inner = ProgressTrackerInner {
            info: ProgressInfo {
                phase: ProgressPhase::Initializing,
                percent: 0.0,
                message: operation.to_string(),
                elapsed: Duration::from_secs(0),
            },
            start_time: Instant::now(),
            cancelled: false,
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
            callbacks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn add_callback(&self, callback: Arc<dyn ProgressCallback>) {
        if let Ok(mut callbacks) = self.callbacks.lock() {
            callbacks.push(callback);
        }
    }

    pub fn start(&self, operation: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.info.phase = ProgressPhase::Initializing;
            inner.info.percent = 0.0;
            inner.info.message = operation.to_string();
            inner.start_time = Instant::now();
        }

        self.notify_callbacks(|cb| cb.on_start(operation));
    }

    /// Report progress. The percentage is clamped to `[0, 100]` and never moves backwards.
    pub fn report(&self, phase: ProgressPhase, percent: f64, stage: impl Into<String>) {
        let stage = stage.into();
        let reported = match self.inner.lock() {
            Ok(mut inner) => {
                let clamped = if percent.is_finite() {
                    percent.clamp(0.0, 100.0)
                } else {
                    inner.info.percent
                };
                inner.info.percent = inner.info.percent.max(clamped);
                inner.info.phase = phase;
                inner.info.message = stage.clone();
                inner.info.elapsed = inner.start_time.elapsed();
                inner.info.percent
            }
            Err(_) => return,
        };

        self.notify_callbacks(|cb| cb.on_progress(reported, &stage));
    }

    pub fn complete(&self, message: Option<String>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.info.phase = ProgressPhase::Complete;
            inner.info.percent = 100.0;
            inner.info.elapsed = inner.start_time.elapsed();
            if let Some(ref msg) = message {
                inner.info.message = msg.clone();
            }
        }

        self.notify_callbacks(|cb| cb.on_complete(message.clone()));
    }

    pub fn error(&self, error: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.info.phase = ProgressPhase::Failed;
            inner.info.message = error.to_string();
        }

        self.notify_callbacks(|cb| cb.on_error(error));
    }

    pub fn cancel(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.cancelled = true;
            inner.info.phase = ProgressPhase::Cancelled;
            inner.info.message = "Assembly cancelled".to_string();
        }

        self.notify_callbacks(|cb| cb.on_cancel());
    }

    /// Whether the tracker or any callback asked for cancellation
    pub fn is_cancelled(&self) -> bool {
        if let Ok(inner) = self.inner.lock() {
            if inner.cancelled {
                return true;
            }
        }

        if let Ok(callbacks) = self.callbacks.lock() {
            return callbacks.iter().any(|callback| callback.should_cancel());
        }

        false
    }

    pub fn get_info(&self) -> Option<ProgressInfo> {
        self.inner.lock().ok().map(|inner| inner.info.clone())
    }

    fn notify_callbacks<F>(&self, f: F)
    where
        F: Fn(&dyn ProgressCallback),
    {
        if let Ok(callbacks) = self.callbacks.lock() {
            for callback in callbacks.iter() {
                f(callback.as_ref());
            }
        }
    }
}

/// Console progress callback for CLI usage; writes to stderr
pub struct ConsoleProgressCallback {
    verbose: bool,
    cancel_flag: Arc<AtomicBool>,
}

impl ConsoleProgressCallback {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a flag set by a signal handler
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = flag;
        self
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_start(&self, operation: &str) {
        if self.verbose {
            eprintln!("Starting: {}", operation);
        }
    }

    fn on_progress(&self, percent: f64, stage: &str) {
        let bar_length = 24;
        let filled = ((percent / 100.0) * bar_length as f64) as usize;
        let bar = "#".repeat(filled.min(bar_length)) + &"-".repeat(bar_length - filled.min(bar_length));
        eprintln!("[{}] {:>5.1}% {}", bar, percent, stage);
    }

    fn on_complete(&self, message: Option<String>) {
        match message {
            Some(msg) => eprintln!("Completed: {}", msg),
            None => eprintln!("Assembly completed successfully"),
        }
    }

    fn on_error(&self, error: &str) {
        eprintln!("Error: {}", error);
    }

    fn on_cancel(&self) {
        eprintln!("Assembly cancelled");
    }

    fn should_cancel(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }
}

/// JSON lines progress callback for machine consumers
pub struct JsonProgressCallback {
    cancel_flag: Arc<AtomicBool>,
}

impl JsonProgressCallback {
    pub fn new(cancel_flag: Arc<AtomicBool>) -> Self {
        Self { cancel_flag }
    }
}

impl ProgressCallback for JsonProgressCallback {
    fn on_start(&self, operation: &str) {
        let event = serde_json::json!({
            "event": "start",
            "operation": operation,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_progress(&self, percent: f64, stage: &str) {
        let event = serde_json::json!({
            "event": "progress",
            "percent": percent,
            "stage": stage,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_complete(&self, message: Option<String>) {
        let event = serde_json::json!({
            "event": "complete",
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_error(&self, error: &str) {
        let event = serde_json::json!({
            "event": "error",
            "error": error,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_cancel(&self) {
        let event = serde_json::json!({
            "event": "cancel",
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn should_cancel(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }
}

/// No-op progress callback for when progress tracking is disabled
pub struct NoOpProgressCallback;

impl ProgressCallback for NoOpProgressCallback {
    fn on_start(&self, _operation: &str) {}
    fn on_progress(&self, _percent: f64, _stage: &str) {}
    fn on_complete(&self, _message: Option<String>) {}
    fn on_error(&self, _error: &str) {}
    fn on_cancel(&self) {}
    fn should_cancel(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    struct TestCallback {
        started: AtomicBool,
        progress_calls: AtomicU64,
        percents: Mutex<Vec<f64>>,
        completed: AtomicBool,
        error_called: AtomicBool,
        cancelled: AtomicBool,
        should_cancel_flag: AtomicBool,
    }

    impl TestCallback {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                started: AtomicBool::new(false),
                progress_calls: AtomicU64::new(0),
                percents: Mutex::new(Vec::new()),
                completed: AtomicBool::new(false),
                error_called: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
                should_cancel_flag: AtomicBool::new(false),
            })
        }

        fn set_should_cancel(&self, cancel: bool) {
            self.should_cancel_flag.store(cancel, Ordering::Relaxed);
        }
    }

    impl ProgressCallback for TestCallback {
        fn on_start(&self, _operation: &str) {
            self.started.store(true, Ordering::Relaxed);
        }

        fn on_progress(&self, percent: f64, _stage: &str) {
            self.progress_calls.fetch_add(1, Ordering::Relaxed);
            self.percents.lock().unwrap().push(percent);
        }

        fn on_complete(&self, _message: Option<String>) {
            self.completed.store(true, Ordering::Relaxed);
        }

        fn on_error(&self, _error: &str) {
            self.error_called.store(true, Ordering::Relaxed);
        }

        fn on_cancel(&self) {
            self.cancelled.store(true, Ordering::Relaxed);
        }

        fn should_cancel(&self) -> bool {
            self.should_cancel_flag.load(Ordering::Relaxed)
        }
    }

    #[test]
    fn test_progress_tracker_basic_workflow() {
        let tracker = ProgressTracker::new("assembly");
        let callback = TestCallback::new();
        tracker.add_callback(callback.clone());

        tracker.start("assembly");
        assert!(callback.started.load(Ordering::Relaxed));

        tracker.report(ProgressPhase::Planning, 10.0, "planning complete");
        tracker.report(ProgressPhase::Normalizing, 45.0, "normalized 2/4");
        assert_eq!(callback.progress_calls.load(Ordering::Relaxed), 2);

        tracker.complete(Some("done".to_string()));
        assert!(callback.completed.load(Ordering::Relaxed));

        let info = tracker.get_info().unwrap();
        assert_eq!(info.phase, ProgressPhase::Complete);
        assert_eq!(info.percent, 100.0);
    }

    #[test]
    fn test_progress_is_clamped_and_monotonic() {
        let tracker = ProgressTracker::new("assembly");
        let callback = TestCallback::new();
        tracker.add_callback(callback.clone());

        tracker.report(ProgressPhase::Normalizing, 50.0, "a");
        tracker.report(ProgressPhase::Normalizing, 30.0, "b");
        tracker.report(ProgressPhase::Rendering, 150.0, "c");
        tracker.report(ProgressPhase::Rendering, f64::NAN, "d");

        let percents = callback.percents.lock().unwrap().clone();
        assert_eq!(percents, vec![50.0, 50.0, 100.0, 100.0]);
    }

    #[test]
    fn test_progress_tracker_cancellation() {
        let tracker = ProgressTracker::new("assembly");
        let callback = TestCallback::new();
        tracker.add_callback(callback.clone());

        tracker.start("assembly");
        assert!(!tracker.is_cancelled());

        callback.set_should_cancel(true);
        assert!(tracker.is_cancelled());

        tracker.cancel();
        assert!(callback.cancelled.load(Ordering::Relaxed));
        assert_eq!(tracker.get_info().unwrap().phase, ProgressPhase::Cancelled);
    }

    #[test]
    fn test_shared_cancel_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let tracker = ProgressTracker::new("assembly");
        tracker.add_callback(Arc::new(
            ConsoleProgressCallback::new(false).with_cancel_flag(flag.clone()),
        ));

        assert!(!tracker.is_cancelled());
        flag.store(true, Ordering::Relaxed);
        assert!(tracker.is_cancelled());
    }

    #[test]
    fn test_progress_tracker_error_handling() {
        let tracker = ProgressTracker::new("assembly");
        let callback = TestCallback::new();
        tracker.add_callback(callback.clone());

        tracker.start("assembly");
        tracker.error("something went wrong");

        assert!(callback.error_called.load(Ordering::Relaxed));
        assert_eq!(tracker.get_info().unwrap().phase, ProgressPhase::Failed);
    }
}
