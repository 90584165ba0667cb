//! Display controller: the only stateful part of the application.
//!
//! Owns the current snapshot and benchmark results and serializes user
//! actions. The window itself sits behind the [`Display`] trait, so the
//! controller never touches the terminal.
//!
//! Slow actions are split in two: [`DisplayController::begin`] marks the action
//! in flight and hands back a [`Job`] that can run on a worker thread, and
//! [`DisplayController::finish`] applies its [`JobOutcome`]. The `on_*` methods
//! run both halves inline.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::benchmark_runner::{BenchmarkKind, BenchmarkResult, BenchmarkResults, BenchmarkSettings};
use crate::config::Config;
use crate::export::{self, ExportError, ExportFormat};
use crate::hardware::{Category, HardwareSource};
use crate::snapshot::{Snapshot, SnapshotAggregator};

/// Rendering sink for the controller.
pub trait Display {
    /// Replace whatever is on screen with `snapshot`.
    fn render(&mut self, snapshot: &Snapshot);

    /// Enable or disable the refresh/benchmark/export controls.
    fn set_controls_enabled(&mut self, enabled: bool);

    /// Show a transient message to the user.
    fn show_message(&mut self, notice: Notice);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Busy,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: title.into(),
            message: message.into(),
        }
    }

    fn busy(running: Action) -> Self {
        Self {
            kind: NoticeKind::Busy,
            title: "Busy".to_string(),
            message: format!("{running} is still running, try again when it finishes."),
        }
    }
}

/// Everything created once at startup and shared by the whole session.
#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub export_dir: PathBuf,
    pub benchmark: BenchmarkSettings,
    pub source: Arc<dyn HardwareSource>,
}

impl AppContext {
    pub fn new(config: Config, source: Arc<dyn HardwareSource>) -> Self {
        Self {
            export_dir: config.export_dir(),
            benchmark: config.benchmark_settings(),
            config,
            source,
        }
    }

    pub fn default_destination(&self, format: ExportFormat) -> PathBuf {
        export::default_destination(&self.export_dir, &self.config.export.file_stem, format)
    }
}

/// A user action the controller serializes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Open,
    Refresh,
    Benchmark(BenchmarkKind),
    Export(ExportFormat, PathBuf),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Open => f.write_str("Hardware detection"),
            Action::Refresh => f.write_str("Refresh"),
            Action::Benchmark(kind) => write!(f, "{kind} benchmark"),
            Action::Export(format, _) => write!(f, "{format} export"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("{0} is already running")]
    Busy(Action),

    #[error("no hardware snapshot has been taken yet")]
    NoSnapshot,

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("{action} did not complete: {reason}")]
    Aborted { action: Action, reason: String },
}

/// Work for a slow action; `Send` so it can run off the UI thread.
pub enum Job {
    Snapshot(SnapshotAggregator),
    Benchmark {
        kind: BenchmarkKind,
        settings: BenchmarkSettings,
        /// Set when there is no snapshot yet to merge the result into.
        aggregator: Option<SnapshotAggregator>,
    },
    Export {
        snapshot: Snapshot,
        format: ExportFormat,
        path: PathBuf,
    },
}

impl Job {
    pub fn run(self) -> JobOutcome {
        match self {
            Job::Snapshot(aggregator) => JobOutcome::Snapshot(aggregator.build_snapshot()),
            Job::Benchmark {
                kind,
                settings,
                aggregator,
            } => {
                let result = settings.run(kind);
                let snapshot = aggregator.map(|a| a.build_snapshot());
                JobOutcome::Benchmark {
                    kind,
                    result,
                    snapshot,
                }
            }
            Job::Export {
                snapshot,
                format,
                path,
            } => {
                let outcome = export::export(&snapshot, &path, format).map(|()| path);
                JobOutcome::Export(outcome)
            }
        }
    }
}

#[derive(Debug)]
pub enum JobOutcome {
    Snapshot(Snapshot),
    Benchmark {
        kind: BenchmarkKind,
        result: BenchmarkResult,
        snapshot: Option<Snapshot>,
    },
    Export(Result<PathBuf, ExportError>),
}

pub struct DisplayController<D: Display> {
    ctx: AppContext,
    aggregator: SnapshotAggregator,
    display: D,
    snapshot: Option<Snapshot>,
    benchmarks: BenchmarkResults,
    in_flight: Option<Action>,
}

impl<D: Display> DisplayController<D> {
    pub fn new(ctx: AppContext, display: D) -> Self {
        Self {
            aggregator: SnapshotAggregator::new(Arc::clone(&ctx.source)),
            ctx,
            display,
            snapshot: None,
            benchmarks: BenchmarkResults::default(),
            in_flight: None,
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn in_flight(&self) -> Option<&Action> {
        self.in_flight.as_ref()
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// Build the first snapshot and render it.
    pub fn on_open(&mut self) -> Result<(), ControllerError> {
        let job = self.begin(Action::Open)?;
        self.finish(job.run()).map(|_| ())
    }

    /// Rebuild the snapshot, keeping stored benchmark results.
    ///
    /// The TUI runs refreshes through [`begin`](Self::begin) on a worker thread.
    #[cfg(test)]
    pub fn on_refresh(&mut self) -> Result<(), ControllerError> {
        let job = self.begin(Action::Refresh)?;
        self.finish(job.run()).map(|_| ())
    }

    pub fn on_run_benchmark(&mut self, kind: BenchmarkKind) -> Result<BenchmarkResult, ControllerError> {
        let job = self.begin(Action::Benchmark(kind))?;
        self.finish(job.run())?;
        self.benchmarks
            .get(kind)
            .ok_or_else(|| ControllerError::Aborted {
                action: Action::Benchmark(kind),
                reason: "no result recorded".to_string(),
            })
    }

    /// Export the current snapshot; `None` writes to the default destination.
    pub fn on_export(
        &mut self,
        format: ExportFormat,
        path: Option<PathBuf>,
    ) -> Result<PathBuf, ControllerError> {
        let path = path.unwrap_or_else(|| self.ctx.default_destination(format));
        let job = self.begin(Action::Export(format, path))?;
        match self.finish(job.run())? {
            Some(path) => Ok(path),
            None => Err(ControllerError::NoSnapshot),
        }
    }

    /// Mark `action` in flight and return the work to perform.
    ///
    /// Rejected with a visible notice while another action is running.
    pub fn begin(&mut self, action: Action) -> Result<Job, ControllerError> {
        if let Some(running) = &self.in_flight {
            tracing::debug!(running = %running, rejected = %action, "Action rejected while busy");
            self.display.show_message(Notice::busy(running.clone()));
            return Err(ControllerError::Busy(running.clone()));
        }

        let job = match &action {
            Action::Open | Action::Refresh => Job::Snapshot(self.aggregator.clone()),
            Action::Benchmark(kind) => Job::Benchmark {
                kind: *kind,
                settings: self.ctx.benchmark,
                aggregator: self.snapshot.is_none().then(|| self.aggregator.clone()),
            },
            Action::Export(format, path) => {
                let Some(snapshot) = self.snapshot.clone() else {
                    self.display
                        .show_message(Notice::error("Export failed", "Nothing to export yet."));
                    return Err(ControllerError::NoSnapshot);
                };
                Job::Export {
                    snapshot,
                    format: *format,
                    path: path.clone(),
                }
            }
        };

        tracing::debug!(action = %action, "Action started");
        self.in_flight = Some(action);
        self.display.set_controls_enabled(false);
        Ok(job)
    }

    /// Apply a finished job and re-enable the controls.
    ///
    /// Returns the written path for exports.
    pub fn finish(&mut self, outcome: JobOutcome) -> Result<Option<PathBuf>, ControllerError> {
        let action = self.in_flight.take();
        self.display.set_controls_enabled(true);

        match outcome {
            JobOutcome::Snapshot(snapshot) => {
                self.replace_snapshot(snapshot);
                Ok(None)
            }
            JobOutcome::Benchmark {
                kind,
                result,
                snapshot,
            } => {
                self.benchmarks.record(kind, result);
                match snapshot.or_else(|| self.snapshot.take()) {
                    Some(base) => self.replace_snapshot(base),
                    None => {
                        return Err(self.abort_with(
                            Action::Benchmark(kind),
                            "no snapshot to merge the result into".to_string(),
                        ))
                    }
                }
                if result.is_zeroed() {
                    self.display.show_message(Notice::error(
                        "Benchmark failed",
                        format!("The {kind} benchmark could not run; see the log for details."),
                    ));
                } else {
                    self.display.show_message(Notice::info(
                        format!("{kind} benchmark"),
                        format!(
                            "{:.3} s, {:.0} {}",
                            result.elapsed_seconds,
                            result.metric,
                            kind.metric_unit()
                        ),
                    ));
                }
                Ok(None)
            }
            JobOutcome::Export(Ok(path)) => {
                self.display.show_message(Notice::info(
                    "Export complete",
                    format!("Report saved to {}", path.display()),
                ));
                Ok(Some(path))
            }
            JobOutcome::Export(Err(err)) => {
                tracing::warn!(
                    action = ?action,
                    path = ?err.path(),
                    error = %err,
                    "Export failed"
                );
                self.display
                    .show_message(Notice::error("Export failed", err.to_string()));
                Err(ControllerError::Export(err))
            }
        }
    }

    /// Give up on the in-flight action (e.g. its worker died).
    pub fn abort(&mut self, reason: impl Into<String>) -> ControllerError {
        let action = self.in_flight.take().unwrap_or(Action::Refresh);
        self.display.set_controls_enabled(true);
        self.abort_with(action, reason.into())
    }

    fn abort_with(&mut self, action: Action, reason: String) -> ControllerError {
        tracing::error!(action = %action, reason = %reason, "Action aborted");
        self.display
            .show_message(Notice::error(format!("{action} failed"), reason.clone()));
        ControllerError::Aborted { action, reason }
    }

    /// Install a new snapshot carrying the stored benchmark results.
    fn replace_snapshot(&mut self, snapshot: Snapshot) {
        let snapshot = snapshot.with_category(Category::Benchmark, self.benchmarks.to_fields());
        self.display.render(&snapshot);
        self.snapshot = Some(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{FakeSource, FieldValue};

    #[derive(Default)]
    struct RecordingDisplay {
        renders: Vec<Snapshot>,
        controls: Vec<bool>,
        notices: Vec<Notice>,
    }

    impl Display for RecordingDisplay {
        fn render(&mut self, snapshot: &Snapshot) {
            self.renders.push(snapshot.clone());
        }

        fn set_controls_enabled(&mut self, enabled: bool) {
            self.controls.push(enabled);
        }

        fn show_message(&mut self, notice: Notice) {
            self.notices.push(notice);
        }
    }

    fn controller(export_dir: PathBuf) -> DisplayController<RecordingDisplay> {
        let mut config = Config::default();
        config.export.directory = Some(export_dir);
        config.benchmark.cpu_iterations = 10_000;
        config.benchmark.memory_bytes = 64 * 1024;
        config.benchmark.disk_bytes = 64 * 1024;
        let ctx = AppContext::new(config, Arc::new(FakeSource));
        DisplayController::new(ctx, RecordingDisplay::default())
    }

    fn bench_value(snapshot: &Snapshot, field: &str) -> FieldValue {
        snapshot
            .get(Category::Benchmark)
            .and_then(|fields| fields.get(field))
            .cloned()
            .unwrap()
    }

    #[test]
    fn open_renders_a_complete_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller(dir.path().to_path_buf());

        controller.on_open().unwrap();

        let display = controller.display();
        assert_eq!(display.renders.len(), 1);
        assert_eq!(display.controls, vec![false, true]);
        let rendered = &display.renders[0];
        assert_eq!(rendered.iter().count(), Category::ALL.len());
        assert_eq!(
            rendered.get(Category::Cpu).unwrap().get("usage_percent"),
            Some(&FieldValue::Unavailable)
        );
        assert!(controller.in_flight().is_none());
    }

    #[test]
    fn benchmark_results_survive_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller(dir.path().to_path_buf());
        controller.on_open().unwrap();

        let result = controller.on_run_benchmark(BenchmarkKind::Cpu).unwrap();
        assert!(result.elapsed_seconds >= 0.0);
        let after_bench = controller.snapshot().unwrap().clone();
        assert!(bench_value(&after_bench, "cpu_elapsed_seconds").is_available());
        assert_eq!(
            bench_value(&after_bench, "memory_elapsed_seconds"),
            FieldValue::Unavailable
        );

        controller.on_refresh().unwrap();
        let refreshed = controller.snapshot().unwrap();
        assert_eq!(
            bench_value(refreshed, "cpu_elapsed_seconds"),
            bench_value(&after_bench, "cpu_elapsed_seconds")
        );
    }

    #[test]
    fn benchmark_before_open_builds_a_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller(dir.path().to_path_buf());

        controller.on_run_benchmark(BenchmarkKind::Memory).unwrap();

        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.iter().count(), Category::ALL.len());
        assert!(bench_value(snapshot, "memory_bytes_per_second").is_available());
    }

    #[test]
    fn second_action_while_busy_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller(dir.path().to_path_buf());
        controller.on_open().unwrap();
        let before = controller.snapshot().cloned();

        let job = controller.begin(Action::Refresh).unwrap();
        let err = controller.on_export(ExportFormat::Json, None).unwrap_err();
        assert!(matches!(err, ControllerError::Busy(Action::Refresh)));
        assert_eq!(
            controller.display().notices.last().map(|n| n.kind),
            Some(NoticeKind::Busy)
        );
        assert_eq!(controller.snapshot().cloned(), before);

        controller.finish(job.run()).unwrap();
        assert!(controller.in_flight().is_none());
        assert_eq!(controller.display().controls.last(), Some(&true));
    }

    #[test]
    fn failed_export_reports_error_and_keeps_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller(dir.path().to_path_buf());
        controller.on_open().unwrap();
        let before = controller.snapshot().cloned();
        let renders = controller.display().renders.len();

        let target = dir.path().join("no-such-dir").join("report.json");
        let err = controller
            .on_export(ExportFormat::Json, Some(target.clone()))
            .unwrap_err();

        match err {
            ControllerError::Export(export_err) => {
                assert_eq!(export_err.path(), Some(target.as_path()))
            }
            other => panic!("unexpected error {other:?}"),
        }
        let last = controller.display().notices.last().unwrap();
        assert_eq!(last.kind, NoticeKind::Error);
        assert_eq!(controller.snapshot().cloned(), before);
        assert_eq!(controller.display().renders.len(), renders);
        assert!(controller.in_flight().is_none());
    }

    #[test]
    fn export_writes_to_default_destination() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller(dir.path().to_path_buf());
        controller.on_open().unwrap();

        let path = controller.on_export(ExportFormat::Csv, None).unwrap();

        assert_eq!(path, dir.path().join("hardware_report.csv"));
        assert!(path.exists());
    }

    #[test]
    fn export_without_snapshot_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller(dir.path().to_path_buf());

        let err = controller.on_export(ExportFormat::Json, None).unwrap_err();
        assert!(matches!(err, ControllerError::NoSnapshot));
        assert!(controller.in_flight().is_none());
    }
}
