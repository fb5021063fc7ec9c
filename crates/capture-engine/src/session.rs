//! Capture session orchestration.
//!
//! A session walks `Idle -> Starting -> Capturing -> Stopping -> Completed`,
//! dropping to `Failed` from any non-terminal state when a collaborator
//! rejects a call. Everything is awaited on the caller's runtime; the only
//! shared state is the session state and the interrupt notification.
//! Pipeline start and stop block on the media framework, so they run on the
//! blocking pool and the runtime keeps serving signals meanwhile.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use movcap_common::clock::RecordingClock;
use movcap_common::config::AppConfig;
use movcap_common::error::{MovcapError, MovcapResult};
use movcap_platform_core::{select_display, DisplayInfo};
use tokio::sync::Notify;

use crate::backend::CaptureBackend;
use crate::config::CaptureConfiguration;
use crate::output::OutputTarget;
use crate::pipeline::CapturePipeline;

/// Configuration for a capture session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Index into the backend's display list.
    pub display_index: usize,

    /// Directory the movie is written to.
    pub output_dir: PathBuf,

    /// Stream parameters.
    pub capture: CaptureConfiguration,

    /// Upper bound on the wait for the movie to be finalized after stop.
    pub stop_timeout: Duration,

    /// How often the pipeline is polled for errors while capturing.
    pub health_interval: Duration,
}

impl SessionConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            display_index: 0,
            output_dir: config.output_dir.clone(),
            capture: CaptureConfiguration::from_defaults(&config.capture),
            stop_timeout: Duration::from_secs(config.capture.stop_timeout_secs),
            health_interval: Duration::from_millis(250),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

/// State of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session created but not started.
    Idle,
    /// Displays, permission and pipeline are being set up.
    Starting,
    /// Recording in progress.
    Capturing,
    /// Stop requested, waiting for the movie to be finalized.
    Stopping,
    /// Movie written.
    Completed,
    /// An error occurred.
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Why a capture ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TimeLimit,
    Interrupted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimeLimit => f.write_str("time limit reached"),
            Self::Interrupted => f.write_str("user interrupted"),
        }
    }
}

/// Outcome of a successful capture.
#[derive(Debug, Clone)]
pub struct CaptureReport {
    pub path: PathBuf,
    pub stop_reason: StopReason,
    pub duration_secs: f64,
    pub display: DisplayInfo,
}

/// Requests an early, graceful stop of a running session.
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    notify: Arc<Notify>,
}

impl InterruptHandle {
    /// Ask the session to stop. Safe to call before capture has started;
    /// the request is kept until the session waits for it.
    pub fn interrupt(&self) {
        self.notify.notify_one();
    }
}

type CapturingNotice = Box<dyn Fn(&Path) + Send + Sync>;

/// A capture session that drives one backend pipeline from start to a
/// finalized movie file.
pub struct CaptureSession {
    config: SessionConfig,
    backend: Box<dyn CaptureBackend>,
    state: Arc<Mutex<SessionState>>,
    interrupt: Arc<Notify>,
    on_capturing: Option<CapturingNotice>,
}

impl CaptureSession {
    /// Create a new capture session with the given configuration.
    pub fn new(config: SessionConfig, backend: Box<dyn CaptureBackend>) -> Self {
        Self {
            config,
            backend,
            state: Arc::new(Mutex::new(SessionState::Idle)),
            interrupt: Arc::new(Notify::new()),
            on_capturing: None,
        }
    }

    /// Call `notice` with the output path once the pipeline is running.
    pub fn on_capturing(mut self, notice: impl Fn(&Path) + Send + Sync + 'static) -> Self {
        self.on_capturing = Some(Box::new(notice));
        self
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            notify: self.interrupt.clone(),
        }
    }

    /// Record for `duration`, or until interrupted, and finalize the movie.
    ///
    /// Only the first call on a session runs; any later call, including one
    /// made while the first is still capturing, fails with `SessionActive`.
    pub async fn start(&self, duration: Duration) -> MovcapResult<CaptureReport> {
        self.begin()?;

        match self.run(duration).await {
            Ok(report) => {
                self.set_state(SessionState::Completed);
                tracing::info!(
                    path = %report.path.display(),
                    duration_secs = report.duration_secs,
                    reason = %report.stop_reason,
                    "Capture completed"
                );
                Ok(report)
            }
            Err(e) => {
                self.set_state(SessionState::Failed);
                tracing::error!(error = %e, "Capture failed");
                Err(e)
            }
        }
    }

    async fn run(&self, duration: Duration) -> MovcapResult<CaptureReport> {
        if duration.is_zero() {
            return Err(MovcapError::config(
                "Recording duration must be greater than 0",
            ));
        }
        self.config.capture.validate()?;

        let displays = self.backend.detect_displays()?;
        let display = select_display(&displays, self.config.display_index)?.clone();
        let (resolution, primary) = (display.resolution(), display.primary);
        tracing::info!(
            index = self.config.display_index,
            resolution = %resolution,
            primary = primary,
            "Using display"
        );

        self.backend.ensure_permission().await?;

        let target = OutputTarget::create(&self.config.output_dir, chrono::Local::now())?;
        let pipeline = self.backend.build_pipeline(
            self.config.display_index,
            &display,
            &self.config.capture,
            &target.path,
        )?;

        let mut pipeline = match run_blocking(pipeline, |p| p.start()).await {
            Ok(pipeline) => pipeline,
            Err(e) => {
                remove_if_empty(&target);
                return Err(e);
            }
        };

        let clock = RecordingClock::start();
        tracing::info!(
            epoch_wall = %clock.epoch_wall_rfc3339(),
            duration_secs = duration.as_secs_f64(),
            "Capture started"
        );
        self.set_state(SessionState::Capturing);
        if let Some(notice) = &self.on_capturing {
            notice(&target.path);
        }

        let stop_reason = match self.wait_for_stop(pipeline.as_mut(), duration).await {
            Ok(reason) => reason,
            Err(e) => {
                pipeline.abort();
                return Err(e);
            }
        };

        tracing::info!(reason = %stop_reason, "Stopping capture");
        self.set_state(SessionState::Stopping);
        let stop_timeout = self.config.stop_timeout;
        run_blocking(pipeline, move |p| p.stop(stop_timeout)).await?;
        let duration_secs = clock.elapsed_secs();

        if !target.path.exists() {
            return Err(MovcapError::write_failed(format!(
                "{} was not written",
                target.path.display()
            )));
        }

        Ok(CaptureReport {
            path: target.path,
            stop_reason,
            duration_secs,
            display,
        })
    }

    async fn wait_for_stop(
        &self,
        pipeline: &mut dyn CapturePipeline,
        duration: Duration,
    ) -> MovcapResult<StopReason> {
        let deadline = tokio::time::sleep(duration);
        tokio::pin!(deadline);
        let mut health = tokio::time::interval(self.config.health_interval);

        loop {
            tokio::select! {
                _ = &mut deadline => return Ok(StopReason::TimeLimit),
                _ = self.interrupt.notified() => return Ok(StopReason::Interrupted),
                _ = health.tick() => pipeline.check_health()?,
            }
        }
    }

    fn begin(&self) -> MovcapResult<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != SessionState::Idle {
            tracing::warn!(state = ?*state, "Rejecting start on a used session");
            return Err(MovcapError::SessionActive);
        }
        *state = SessionState::Starting;
        Ok(())
    }

    fn set_state(&self, next: SessionState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        tracing::debug!(from = ?*state, to = ?next, "Session state change");
        *state = next;
    }
}

/// Run a blocking pipeline call on the blocking pool. The pipeline is handed
/// back on success and dropped (torn down) on failure.
async fn run_blocking<F>(
    mut pipeline: Box<dyn CapturePipeline>,
    op: F,
) -> MovcapResult<Box<dyn CapturePipeline>>
where
    F: FnOnce(&mut dyn CapturePipeline) -> MovcapResult<()> + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(pipeline.as_mut()).map(|()| pipeline))
        .await
        .map_err(|e| MovcapError::platform(format!("Pipeline task failed: {e}")))?
}

/// A pipeline that failed to start can leave a zero-byte movie behind.
fn remove_if_empty(target: &OutputTarget) {
    let empty = std::fs::metadata(&target.path)
        .map(|m| m.len() == 0)
        .unwrap_or(false);
    if empty {
        if let Err(e) = std::fs::remove_file(&target.path) {
            tracing::warn!(path = %target.path.display(), error = %e, "Failed to remove empty output");
        }
    }
}
