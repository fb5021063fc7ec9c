use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use movcap_capture_engine::{
    CaptureBackend, CaptureConfiguration, CapturePipeline, CaptureSession, OutputTarget,
    SessionConfig, SessionState, StopReason,
};
use movcap_common::error::{MovcapError, MovcapResult};
use movcap_platform_core::DisplayInfo;

#[derive(Clone, Copy, PartialEq)]
enum Fault {
    None,
    FailStart,
    FailWhileCapturing,
    NeverFinalize,
    SlowFinalize,
}

struct FakeBackend {
    displays: Vec<DisplayInfo>,
    permission: bool,
    microphone: bool,
    fault: Fault,
    pipelines_built: Arc<AtomicUsize>,
}

impl FakeBackend {
    fn new(displays: usize) -> Self {
        Self {
            displays: (0..displays).map(|i| display(i as u32, i == 0)).collect(),
            permission: true,
            microphone: true,
            fault: Fault::None,
            pipelines_built: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FakeBackend {
    fn detect_displays(&self) -> MovcapResult<Vec<DisplayInfo>> {
        Ok(self.displays.clone())
    }

    async fn ensure_permission(&self) -> MovcapResult<()> {
        if !self.permission {
            return Err(MovcapError::permission_denied("screen recording refused"));
        }
        if !self.microphone {
            return Err(MovcapError::permission_denied("microphone refused"));
        }
        Ok(())
    }

    fn build_pipeline(
        &self,
        _display_index: usize,
        _display: &DisplayInfo,
        _config: &CaptureConfiguration,
        output_path: &Path,
    ) -> MovcapResult<Box<dyn CapturePipeline>> {
        self.pipelines_built.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePipeline {
            path: output_path.to_path_buf(),
            fault: self.fault,
            running: false,
            health_checks: 0,
        }))
    }
}

struct FakePipeline {
    path: PathBuf,
    fault: Fault,
    running: bool,
    health_checks: usize,
}

impl CapturePipeline for FakePipeline {
    fn start(&mut self) -> MovcapResult<()> {
        // Like a file sink, the file appears as soon as the pipeline opens.
        std::fs::write(&self.path, b"")?;
        if self.fault == Fault::FailStart {
            return Err(MovcapError::session_start("configuration rejected"));
        }
        self.running = true;
        Ok(())
    }

    fn stop(&mut self, _timeout: Duration) -> MovcapResult<()> {
        self.running = false;
        match self.fault {
            Fault::NeverFinalize => return Err(MovcapError::write_failed("did not finalize")),
            Fault::SlowFinalize => std::thread::sleep(Duration::from_millis(300)),
            _ => {}
        }
        std::fs::write(&self.path, b"ftyp....moov")?;
        Ok(())
    }

    fn abort(&mut self) {
        self.running = false;
    }

    fn check_health(&mut self) -> MovcapResult<()> {
        self.health_checks += 1;
        if self.fault == Fault::FailWhileCapturing && self.health_checks > 1 {
            return Err(MovcapError::write_failed("encoder error"));
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

fn display(id: u32, primary: bool) -> DisplayInfo {
    DisplayInfo {
        id,
        name: format!("display-{id}"),
        width: 1920,
        height: 1080,
        x: (id as i32) * 1920,
        y: 0,
        scale_factor: 1.0,
        primary,
    }
}

fn session_config(dir: &Path) -> SessionConfig {
    SessionConfig {
        output_dir: dir.join("Movies"),
        health_interval: Duration::from_millis(20),
        stop_timeout: Duration::from_millis(200),
        ..SessionConfig::default()
    }
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn records_for_requested_duration() {
    let dir = tempfile::tempdir().unwrap();
    let config = session_config(dir.path());
    let output_dir = config.output_dir.clone();
    let announced = Arc::new(Mutex::new(Vec::new()));
    let session = CaptureSession::new(config, Box::new(FakeBackend::new(1))).on_capturing({
        let announced = announced.clone();
        move |path| announced.lock().unwrap().push(path.to_path_buf())
    });

    let report = session.start(Duration::from_millis(200)).await.unwrap();
    assert_eq!(*announced.lock().unwrap(), vec![report.path.clone()]);

    assert_eq!(session.state(), SessionState::Completed);
    assert_eq!(report.stop_reason, StopReason::TimeLimit);
    assert!(report.duration_secs >= 0.2, "{}", report.duration_secs);
    assert!(report.duration_secs < 1.5, "{}", report.duration_secs);
    assert!(report.display.primary);

    let files = files_in(&output_dir);
    assert_eq!(files, vec![report.path.clone()]);
    let name = report.path.file_name().unwrap().to_str().unwrap();
    assert!(OutputTarget::is_capture_file_name(name), "{name}");
    assert!(std::fs::metadata(&report.path).unwrap().len() > 0);
}

#[tokio::test]
async fn no_display_fails_without_creating_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = session_config(dir.path());
    let output_dir = config.output_dir.clone();
    let backend = FakeBackend::new(0);
    let built = backend.pipelines_built.clone();
    let session = CaptureSession::new(config, Box::new(backend));

    let err = session.start(Duration::from_secs(1)).await.unwrap_err();

    assert!(matches!(err, MovcapError::NoDisplay));
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(built.load(Ordering::SeqCst), 0);
    assert!(files_in(&output_dir).is_empty());
}

#[tokio::test]
async fn out_of_range_display_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig {
        display_index: 2,
        ..session_config(dir.path())
    };
    let session = CaptureSession::new(config, Box::new(FakeBackend::new(2)));

    let err = session.start(Duration::from_secs(1)).await.unwrap_err();
    assert!(matches!(
        err,
        MovcapError::InvalidDisplay {
            index: 2,
            available: 2
        }
    ));
}

#[tokio::test]
async fn permission_denied_fails_without_creating_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = session_config(dir.path());
    let output_dir = config.output_dir.clone();
    let mut backend = FakeBackend::new(1);
    backend.permission = false;
    let session = CaptureSession::new(config, Box::new(backend));

    let err = session.start(Duration::from_secs(1)).await.unwrap_err();

    assert!(matches!(err, MovcapError::PermissionDenied { .. }));
    assert_eq!(session.state(), SessionState::Failed);
    assert!(files_in(&output_dir).is_empty());
}

#[tokio::test]
async fn microphone_refusal_fails_without_creating_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = session_config(dir.path());
    let output_dir = config.output_dir.clone();
    let mut backend = FakeBackend::new(1);
    backend.microphone = false;
    let built = backend.pipelines_built.clone();
    let session = CaptureSession::new(config, Box::new(backend));

    let err = session.start(Duration::from_secs(1)).await.unwrap_err();

    assert!(matches!(err, MovcapError::PermissionDenied { .. }));
    assert!(err.to_string().contains("microphone"));
    assert_eq!(built.load(Ordering::SeqCst), 0);
    assert!(files_in(&output_dir).is_empty());
}

#[tokio::test]
async fn second_start_while_capturing_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let session = Arc::new(CaptureSession::new(
        session_config(dir.path()),
        Box::new(FakeBackend::new(1)),
    ));

    let running = {
        let session = session.clone();
        tokio::spawn(async move { session.start(Duration::from_millis(400)).await })
    };

    while session.state() != SessionState::Capturing {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let err = session.start(Duration::from_secs(1)).await.unwrap_err();
    assert!(matches!(err, MovcapError::SessionActive));
    assert_eq!(session.state(), SessionState::Capturing);

    let report = running.await.unwrap().unwrap();
    assert_eq!(report.stop_reason, StopReason::TimeLimit);
    assert_eq!(session.state(), SessionState::Completed);

    // Terminal sessions stay used up.
    assert!(matches!(
        session.start(Duration::from_secs(1)).await,
        Err(MovcapError::SessionActive)
    ));
}

#[tokio::test]
async fn interrupt_stops_early() {
    let dir = tempfile::tempdir().unwrap();
    let session = CaptureSession::new(session_config(dir.path()), Box::new(FakeBackend::new(1)));
    let handle = session.interrupt_handle();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.interrupt();
    });

    let report = session.start(Duration::from_secs(30)).await.unwrap();
    assert_eq!(report.stop_reason, StopReason::Interrupted);
    assert!(report.duration_secs < 5.0);
    assert!(report.path.exists());
}

#[tokio::test]
async fn pipeline_error_while_capturing_is_write_failed() {
    let dir = tempfile::tempdir().unwrap();
    let mut backend = FakeBackend::new(1);
    backend.fault = Fault::FailWhileCapturing;
    let session = CaptureSession::new(session_config(dir.path()), Box::new(backend));

    let err = session.start(Duration::from_secs(30)).await.unwrap_err();
    assert!(matches!(err, MovcapError::WriteFailed { .. }));
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test]
async fn finalize_timeout_is_write_failed() {
    let dir = tempfile::tempdir().unwrap();
    let mut backend = FakeBackend::new(1);
    backend.fault = Fault::NeverFinalize;
    let session = CaptureSession::new(session_config(dir.path()), Box::new(backend));

    let err = session.start(Duration::from_millis(50)).await.unwrap_err();
    assert!(matches!(err, MovcapError::WriteFailed { .. }));
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test]
async fn rejected_start_leaves_no_empty_movie() {
    let dir = tempfile::tempdir().unwrap();
    let config = session_config(dir.path());
    let output_dir = config.output_dir.clone();
    let mut backend = FakeBackend::new(1);
    backend.fault = Fault::FailStart;
    let session = CaptureSession::new(config, Box::new(backend));

    let err = session.start(Duration::from_secs(1)).await.unwrap_err();
    assert!(matches!(err, MovcapError::SessionStartFailed { .. }));
    assert!(files_in(&output_dir).is_empty());
}

#[tokio::test]
async fn zero_duration_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let session = CaptureSession::new(session_config(dir.path()), Box::new(FakeBackend::new(1)));

    let err = session.start(Duration::ZERO).await.unwrap_err();
    assert!(matches!(err, MovcapError::Config { .. }));
}

#[tokio::test]
async fn runtime_stays_responsive_while_finalizing() {
    let dir = tempfile::tempdir().unwrap();
    let mut backend = FakeBackend::new(1);
    backend.fault = Fault::SlowFinalize;
    let session = CaptureSession::new(session_config(dir.path()), Box::new(backend));

    let ticks = Arc::new(AtomicUsize::new(0));
    let ticker = {
        let ticks = ticks.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(10)).await;
                ticks.fetch_add(1, Ordering::SeqCst);
            }
        })
    };

    session.start(Duration::from_millis(20)).await.unwrap();
    ticker.abort();

    // Most ticks land during the 300ms finalize; a blocked runtime would
    // only see the handful from the capture window.
    assert!(ticks.load(Ordering::SeqCst) >= 10, "{}", ticks.load(Ordering::SeqCst));
}
