//! Record a capture session.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use movcap_capture_engine::{
    get_backend, CaptureSession, FrameInterval, SessionConfig, StopReason,
};
use movcap_common::config::AppConfig;

#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Maximum recording duration in seconds (default from config: 3600)
    #[arg(short = 't', long = "time", value_parser = clap::value_parser!(u64).range(1..))]
    pub time: Option<u64>,

    /// Display index to record. Use `movcap displays` to list them
    #[arg(short, long, default_value = "0")]
    pub display: usize,

    /// Output directory (default: ~/Movies)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Simulate an interrupt after N seconds
    #[arg(short, long, value_name = "SECONDS")]
    pub simulate_interrupt: Option<u64>,

    /// Target FPS
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub fps: Option<u32>,

    /// Output width
    #[arg(long, requires = "height", value_parser = clap::value_parser!(u32).range(1..))]
    pub width: Option<u32>,

    /// Output height
    #[arg(long, requires = "width", value_parser = clap::value_parser!(u32).range(1..))]
    pub height: Option<u32>,

    /// Leave the cursor out of the capture
    #[arg(long)]
    pub no_cursor: bool,
}

impl RecordArgs {
    fn session_config(&self, app: &AppConfig) -> SessionConfig {
        let mut config = SessionConfig::from_app_config(app);
        config.display_index = self.display;
        if let Some(ref dir) = self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(fps) = self.fps {
            config.capture.min_frame_interval = FrameInterval::from_fps(fps);
        }
        if let (Some(width), Some(height)) = (self.width, self.height) {
            config.capture.width = width;
            config.capture.height = height;
        }
        if self.no_cursor {
            config.capture.show_cursor = false;
        }
        config
    }
}

/// Exit status when a second Ctrl+C abandons finalization.
const FORCED_EXIT_CODE: i32 = 130;

#[derive(Debug, PartialEq, Eq)]
enum InterruptAction {
    Stop,
    ForceExit,
}

fn interrupt_action(presses: u32) -> InterruptAction {
    if presses <= 1 {
        InterruptAction::Stop
    } else {
        InterruptAction::ForceExit
    }
}

fn capturing_line(path: &Path) -> String {
    format!("Capturing to {}", path.display())
}

fn completion_line(reason: StopReason) -> String {
    format!("Capture saved successfully (stopped by: {reason})")
}

pub async fn run(args: RecordArgs, app: AppConfig) -> anyhow::Result<()> {
    let duration = Duration::from_secs(args.time.unwrap_or(app.capture.duration_secs));
    let config = args.session_config(&app);
    tracing::info!(
        duration_secs = duration.as_secs(),
        display = config.display_index,
        output_dir = %config.output_dir.display(),
        "Recording will stop after the time limit or Ctrl+C"
    );

    let session = CaptureSession::new(config, get_backend())
        .on_capturing(|path| println!("{}", capturing_line(path)));

    let handle = session.interrupt_handle();
    tokio::spawn(async move {
        let mut presses = 0;
        while tokio::signal::ctrl_c().await.is_ok() {
            presses += 1;
            match interrupt_action(presses) {
                InterruptAction::Stop => {
                    tracing::info!("Keyboard interrupt detected, stopping capture");
                    handle.interrupt();
                }
                InterruptAction::ForceExit => {
                    tracing::warn!("Second interrupt, exiting without finalizing the movie");
                    std::process::exit(FORCED_EXIT_CODE);
                }
            }
        }
    });

    if let Some(secs) = args.simulate_interrupt {
        let handle = session.interrupt_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            tracing::info!(after_secs = secs, "Simulated interrupt");
            handle.interrupt();
        });
    }

    let report = session.start(duration).await?;
    println!("{}", completion_line(report.stop_reason));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        record: RecordArgs,
    }

    fn parse(args: &[&str]) -> Result<RecordArgs, clap::Error> {
        let argv = std::iter::once("movcap").chain(args.iter().copied());
        Harness::try_parse_from(argv).map(|h| h.record)
    }

    #[test]
    fn stdout_lines() {
        assert_eq!(
            capturing_line(Path::new("/Users/me/Movies/Capture-2024-05-01-10-00-00.mov")),
            "Capturing to /Users/me/Movies/Capture-2024-05-01-10-00-00.mov"
        );
        assert_eq!(
            completion_line(StopReason::TimeLimit),
            "Capture saved successfully (stopped by: time limit reached)"
        );
        assert_eq!(
            completion_line(StopReason::Interrupted),
            "Capture saved successfully (stopped by: user interrupted)"
        );
    }

    #[test]
    fn second_interrupt_forces_exit() {
        assert_eq!(interrupt_action(1), InterruptAction::Stop);
        assert_eq!(interrupt_action(2), InterruptAction::ForceExit);
        assert_eq!(interrupt_action(3), InterruptAction::ForceExit);
    }

    #[test]
    fn zero_duration_is_rejected() {
        assert!(parse(&["-t", "0"]).is_err());
    }

    #[test]
    fn width_requires_height() {
        assert!(parse(&["--width", "1280"]).is_err());
    }

    #[test]
    fn flags_override_config() {
        let args = parse(&[
            "-t", "10", "-d", "1", "-o", "/tmp/caps", "--fps", "60", "--width", "1280",
            "--height", "720", "--no-cursor",
        ])
        .unwrap();
        let config = args.session_config(&AppConfig::default());

        assert_eq!(args.time, Some(10));
        assert_eq!(config.display_index, 1);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/caps"));
        assert_eq!(config.capture.min_frame_interval.framerate(), "60/1");
        assert_eq!((config.capture.width, config.capture.height), (1280, 720));
        assert!(!config.capture.show_cursor);
    }

    #[test]
    fn defaults_come_from_config() {
        let args = parse(&[]).unwrap();
        let mut app = AppConfig::default();
        app.output_dir = PathBuf::from("/tmp/from-config");
        let config = args.session_config(&app);

        assert_eq!(args.time, None);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/from-config"));
        assert_eq!(config.capture.min_frame_interval.framerate(), "30/1");
        assert!(config.capture.show_cursor);
    }
}
