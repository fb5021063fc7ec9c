//! GStreamer pipeline construction for capture.
//!
//! On macOS the screen comes from `avfvideosrc` (AVFoundation screen input),
//! audio from `osxaudiosrc`, video is encoded with VideoToolbox, audio with
//! AAC, and both tracks are muxed into a QuickTime movie by `qtmux`.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use gst::prelude::*;
use gstreamer as gst;
use movcap_common::error::{MovcapError, MovcapResult};

use crate::config::CaptureConfiguration;

/// Trait for a media capture pipeline.
pub trait CapturePipeline: Send {
    /// Start the pipeline.
    fn start(&mut self) -> MovcapResult<()>;

    /// Stop gracefully and wait (at most `timeout`) for the output file to be
    /// finalized. On timeout the pipeline is torn down and an error returned.
    fn stop(&mut self, timeout: Duration) -> MovcapResult<()>;

    /// Tear down immediately without finalizing the output.
    fn abort(&mut self);

    /// Non-blocking check for errors raised while capturing.
    fn check_health(&mut self) -> MovcapResult<()>;

    /// Check if the pipeline is currently running.
    fn is_running(&self) -> bool;
}

pub struct GstCapturePipeline {
    name: String,
    pipeline: gst::Pipeline,
    running: Arc<AtomicBool>,
}

impl GstCapturePipeline {
    pub fn from_launch(name: impl Into<String>, launch: &str) -> MovcapResult<Self> {
        init_gstreamer()?;

        let element = gst::parse::launch(launch)
            .map_err(|e| MovcapError::session_start(format!("Failed to build pipeline: {e}")))?;

        let pipeline = element
            .dynamic_cast::<gst::Pipeline>()
            .map_err(|_| MovcapError::session_start("Launch string did not produce a pipeline"))?;

        Ok(Self {
            name: name.into(),
            pipeline,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Drain the bus until EOS, an error, or the deadline.
    fn wait_for_eos(&self, timeout: Duration) -> MovcapResult<()> {
        let Some(bus) = self.pipeline.bus() else {
            return Err(MovcapError::write_failed(format!(
                "{} pipeline has no bus",
                self.name
            )));
        };

        let start = Instant::now();
        loop {
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                break;
            }
            let remaining = gst::ClockTime::from_nseconds((timeout - elapsed).as_nanos() as u64);
            match bus.timed_pop(remaining) {
                Some(msg) => match msg.view() {
                    gst::MessageView::Eos(_) => {
                        tracing::debug!(pipeline = %self.name, "EOS received; movie finalized");
                        return Ok(());
                    }
                    gst::MessageView::Error(e) => {
                        return Err(MovcapError::write_failed(format!(
                            "{} pipeline error while finalizing: {}",
                            self.name,
                            e.error()
                        )));
                    }
                    _ => {}
                },
                None => break,
            }
        }

        Err(MovcapError::write_failed(format!(
            "{} pipeline did not finalize within {:.1}s",
            self.name,
            timeout.as_secs_f64()
        )))
    }

    fn set_null(&mut self) {
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            tracing::warn!(pipeline = %self.name, error = ?e, "Failed to reset pipeline");
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

impl CapturePipeline for GstCapturePipeline {
    fn start(&mut self) -> MovcapResult<()> {
        if let Err(e) = self.pipeline.set_state(gst::State::Playing) {
            // Elements that already opened their devices or files are in
            // READY or PAUSED and must be released.
            self.set_null();
            return Err(MovcapError::session_start(format!(
                "Failed to start {} pipeline: {e:?}",
                self.name
            )));
        }

        // Live sources reach Playing asynchronously.
        let wait_result = self.pipeline.state(gst::ClockTime::from_seconds(10));
        match wait_result {
            (Ok(_), gst::State::Playing, _) => {}
            (Ok(_), state, _) => {
                tracing::warn!(
                    pipeline = %self.name,
                    ?state,
                    "Pipeline did not reach Playing state within timeout"
                );
            }
            (Err(e), _, _) => {
                self.set_null();
                return Err(MovcapError::session_start(format!(
                    "{} pipeline failed to reach Playing state: {e:?}",
                    self.name
                )));
            }
        }

        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self, timeout: Duration) -> MovcapResult<()> {
        // qtmux only writes the moov atom after EOS has reached it.
        let result = if self.pipeline.send_event(gst::event::Eos::new()) {
            self.wait_for_eos(timeout)
        } else {
            Err(MovcapError::write_failed(format!(
                "Failed to send EOS to {} pipeline",
                self.name
            )))
        };

        if let Err(ref e) = result {
            tracing::warn!(pipeline = %self.name, error = %e, "Forcing pipeline teardown");
        }
        self.set_null();
        result
    }

    fn abort(&mut self) {
        self.set_null();
    }

    fn check_health(&mut self) -> MovcapResult<()> {
        let Some(bus) = self.pipeline.bus() else {
            return Ok(());
        };
        while let Some(msg) = bus.pop_filtered(&[gst::MessageType::Error, gst::MessageType::Eos]) {
            match msg.view() {
                gst::MessageView::Error(e) => {
                    return Err(MovcapError::write_failed(format!(
                        "{} pipeline error: {} ({})",
                        self.name,
                        e.error(),
                        e.debug().map(|d| d.to_string()).unwrap_or_default()
                    )));
                }
                gst::MessageView::Eos(_) => {
                    return Err(MovcapError::write_failed(format!(
                        "{} pipeline ended unexpectedly",
                        self.name
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for GstCapturePipeline {
    fn drop(&mut self) {
        if self.pipeline.current_state() != gst::State::Null {
            self.set_null();
        }
    }
}

/// Build the screen + audio pipeline writing a QuickTime movie.
///
/// `osxaudiosrc` records the default input device; system audio needs a
/// loopback device selected as that input.
pub fn build_macos_movie_pipeline(
    display_index: usize,
    config: &CaptureConfiguration,
    output_path: &Path,
) -> MovcapResult<Box<dyn CapturePipeline>> {
    config.validate()?;
    let launch = macos_movie_launch(display_index, config, output_path);
    tracing::debug!(%launch, "Building capture pipeline");
    Ok(Box::new(GstCapturePipeline::from_launch("movie", &launch)?))
}

fn macos_movie_launch(
    display_index: usize,
    config: &CaptureConfiguration,
    output_path: &Path,
) -> String {
    let path = escape_path(output_path);
    let cursor = config.show_cursor;
    let framerate = config.min_frame_interval.framerate();
    // One keyframe every 2 seconds.
    let keyint = config.min_frame_interval.fps_ceil().saturating_mul(2).max(2);
    let queue_depth = config.queue_depth.max(1);
    let CaptureConfiguration {
        width,
        height,
        audio_sample_rate: rate,
        audio_channel_count: channels,
        audio_bitrate: bitrate,
        ..
    } = *config;

    format!(
        "avfvideosrc capture-screen=true capture-screen-cursor={cursor} device-index={display_index} do-timestamp=true \
         ! queue max-size-buffers={queue_depth} leaky=downstream ! videoconvert ! videoscale ! videorate \
         ! video/x-raw,width={width},height={height},framerate={framerate} \
         ! vtenc_h264 realtime=true allow-frame-reordering=false max-keyframe-interval={keyint} \
         ! h264parse ! queue ! mux.video_0 \
         osxaudiosrc do-timestamp=true ! audioconvert ! audioresample \
         ! audio/x-raw,rate={rate},channels={channels} \
         ! avenc_aac bitrate={bitrate} ! aacparse ! queue ! mux.audio_0 \
         qtmux name=mux ! filesink location=\"{path}\""
    )
}

fn init_gstreamer() -> MovcapResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    let init_res = GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string()));
    match init_res {
        Ok(()) => Ok(()),
        Err(e) => Err(MovcapError::session_start(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}

fn escape_path(path: &Path) -> String {
    path.to_string_lossy().replace('"', "\\\"")
}
