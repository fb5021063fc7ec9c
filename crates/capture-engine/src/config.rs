//! Capture configuration handed to the media pipeline.

use movcap_common::config::CaptureDefaults;
use movcap_common::error::{MovcapError, MovcapResult};

/// Minimum time between two video frames, as a rational number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInterval {
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameInterval {
    /// Interval for a target frame rate (`1/fps` seconds).
    pub fn from_fps(fps: u32) -> Self {
        Self {
            numerator: 1,
            denominator: fps,
        }
    }

    /// The matching GStreamer `framerate` fraction, e.g. `30/1`.
    pub fn framerate(&self) -> String {
        format!("{}/{}", self.denominator, self.numerator)
    }

    /// Frames per second, rounded up so keyframe spacing never hits zero.
    pub fn fps_ceil(&self) -> u32 {
        self.denominator.div_ceil(self.numerator.max(1))
    }
}

/// Stream parameters for a single capture. Immutable once capture starts.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfiguration {
    pub width: u32,
    pub height: u32,
    pub min_frame_interval: FrameInterval,
    pub audio_sample_rate: u32,
    pub audio_channel_count: u32,
    pub audio_bitrate: u32,
    /// Frames buffered between the screen source and the encoder.
    pub queue_depth: u32,
    pub show_cursor: bool,
}

impl CaptureConfiguration {
    pub fn from_defaults(defaults: &CaptureDefaults) -> Self {
        Self {
            width: defaults.width,
            height: defaults.height,
            min_frame_interval: FrameInterval::from_fps(defaults.fps),
            audio_sample_rate: defaults.audio_sample_rate,
            audio_channel_count: defaults.audio_channels,
            audio_bitrate: defaults.audio_bitrate,
            queue_depth: defaults.queue_depth,
            show_cursor: defaults.show_cursor,
        }
    }

    pub fn validate(&self) -> MovcapResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MovcapError::config(format!(
                "Invalid capture size {}x{}",
                self.width, self.height
            )));
        }
        if self.min_frame_interval.numerator == 0 || self.min_frame_interval.denominator == 0 {
            return Err(MovcapError::config("Frame interval must be non-zero"));
        }
        if self.audio_sample_rate == 0 || self.audio_channel_count == 0 || self.audio_bitrate == 0
        {
            return Err(MovcapError::config(
                "Audio sample rate, channel count and bitrate must be non-zero",
            ));
        }
        Ok(())
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self::from_defaults(&CaptureDefaults::default())
    }
}
