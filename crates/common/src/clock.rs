//! Clock and timing utilities for a recording run.
//!
//! The recording clock is anchored at the moment capture starts and is used
//! to measure how long the session actually ran.

use std::time::Instant;

use chrono::{DateTime, Local};

/// A recording clock that provides monotonic timestamps relative to
/// a fixed epoch (the moment recording started).
#[derive(Debug, Clone)]
pub struct RecordingClock {
    /// The instant recording started.
    epoch: Instant,

    /// Wall-clock time at epoch.
    epoch_wall: DateTime<Local>,
}

impl RecordingClock {
    /// Create a new recording clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: Local::now(),
        }
    }

    /// Get seconds elapsed since recording start.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at recording start.
    pub fn epoch_wall(&self) -> DateTime<Local> {
        self.epoch_wall
    }

    /// Wall-clock time at recording start, RFC 3339 formatted.
    pub fn epoch_wall_rfc3339(&self) -> String {
        self.epoch_wall.to_rfc3339()
    }
}
