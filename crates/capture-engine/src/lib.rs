//! movcap Capture Engine
//!
//! Records one display plus the default audio input into a QuickTime movie.
//!
//! # Architecture
//!
//! ```text
//! CaptureSession
//!   ├── waits on: duration timer | interrupt | pipeline health tick
//!   ├── CaptureBackend   displays, permission, pipeline factory
//!   └── CapturePipeline  screen ──┐
//!                        audio  ──┴── qtmux ── Capture-<timestamp>.mov
//! ```

pub mod backend;
pub mod config;
pub mod output;
pub mod pipeline;
pub mod session;

pub use backend::{get_backend, CaptureBackend};
pub use config::*;
pub use output::OutputTarget;
pub use pipeline::CapturePipeline;
pub use session::*;
