use std::path::Path;

use movcap_common::error::MovcapResult;
use movcap_platform_core::DisplayInfo;

use crate::config::CaptureConfiguration;
use crate::pipeline::CapturePipeline;

/// Abstract interface for platform-specific capture capabilities.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Enumerate displays that can be captured, in capture-index order.
    fn detect_displays(&self) -> MovcapResult<Vec<DisplayInfo>>;

    /// Make sure screen recording and audio input are allowed, prompting the
    /// user if the platform supports it. Fails with `PermissionDenied` when
    /// either is refused.
    async fn ensure_permission(&self) -> MovcapResult<()>;

    /// Build the capture pipeline for one display, writing to `output_path`.
    fn build_pipeline(
        &self,
        display_index: usize,
        display: &DisplayInfo,
        config: &CaptureConfiguration,
        output_path: &Path,
    ) -> MovcapResult<Box<dyn CapturePipeline>>;
}

pub mod macos;

pub use macos::MacOSBackend;

/// Get the platform backend.
///
/// Off macOS the backend still builds, but display detection reports the
/// platform as unsupported.
pub fn get_backend() -> Box<dyn CaptureBackend> {
    Box::new(MacOSBackend::new())
}
