use std::path::Path;
use std::time::Duration;

use movcap_common::error::{MovcapError, MovcapResult};
use movcap_platform_core::DisplayInfo;
use movcap_platform_macos::{self as platform_macos, MicrophoneAccess, ScreenRecordingAccess};

use crate::backend::CaptureBackend;
use crate::config::CaptureConfiguration;
use crate::pipeline::{build_macos_movie_pipeline, CapturePipeline};

/// How long the microphone prompt may stay unanswered.
const MICROPHONE_PROMPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Backend built on CoreGraphics for displays and permissions, and
/// GStreamer's AVFoundation/VideoToolbox elements for the movie itself.
pub struct MacOSBackend;

impl MacOSBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MacOSBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MacOSBackend {
    fn detect_displays(&self) -> MovcapResult<Vec<DisplayInfo>> {
        platform_macos::detect_displays()
    }

    async fn ensure_permission(&self) -> MovcapResult<()> {
        screen_permission(platform_macos::request_screen_recording_access())?;

        let microphone = tokio::task::spawn_blocking(|| {
            platform_macos::request_microphone_access(MICROPHONE_PROMPT_TIMEOUT)
        })
        .await
        .map_err(|e| MovcapError::platform(format!("Microphone permission check failed: {e}")))?;
        microphone_permission(microphone)
    }

    fn build_pipeline(
        &self,
        display_index: usize,
        display: &DisplayInfo,
        config: &CaptureConfiguration,
        output_path: &Path,
    ) -> MovcapResult<Box<dyn CapturePipeline>> {
        let (display_id, source) = (display.id, display.resolution());
        tracing::info!(
            display_index,
            display_id = display_id,
            source = %source,
            target = %format!("{}x{}", config.width, config.height),
            "Configuring screen capture"
        );
        build_macos_movie_pipeline(display_index, config, output_path)
    }
}

fn screen_permission(access: ScreenRecordingAccess) -> MovcapResult<()> {
    match access {
        ScreenRecordingAccess::Granted => Ok(()),
        ScreenRecordingAccess::Denied => Err(MovcapError::permission_denied(
            "Screen recording is not allowed for this terminal. Enable it in \
             System Settings > Privacy & Security > Screen Recording and restart the app",
        )),
    }
}

/// A refused microphone records silence instead of failing the pipeline.
fn microphone_permission(access: MicrophoneAccess) -> MovcapResult<()> {
    match access {
        MicrophoneAccess::Granted => Ok(()),
        MicrophoneAccess::NotDetermined => Err(MovcapError::permission_denied(
            "Microphone access was not answered. Run again and allow the prompt",
        )),
        MicrophoneAccess::Denied | MicrophoneAccess::Restricted => {
            Err(MovcapError::permission_denied(
                "Microphone access is not allowed for this terminal. Enable it in \
                 System Settings > Privacy & Security > Microphone",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_refusal_is_permission_denied() {
        assert!(screen_permission(ScreenRecordingAccess::Granted).is_ok());
        let err = screen_permission(ScreenRecordingAccess::Denied).unwrap_err();
        assert!(matches!(err, MovcapError::PermissionDenied { .. }));
        assert!(err.to_string().contains("Screen Recording"));
    }

    #[test]
    fn microphone_refusal_is_permission_denied() {
        assert!(microphone_permission(MicrophoneAccess::Granted).is_ok());
        for access in [
            MicrophoneAccess::Denied,
            MicrophoneAccess::Restricted,
            MicrophoneAccess::NotDetermined,
        ] {
            let err = microphone_permission(access).unwrap_err();
            assert!(matches!(err, MovcapError::PermissionDenied { .. }), "{access:?}");
            assert!(err.to_string().contains("Microphone"), "{access:?}");
        }
    }
}
