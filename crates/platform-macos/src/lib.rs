//! macOS platform integration.
//!
//! Display enumeration goes through CoreGraphics; the list order matches the
//! order `avfvideosrc` uses for its screen `device-index`, so an index into
//! [`detect_displays`] can be handed straight to the capture pipeline.
//!
//! The audio track is read from the default input device, which macOS gates
//! behind the microphone permission (AVFoundation authorization) separately
//! from screen recording.

use std::time::Duration;

use movcap_common::error::MovcapResult;
use movcap_platform_core::DisplayInfo;

/// State of the screen recording (TCC) permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenRecordingAccess {
    Granted,
    Denied,
}

/// State of the microphone (AVFoundation audio) authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicrophoneAccess {
    NotDetermined,
    Restricted,
    Denied,
    Granted,
}

impl MicrophoneAccess {
    /// Map an `AVAuthorizationStatus` value.
    pub fn from_authorization_status(status: isize) -> Self {
        match status {
            0 => Self::NotDetermined,
            1 => Self::Restricted,
            3 => Self::Granted,
            _ => Self::Denied,
        }
    }
}

#[cfg(target_os = "macos")]
mod imp {
    use core_graphics::access::ScreenCaptureAccess;
    use core_graphics::display::CGDisplay;
    use movcap_common::error::{MovcapError, MovcapResult};
    use movcap_platform_core::DisplayInfo;

    use std::sync::mpsc;
    use std::time::Duration;

    use block::ConcreteBlock;
    use objc::runtime::{Object, BOOL, YES};
    use objc::{class, msg_send, sel, sel_impl};

    use super::{MicrophoneAccess, ScreenRecordingAccess};

    #[link(name = "AVFoundation", kind = "framework")]
    extern "C" {
        static AVMediaTypeAudio: *mut Object;
    }

    pub fn detect_displays() -> MovcapResult<Vec<DisplayInfo>> {
        let ids = CGDisplay::active_displays().map_err(|code| {
            MovcapError::platform(format!("CGGetActiveDisplayList failed (CGError {code})"))
        })?;

        let displays = ids
            .into_iter()
            .map(|id| {
                let display = CGDisplay::new(id);
                let bounds = display.bounds();
                let width = bounds.size.width.max(1.0);
                let scale_factor = display.pixels_wide() as f64 / width;
                DisplayInfo {
                    id,
                    name: format!("display-{id}"),
                    width: bounds.size.width as u32,
                    height: bounds.size.height as u32,
                    x: bounds.origin.x as i32,
                    y: bounds.origin.y as i32,
                    scale_factor,
                    primary: display.is_main(),
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(count = displays.len(), "Enumerated displays");
        Ok(displays)
    }

    pub fn screen_recording_access() -> ScreenRecordingAccess {
        if ScreenCaptureAccess::default().preflight() {
            ScreenRecordingAccess::Granted
        } else {
            ScreenRecordingAccess::Denied
        }
    }

    pub fn request_screen_recording_access() -> ScreenRecordingAccess {
        if ScreenCaptureAccess::default().request() {
            ScreenRecordingAccess::Granted
        } else {
            ScreenRecordingAccess::Denied
        }
    }

    pub fn microphone_access() -> MicrophoneAccess {
        let status: isize = unsafe {
            msg_send![class!(AVCaptureDevice), authorizationStatusForMediaType: AVMediaTypeAudio]
        };
        MicrophoneAccess::from_authorization_status(status)
    }

    pub fn request_microphone_access(timeout: Duration) -> MicrophoneAccess {
        let (tx, rx) = mpsc::channel();
        // The completion handler runs on an arbitrary dispatch queue.
        let handler = ConcreteBlock::new(move |granted: BOOL| {
            let _ = tx.send(granted == YES);
        })
        .copy();

        unsafe {
            let _: () = msg_send![
                class!(AVCaptureDevice),
                requestAccessForMediaType: AVMediaTypeAudio
                completionHandler: &*handler
            ];
        }

        match rx.recv_timeout(timeout) {
            Ok(true) => MicrophoneAccess::Granted,
            Ok(false) => MicrophoneAccess::Denied,
            Err(_) => {
                tracing::warn!(
                    timeout_secs = timeout.as_secs(),
                    "No answer to the microphone prompt"
                );
                MicrophoneAccess::NotDetermined
            }
        }
    }
}

#[cfg(not(target_os = "macos"))]
mod imp {
    use movcap_common::error::{MovcapError, MovcapResult};
    use movcap_platform_core::DisplayInfo;

    use std::time::Duration;

    use super::{MicrophoneAccess, ScreenRecordingAccess};

    pub fn detect_displays() -> MovcapResult<Vec<DisplayInfo>> {
        Err(MovcapError::unsupported(
            "Display enumeration requires macOS (CoreGraphics)",
        ))
    }

    pub fn screen_recording_access() -> ScreenRecordingAccess {
        ScreenRecordingAccess::Denied
    }

    pub fn request_screen_recording_access() -> ScreenRecordingAccess {
        ScreenRecordingAccess::Denied
    }

    pub fn microphone_access() -> MicrophoneAccess {
        MicrophoneAccess::Denied
    }

    pub fn request_microphone_access(_timeout: Duration) -> MicrophoneAccess {
        MicrophoneAccess::Denied
    }
}

/// Enumerate active displays, main display first.
pub fn detect_displays() -> MovcapResult<Vec<DisplayInfo>> {
    imp::detect_displays()
}

/// Check the screen recording permission without prompting.
pub fn screen_recording_access() -> ScreenRecordingAccess {
    imp::screen_recording_access()
}

/// Check the permission, showing the system prompt if it has not been decided.
///
/// macOS only applies a newly granted permission after the process restarts,
/// so a first-run grant still reports `Denied` here.
pub fn request_screen_recording_access() -> ScreenRecordingAccess {
    match imp::screen_recording_access() {
        ScreenRecordingAccess::Granted => ScreenRecordingAccess::Granted,
        ScreenRecordingAccess::Denied => {
            tracing::info!("Requesting screen recording permission");
            imp::request_screen_recording_access()
        }
    }
}

/// Check the microphone permission without prompting.
pub fn microphone_access() -> MicrophoneAccess {
    imp::microphone_access()
}

/// Check the microphone permission, prompting when it has not been decided.
/// Blocks until the user answers or `timeout` passes.
pub fn request_microphone_access(timeout: Duration) -> MicrophoneAccess {
    match imp::microphone_access() {
        MicrophoneAccess::NotDetermined => {
            tracing::info!("Requesting microphone permission");
            imp::request_microphone_access(timeout)
        }
        decided => decided,
    }
}
