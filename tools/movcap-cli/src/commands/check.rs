//! Check displays and capture permissions.

use movcap_platform_macos::{
    microphone_access, screen_recording_access, MicrophoneAccess, ScreenRecordingAccess,
};

pub fn run() -> anyhow::Result<()> {
    println!("movcap System Check");
    println!("{}", "=".repeat(50));

    let displays_ok = match movcap_platform_macos::detect_displays() {
        Ok(displays) if !displays.is_empty() => {
            println!("[OK] Displays detected: {}", displays.len());
            for (idx, d) in displays.iter().enumerate() {
                println!(
                    "     {idx}: {} points, {}x{} pixels (scale: {}x) {}",
                    d.resolution(),
                    d.pixel_width(),
                    d.pixel_height(),
                    d.scale_factor,
                    if d.primary { "(main)" } else { "" }
                );
            }
            true
        }
        Ok(_) => {
            println!("[MISSING] No displays detected");
            false
        }
        Err(e) => {
            println!("[MISSING] Display detection failed: {e}");
            false
        }
    };

    let permission_ok = match screen_recording_access() {
        ScreenRecordingAccess::Granted => {
            println!("[OK] Screen recording permission granted");
            true
        }
        ScreenRecordingAccess::Denied => {
            println!("[MISSING] Screen recording permission not granted");
            println!(
                "    Fix: System Settings > Privacy & Security > Screen Recording, enable your terminal, then restart it"
            );
            false
        }
    };

    let microphone_ok = match microphone_access() {
        MicrophoneAccess::Granted => {
            println!("[OK] Microphone permission granted");
            true
        }
        MicrophoneAccess::NotDetermined => {
            println!("[MISSING] Microphone permission not requested yet");
            println!("    Fix: run `movcap record` once and allow the prompt");
            false
        }
        MicrophoneAccess::Denied | MicrophoneAccess::Restricted => {
            println!("[MISSING] Microphone permission not granted");
            println!(
                "    Fix: System Settings > Privacy & Security > Microphone, enable your terminal"
            );
            false
        }
    };

    println!();
    if displays_ok && permission_ok && microphone_ok {
        println!("All required capabilities are available. movcap is ready.");
    } else {
        println!("Some required capabilities are missing. See above for fixes.");
    }

    Ok(())
}
