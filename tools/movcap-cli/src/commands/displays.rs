//! List capturable displays.

use movcap_platform_core::DisplayInfo;

pub fn run() -> anyhow::Result<()> {
    let displays = movcap_platform_macos::detect_displays()?;
    if displays.is_empty() {
        println!("No displays available");
        return Ok(());
    }

    println!("Available displays:");
    for line in display_lines(&displays) {
        println!("  {line}");
    }
    Ok(())
}

fn display_lines(displays: &[DisplayInfo]) -> Vec<String> {
    displays
        .iter()
        .enumerate()
        .map(|(idx, d)| {
            format!(
                "Display {idx}: {} at position ({}, {}){}",
                d.resolution(),
                d.x,
                d.y,
                if d.primary { " (main)" } else { "" }
            )
        })
        .collect()
}
