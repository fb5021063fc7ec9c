//! movcap platform core contracts.
//!
//! Display data structures shared by the capture engine and the CLI without
//! coupling to a concrete OS backend.

use movcap_common::error::{MovcapError, MovcapResult};
use serde::{Deserialize, Serialize};

/// Information about a connected display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayInfo {
    /// Platform display identifier.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Resolution in points (logical pixels).
    pub width: u32,
    pub height: u32,
    /// Position in the global desktop space.
    pub x: i32,
    pub y: i32,
    /// Backing scale factor (for example 1.0 or 2.0).
    pub scale_factor: f64,
    /// Whether this is the main display.
    pub primary: bool,
}

impl DisplayInfo {
    /// Physical width (logical * scale).
    pub fn pixel_width(&self) -> u32 {
        (self.width as f64 * self.scale_factor).round() as u32
    }

    /// Physical height (logical * scale).
    pub fn pixel_height(&self) -> u32 {
        (self.height as f64 * self.scale_factor).round() as u32
    }

    /// Short `WIDTHxHEIGHT` description.
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Pick the display at `index`.
///
/// Fails with `NoDisplay` when nothing is connected and `InvalidDisplay`
/// when the index is past the end of the list.
pub fn select_display(displays: &[DisplayInfo], index: usize) -> MovcapResult<&DisplayInfo> {
    if displays.is_empty() {
        return Err(MovcapError::NoDisplay);
    }
    displays.get(index).ok_or(MovcapError::InvalidDisplay {
        index,
        available: displays.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(id: u32, primary: bool) -> DisplayInfo {
        DisplayInfo {
            id,
            name: format!("display-{id}"),
            width: 1512,
            height: 982,
            x: 0,
            y: 0,
            scale_factor: 2.0,
            primary,
        }
    }

    #[test]
    fn select_on_empty_list_is_no_display() {
        assert!(matches!(select_display(&[], 0), Err(MovcapError::NoDisplay)));
    }

    #[test]
    fn select_out_of_range_reports_available_count() {
        let displays = vec![display(1, true), display(2, false)];
        match select_display(&displays, 2) {
            Err(MovcapError::InvalidDisplay { index, available }) => {
                assert_eq!(index, 2);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn pixel_size_applies_scale_factor() {
        let d = display(1, true);
        assert_eq!(d.pixel_width(), 3024);
        assert_eq!(d.pixel_height(), 1964);
        assert_eq!(d.resolution(), "1512x982");
    }
}
