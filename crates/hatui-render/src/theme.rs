#![forbid(unsafe_code)]

//! Appearance lookup table.
//!
//! The engine only ever needs a handful of chrome colors: window
//! background and border, and the header row. A theme is a plain struct so
//! lookups are field reads; swapping themes is an engine-level invalidation
//! (every window repaints against the new colors).

use crate::color::Color;

/// Colors for the window and header chrome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    /// Window background behind keyed widget pixels.
    pub window_bg: Color,
    /// Border drawn around popup windows.
    pub window_border: Color,
    /// Header row background.
    pub header_bg: Color,
    /// Header title text color.
    pub header_fg: Color,
    /// Separator line under the header.
    pub header_line: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            window_bg: Color::WHITE,
            window_border: Color::BLACK,
            header_bg: Color::WHITE,
            header_fg: Color::BLACK,
            header_line: Color::BLACK,
        }
    }
}
