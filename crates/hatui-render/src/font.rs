#![forbid(unsafe_code)]

//! The font contract the engine consumes.
//!
//! Font shaping and rasterization live outside the engine; the engine only
//! asks a [`FontProvider`] for a handle by logical name and size, measures
//! text, and draws it. Handles are reference-counted by the provider:
//! `acquire` increments, `release` decrements and may unload at zero.
//!
//! Lookup never fails while the provider knows at least one font: a missing
//! name or size falls back to the best match by name, then by size
//! distance. An empty provider is the one fatal case — a UI with no
//! renderable glyphs cannot proceed, and the toolkit refuses to initialize.

use crate::color::Color;
use crate::surface::Surface;
use std::fmt;

/// Handle to an acquired font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontId(pub u32);

/// Errors from font acquisition.
#[derive(Debug)]
pub enum FontError {
    /// The provider has no fonts at all.
    Empty,
    /// A handle was used after release or never issued.
    StaleHandle(FontId),
}

impl fmt::Display for FontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "no fonts registered"),
            Self::StaleHandle(id) => write!(f, "stale font handle {id:?}"),
        }
    }
}

impl std::error::Error for FontError {}

/// Provider of measured, drawable fonts.
pub trait FontProvider {
    /// Acquire a font by logical name and requested pixel size.
    ///
    /// Falls back to the closest registered font when the exact name/size
    /// pair is missing. Fails only when the provider is empty.
    fn acquire(&mut self, name: &str, size: i32) -> Result<FontId, FontError>;

    /// Release a handle from `acquire`.
    ///
    /// Releasing an unknown handle is a reported no-op.
    fn release(&mut self, id: FontId);

    /// Width of `text` in pixels when drawn with `id`.
    fn text_width(&self, id: FontId, text: &str) -> i32;

    /// Line height of `id` in pixels.
    fn text_height(&self, id: FontId) -> i32;

    /// Draw `text` at (x, y) in `color`.
    fn draw_text(&self, id: FontId, srf: &mut Surface, x: i32, y: i32, color: Color, text: &str);
}

/// A fixed-cell font provider for headless targets and tests.
///
/// Every glyph is a `size/2 x size` block; drawing fills the inked part of
/// each cell. Good enough to exercise header layout and measurement paths
/// without a rasterizer.
#[derive(Debug)]
pub struct FixedFontProvider {
    fonts: Vec<FixedFont>,
}

#[derive(Debug)]
struct FixedFont {
    name: String,
    size: i32,
    refs: u32,
}

impl FixedFontProvider {
    /// A provider with no fonts. Acquire fails until one is registered.
    pub fn new() -> Self {
        Self { fonts: Vec::new() }
    }

    /// A provider preloaded with the two logical fonts the engine asks for.
    pub fn standard() -> Self {
        let mut p = Self::new();
        p.register("menu", 11);
        p.register("text", 9);
        p
    }

    /// Register a logical font.
    pub fn register(&mut self, name: &str, size: i32) {
        self.fonts.push(FixedFont {
            name: name.to_owned(),
            size,
            refs: 0,
        });
    }

    /// Live reference count for a handle, if it is valid.
    pub fn refs(&self, id: FontId) -> Option<u32> {
        self.fonts.get(id.0 as usize).map(|f| f.refs)
    }

    fn cell(&self, id: FontId) -> (i32, i32) {
        let size = self
            .fonts
            .get(id.0 as usize)
            .map(|f| f.size)
            .unwrap_or(8)
            .max(2);
        ((size / 2).max(1), size)
    }
}

impl Default for FixedFontProvider {
    fn default() -> Self {
        Self::standard()
    }
}

impl FontProvider for FixedFontProvider {
    fn acquire(&mut self, name: &str, size: i32) -> Result<FontId, FontError> {
        if self.fonts.is_empty() {
            return Err(FontError::Empty);
        }
        // Exact name with closest size wins; otherwise closest size of any
        // name.
        let mut best: Option<(usize, i64)> = None;
        for pass in 0..2 {
            for (i, f) in self.fonts.iter().enumerate() {
                if pass == 0 && f.name != name {
                    continue;
                }
                let dist = (f.size as i64 - size as i64).abs();
                if best.is_none_or(|(_, d)| dist < d) {
                    best = Some((i, dist));
                }
            }
            if best.is_some() {
                break;
            }
        }
        let (i, _) = best.expect("non-empty provider always has a best match");
        self.fonts[i].refs += 1;
        Ok(FontId(i as u32))
    }

    fn release(&mut self, id: FontId) {
        match self.fonts.get_mut(id.0 as usize) {
            Some(f) if f.refs > 0 => f.refs -= 1,
            _ => {
                #[cfg(feature = "tracing")]
                tracing::warn!(?id, "release of unknown font handle");
            }
        }
    }

    fn text_width(&self, id: FontId, text: &str) -> i32 {
        let (cw, _) = self.cell(id);
        cw * text.chars().count() as i32
    }

    fn text_height(&self, id: FontId) -> i32 {
        self.cell(id).1
    }

    fn draw_text(&self, id: FontId, srf: &mut Surface, x: i32, y: i32, color: Color, text: &str) {
        let (cw, ch) = self.cell(id);
        let mut cx = x;
        for c in text.chars() {
            if !c.is_whitespace() {
                srf.fill_rect(
                    hatui_core::geometry::Rect::new(cx, y + 1, (cw - 1).max(1), (ch - 2).max(1)),
                    color,
                );
            }
            cx += cw;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_provider_is_fatal() {
        let mut p = FixedFontProvider::new();
        assert!(matches!(p.acquire("menu", 11), Err(FontError::Empty)));
    }

    #[test]
    fn exact_name_beats_other_names() {
        let mut p = FixedFontProvider::new();
        p.register("menu", 11);
        p.register("text", 11);
        let id = p.acquire("text", 11).unwrap();
        assert_eq!(id, FontId(1));
    }

    #[test]
    fn missing_name_falls_back_by_size_distance() {
        let mut p = FixedFontProvider::new();
        p.register("menu", 8);
        p.register("text", 16);
        let id = p.acquire("chicago", 15).unwrap();
        assert_eq!(id, FontId(1));
    }

    #[test]
    fn refcount_tracks_acquire_release() {
        let mut p = FixedFontProvider::new();
        p.register("menu", 11);
        let id = p.acquire("menu", 11).unwrap();
        let id2 = p.acquire("menu", 11).unwrap();
        assert_eq!(id, id2);
        assert_eq!(p.refs(id), Some(2));
        p.release(id);
        assert_eq!(p.refs(id), Some(1));
        p.release(id);
        assert_eq!(p.refs(id), Some(0));
        // Releasing past zero is a reported no-op.
        p.release(id);
        assert_eq!(p.refs(id), Some(0));
    }

    #[test]
    fn measurement_scales_with_text_length() {
        let p = FixedFontProvider::standard();
        let id = FontId(0);
        assert_eq!(p.text_width(id, "abcd"), 4 * p.text_width(id, "a"));
        assert!(p.text_height(id) > 0);
    }
}
