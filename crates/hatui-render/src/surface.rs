#![forbid(unsafe_code)]

//! Pixel surface storage.
//!
//! A [`Surface`] is a 2D grid of packed RGB565 pixels in row-major order:
//! `index = y * width + x`. Windows each own a surface sized to the whole
//! screen; the event loop composites them onto the screen surface with
//! keyed blits, so a surface cleared to [`Color::KEY`] contributes nothing.
//!
//! # Invariants
//!
//! 1. `pixels.len() == width * height`
//! 2. Width and height never change after creation
//! 3. All drawing clips to the surface bounds; out-of-range writes are
//!    dropped, never wrapped

use crate::color::Color;
use hatui_core::geometry::Rect;

/// A 2D grid of packed pixels.
#[derive(Debug, Clone)]
pub struct Surface {
    width: i32,
    height: i32,
    pixels: Vec<u16>,
}

impl Surface {
    /// Create a new surface filled with black.
    ///
    /// # Panics
    ///
    /// Panics if width or height is not positive.
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0, "surface width must be > 0");
        assert!(height > 0, "surface height must be > 0");
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    /// Surface width in pixels.
    #[inline]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Surface height in pixels.
    #[inline]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Bounding rect of the entire surface.
    #[inline]
    pub const fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x >= 0 && x < self.width && y >= 0 && y < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    /// Read the pixel at (x, y), or `None` out of bounds.
    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.index(x, y).map(|i| Color(self.pixels[i]))
    }

    /// Write the pixel at (x, y). Out-of-bounds writes are dropped.
    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color.0;
        }
    }

    /// Fill the whole surface with one color.
    pub fn clear(&mut self, color: Color) {
        self.pixels.fill(color.0);
    }

    /// Fill a rectangle, clipped to the surface.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let clipped = rect.intersection(&self.bounds());
        if clipped.is_empty() {
            return;
        }
        for y in clipped.y..clipped.bottom() {
            let row = y as usize * self.width as usize;
            let start = row + clipped.x as usize;
            let end = row + clipped.right() as usize;
            self.pixels[start..end].fill(color.0);
        }
    }

    /// Draw a horizontal line from x0 to x1 (exclusive) at row y.
    pub fn hline(&mut self, x0: i32, x1: i32, y: i32, color: Color) {
        self.fill_rect(Rect::new(x0, y, x1 - x0, 1), color);
    }

    /// Draw the outline of a rectangle.
    pub fn draw_rect(&mut self, rect: Rect, color: Color) {
        if rect.is_empty() {
            return;
        }
        self.fill_rect(Rect::new(rect.x, rect.y, rect.w, 1), color);
        self.fill_rect(Rect::new(rect.x, rect.bottom() - 1, rect.w, 1), color);
        self.fill_rect(Rect::new(rect.x, rect.y, 1, rect.h), color);
        self.fill_rect(Rect::new(rect.right() - 1, rect.y, 1, rect.h), color);
    }

    /// Blit the whole of `src` onto this surface at (dx, dy).
    ///
    /// Pixels equal to [`Color::KEY`] are skipped.
    pub fn blit(&mut self, src: &Surface, dx: i32, dy: i32) {
        self.blit_rect(src, src.bounds(), dx, dy);
    }

    /// Blit a sub-rectangle of `src` onto this surface at (dx, dy).
    ///
    /// The source rect is clipped to `src`, the destination to `self`.
    /// Pixels equal to [`Color::KEY`] are skipped.
    pub fn blit_rect(&mut self, src: &Surface, src_rect: Rect, dx: i32, dy: i32) {
        let sr = src_rect.intersection(&src.bounds());
        if sr.is_empty() {
            return;
        }
        for sy in sr.y..sr.bottom() {
            let ty = dy + (sy - sr.y);
            if ty < 0 || ty >= self.height {
                continue;
            }
            let src_row = sy as usize * src.width as usize;
            for sx in sr.x..sr.right() {
                let tx = dx + (sx - sr.x);
                if tx < 0 || tx >= self.width {
                    continue;
                }
                let p = src.pixels[src_row + sx as usize];
                if p == Color::KEY.0 {
                    continue;
                }
                self.pixels[ty as usize * self.width as usize + tx as usize] = p;
            }
        }
    }
}
