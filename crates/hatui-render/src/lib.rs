#![forbid(unsafe_code)]

//! Software rendering for hatui.
//!
//! Everything here works on plain pixel buffers: a [`Surface`] is a
//! row-major grid of packed RGB565 pixels, windows draw into their own
//! surface, and the event loop composites window surfaces onto the screen
//! surface before handing it to the backend's present call. No GPU, no
//! retained scene graph; redraw is immediate-mode over whole widget
//! rectangles, keyed on dirty flags.

pub mod color;
pub mod font;
pub mod surface;
pub mod theme;

pub use color::Color;
pub use font::{FixedFontProvider, FontError, FontId, FontProvider};
pub use surface::Surface;
pub use theme::Theme;
