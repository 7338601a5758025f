#![forbid(unsafe_code)]

//! hatui public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users. It
//! re-exports common types from the internal crates and offers a
//! lightweight prelude for day-to-day usage.
//!
//! A minimal program builds an [`EventLoop`] over a backend, registers a
//! window with at least one widget, shows it, and runs:
//!
//! ```ignore
//! use hatui::prelude::*;
//!
//! let backend = HeadlessBackend::new(ScreenMetrics::gray_160x128(), 10);
//! let mut ui = EventLoop::new(backend, Box::new(FixedFontProvider::standard()))?;
//! let mut win = ui.toolkit_mut().new_window();
//! win.add_widget(Box::new(MyMenu::new()));
//! let id = ui.toolkit_mut().add_window(win);
//! ui.toolkit_mut().show(id);
//! let status = ui.run()?;
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use hatui_core::event::{BUTTON_SLOTS, Button, EventResult, InputEvent};
pub use hatui_core::geometry::{Point, Rect};

// --- Render re-exports -----------------------------------------------------

pub use hatui_render::{Color, FixedFontProvider, FontError, FontId, FontProvider, Surface, Theme};

// --- Backend re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use hatui_backend::{Backend, HeadlessBackend, ScreenMetrics};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use hatui_runtime::{
    Command, DirtyFlags, DrawCtx, EventCtx, EventLoop, INPUT_END, InputState, Justify, MoveTarget,
    StackEntry, TimerId, TimerPool, Toolkit, Widget, WidgetCore, WidgetId, Window, WindowId,
    WindowStack,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for hatui apps.
#[derive(Debug)]
pub enum Error {
    /// I/O failure while presenting to the display backend.
    Io(std::io::Error),
    /// Font acquisition failure at initialization.
    Font(FontError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Font(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<FontError> for Error {
    fn from(err: FontError) -> Self {
        Self::Font(err)
    }
}

/// Standard result type for hatui APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    //! Commonly used types, importable in one line.

    pub use crate::{Button, Color, Error, EventResult, InputEvent, Rect, Result, Surface, Theme};

    #[cfg(feature = "runtime")]
    pub use crate::{
        Backend, DrawCtx, EventCtx, EventLoop, FixedFontProvider, FontProvider, HeadlessBackend,
        ScreenMetrics, Toolkit, Widget, WidgetCore, Window,
    };
}
