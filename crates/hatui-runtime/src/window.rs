#![forbid(unsafe_code)]

//! Windows: ordered widget collections with focus, modal input, and a
//! backing surface.
//!
//! A window owns its widgets; insertion order is paint order. Focus is a
//! widget id that must reference a widget still in the collection or be
//! unset. The pending-input buffer is a fixed-capacity ring with explicit
//! backpressure: a full buffer rejects the push instead of overwriting
//! unread codes.

use crate::widget::{Widget, WidgetId};
use hatui_backend::ScreenMetrics;
use hatui_core::geometry::Rect;
use hatui_render::{Color, Surface};
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

static NEXT_WINDOW_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a window, valid across stack reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(u64);

impl WindowId {
    fn next() -> Self {
        WindowId(NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Capacity of the pending input-code ring buffer.
pub const INPUT_QUEUE_CAPACITY: usize = 32;

/// Sentinel code queued to the focus widget when a modal input session
/// ends.
pub const INPUT_END: u32 = 0xffff_fffe;

/// Fixed-capacity ring of pending input codes.
///
/// Head/tail indices wrap modulo capacity; `full` disambiguates the
/// head == tail case.
#[derive(Debug)]
pub(crate) struct InputQueue {
    buf: [u32; INPUT_QUEUE_CAPACITY],
    head: usize,
    tail: usize,
    full: bool,
}

impl InputQueue {
    pub(crate) fn new() -> Self {
        Self {
            buf: [0; INPUT_QUEUE_CAPACITY],
            head: 0,
            tail: 0,
            full: false,
        }
    }

    /// Push a code; `false` when the buffer is full (explicit
    /// backpressure, nothing is overwritten).
    pub(crate) fn push(&mut self, code: u32) -> bool {
        if self.full {
            return false;
        }
        self.buf[self.tail] = code;
        self.tail = (self.tail + 1) % INPUT_QUEUE_CAPACITY;
        self.full = self.tail == self.head;
        true
    }

    pub(crate) fn pop(&mut self) -> Option<u32> {
        if self.is_empty() {
            return None;
        }
        let code = self.buf[self.head];
        self.head = (self.head + 1) % INPUT_QUEUE_CAPACITY;
        self.full = false;
        Some(code)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head == self.tail && !self.full
    }

    pub(crate) fn len(&self) -> usize {
        if self.full {
            INPUT_QUEUE_CAPACITY
        } else {
            (self.tail + INPUT_QUEUE_CAPACITY - self.head) % INPUT_QUEUE_CAPACITY
        }
    }
}

/// A window: widgets, focus, modal input, pending input codes, and an
/// off-screen surface sized to the whole screen.
pub struct Window {
    id: WindowId,
    /// Window title, shown in the header while this window is on top.
    pub title: Cow<'static, str>,
    pub(crate) widgets: Vec<Box<dyn Widget>>,
    pub(crate) focus: Option<WidgetId>,
    pub(crate) input: Option<Box<dyn Widget>>,
    pub(crate) queue: InputQueue,
    pub(crate) show_header: bool,
    pub(crate) epoch: u64,
    pub(crate) dirty: bool,
    /// Screen-space rectangle this window composites into.
    pub rect: Rect,
    /// Per-window background override; the theme background when unset.
    pub background: Option<Color>,
    pub(crate) surface: Surface,
}

impl Window {
    /// A full-content-area window with a fresh keyed surface.
    pub fn new(metrics: &ScreenMetrics) -> Self {
        let mut surface = Surface::new(metrics.width, metrics.height);
        surface.clear(Color::KEY);
        Self {
            id: WindowId::next(),
            title: Cow::Borrowed("hatui"),
            widgets: Vec::new(),
            focus: None,
            input: None,
            queue: InputQueue::new(),
            show_header: true,
            epoch: 0,
            dirty: false,
            rect: Rect::new(
                metrics.content_x,
                metrics.content_y,
                metrics.content_w(),
                metrics.content_h(),
            ),
            background: None,
            surface,
        }
    }

    /// This window's stable identity.
    #[inline]
    pub fn id(&self) -> WindowId {
        self.id
    }

    /// Number of widgets in the collection.
    #[inline]
    pub fn widget_count(&self) -> usize {
        self.widgets.len()
    }

    /// The focused widget, if any.
    #[inline]
    pub fn focus(&self) -> Option<WidgetId> {
        self.focus
    }

    /// Whether a widget with this id is in the collection.
    pub fn contains(&self, id: WidgetId) -> bool {
        self.widgets.iter().any(|w| w.core().id() == id)
    }

    /// Whether a modal input session is active.
    #[inline]
    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    /// Whether the header row is shown above this window.
    #[inline]
    pub fn header_shown(&self) -> bool {
        self.show_header
    }

    /// Whether this window needs a full repaint.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the whole window for repaint.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Number of input codes waiting in the ring buffer.
    #[inline]
    pub fn queued_input(&self) -> usize {
        self.queue.len()
    }

    /// The off-screen surface this window draws into.
    #[inline]
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Append a widget. A focusable widget becomes the focus; widget and
    /// window are marked dirty. Returns the widget's id.
    pub fn add_widget(&mut self, mut widget: Box<dyn Widget>) -> WidgetId {
        let core = widget.core_mut();
        core.window = Some(self.id);
        core.dirty = true;
        let id = core.id();
        if core.focusable {
            self.focus = Some(id);
        }
        self.dirty = true;
        self.widgets.push(widget);
        id
    }

    /// Detach widgets by identity, possibly several in one pass.
    ///
    /// If the removed widget was the focus, focus is cleared first; the
    /// scan then promotes every focusable survivor it encounters, so the
    /// last focusable widget remaining in the collection ends up focused.
    /// Returns the detached widgets (empty when the id was not present).
    pub fn remove_widget(&mut self, id: WidgetId) -> Vec<Box<dyn Widget>> {
        if self.focus == Some(id) {
            self.focus = None;
        }
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.widgets.len());
        for mut w in self.widgets.drain(..) {
            if w.core().id() == id {
                w.core_mut().window = None;
                removed.push(w);
            } else {
                if w.core().focusable {
                    self.focus = Some(w.core().id());
                }
                kept.push(w);
            }
        }
        self.widgets = kept;
        self.dirty = true;
        removed
    }

    /// Queue a pending input code for the focus widget.
    ///
    /// Returns `false` and reports when the ring is full; the code is
    /// dropped at the producer, never overwritten over unread entries.
    pub fn queue_input(&mut self, code: u32) -> bool {
        let ok = self.queue.push(code);
        if !ok {
            warn!(window = ?self.id, code, "input queue full, code rejected");
        }
        ok
    }

    /// Install a modal input widget at the bottom-right input corner.
    ///
    /// Returns the input widget's height for caller layout.
    pub(crate) fn set_input(&mut self, mut widget: Box<dyn Widget>, metrics: &ScreenMetrics) -> i32 {
        let core = widget.core_mut();
        core.x = metrics.width - core.w - 1;
        core.y = metrics.height - core.h - 1;
        core.window = Some(self.id);
        let h = core.h;
        self.input = Some(widget);
        h
    }

    /// Remove and return the modal input widget.
    pub(crate) fn take_input(&mut self) -> Option<Box<dyn Widget>> {
        self.input.take()
    }

    /// Size of the modal input widget, if one is active.
    pub fn input_size(&self) -> Option<(i32, i32)> {
        self.input.as_ref().map(|w| (w.core().w, w.core().h))
    }

    /// Show the header row, shrinking the window to the content area.
    ///
    /// Returns `true` if the flag changed (callers force a full repaint).
    pub(crate) fn show_header(&mut self, metrics: &ScreenMetrics) -> bool {
        if self.show_header {
            return false;
        }
        self.show_header = true;
        if let Some(focus) = self.focus
            && let Some(w) = self.widget_mut(focus)
        {
            w.core_mut().h -= metrics.content_y;
            w.core_mut().dirty = true;
        }
        self.rect = Rect::new(
            metrics.content_x,
            metrics.content_y,
            metrics.content_w(),
            metrics.content_h(),
        );
        true
    }

    /// Hide the header row, growing the window to the full screen.
    pub(crate) fn hide_header(&mut self, metrics: &ScreenMetrics) -> bool {
        if !self.show_header {
            return false;
        }
        self.show_header = false;
        if let Some(focus) = self.focus
            && let Some(w) = self.widget_mut(focus)
        {
            w.core_mut().h += metrics.content_y;
            w.core_mut().dirty = true;
        }
        self.rect = Rect::new(0, 0, metrics.width, metrics.height);
        true
    }

    /// Shrink-wrap the window to its widgets' bounding box and center it
    /// in the content area (the popup helper's sizing half).
    pub fn fit_to_widgets(&mut self, metrics: &ScreenMetrics) {
        let mut bounds = Rect::default();
        for w in &self.widgets {
            bounds = bounds.union(&w.core().rect());
        }
        for w in &mut self.widgets {
            let core = w.core_mut();
            core.x -= bounds.x.min(0);
            core.y -= bounds.y.min(0);
        }
        let w = bounds.right().max(0) - bounds.x.min(0);
        let h = bounds.bottom().max(0) - bounds.y.min(0);
        self.rect = Rect::new(
            (metrics.content_w() - w) / 2 + metrics.content_x,
            (metrics.content_h() - h) / 2 + metrics.content_y,
            w,
            h,
        );
    }

    pub(crate) fn widget_mut(&mut self, id: WidgetId) -> Option<&mut Box<dyn Widget>> {
        self.widgets.iter_mut().find(|w| w.core().id() == id)
    }

    /// Look up a widget by id across the collection and the modal input
    /// slot. Dispatch resolves the captured target id through this, so a
    /// target removed mid-iteration simply stops receiving events.
    pub(crate) fn widget_by_id_mut(&mut self, id: WidgetId) -> Option<&mut Box<dyn Widget>> {
        if self.input.as_ref().is_some_and(|w| w.core().id() == id) {
            self.input.as_mut()
        } else {
            self.widget_mut(id)
        }
    }

    /// The widget that receives events: modal input if set, else focus.
    pub(crate) fn event_target_mut(&mut self) -> Option<&mut Box<dyn Widget>> {
        if self.input.is_some() {
            self.input.as_mut()
        } else {
            let id = self.focus?;
            self.widget_mut(id)
        }
    }

    /// Identity of the current event target.
    pub(crate) fn event_target_id(&self) -> Option<WidgetId> {
        if let Some(input) = &self.input {
            Some(input.core().id())
        } else {
            self.focus
        }
    }

    /// Run every widget's teardown hook and drop the collection.
    pub(crate) fn teardown(&mut self) {
        if let Some(mut input) = self.input.take() {
            input.destroy();
        }
        for w in &mut self.widgets {
            w.destroy();
        }
        self.widgets.clear();
        self.focus = None;
    }
}
