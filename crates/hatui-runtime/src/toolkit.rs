#![forbid(unsafe_code)]

//! The toolkit context object.
//!
//! Every piece of engine state lives here: the window arena and stack,
//! header widgets, the timer pool, button tracking, the dirty bits, the
//! global invalidation epoch, appearance and fonts, and the embedding
//! application's hooks. The event loop mutates it from exactly one
//! thread; there are no locks because there is exactly one mutator.
//!
//! Windows are owned by an arena keyed by [`WindowId`]; stack entries
//! reference them by id. Hiding a window removes its stack entries but
//! keeps it alive for a later show; closing tears it down and drops it.

use crate::input_state::InputState;
use crate::stack::{MoveTarget, WindowStack};
use crate::timer::{TimerId, TimerPool};
use crate::widget::{Command, DrawCtx, Widget, WidgetId};
use crate::window::{INPUT_END, Window, WindowId};
use bitflags::bitflags;
use hatui_backend::ScreenMetrics;
use hatui_core::event::{Button, EventResult, InputEvent};
use hatui_core::geometry::Rect;
use hatui_render::{Color, FontError, FontId, FontProvider, Surface, Theme};
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::warn;

bitflags! {
    /// Process-wide "needs redraw" bits, at their different granularities.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DirtyFlags: u8 {
        /// The header row needs repainting.
        const HEADER = 1 << 0;
        /// The active window needs recompositing onto the screen.
        const WINDOW_AREA = 1 << 1;
        /// The modal-input region needs recompositing.
        const INPUT = 1 << 2;
        /// The screen surface needs presenting to the display.
        const SCREEN = 1 << 3;
        /// Everything: forces a full repaint of all visible regions.
        const FILTHY = Self::HEADER.bits() | Self::WINDOW_AREA.bits() | Self::INPUT.bits();
    }
}

/// Header title justification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Justify {
    /// Anchor the title's left edge at the text position.
    Left,
    /// Center the title on the text position.
    #[default]
    Center,
    /// Anchor the title's right edge at the text position.
    Right,
}

/// First-refusal handler offered every decoded event; returning `true`
/// vetoes local dispatch.
pub type GlobalHandler = Box<dyn FnMut(InputEvent, u64) -> bool>;

/// Last-resort handler offered events nothing consumed.
pub type UnusedHandler = Box<dyn FnMut(InputEvent, u64) -> EventResult>;

/// Feedback-click callback.
pub type Clicker = Box<dyn FnMut()>;

/// A sliding window transition recorded for the loop to play.
pub(crate) struct PendingTransition {
    /// Snapshot of the surface sliding out.
    pub(crate) outgoing: Surface,
    /// The window sliding in (looked up live at play time).
    pub(crate) incoming: WindowId,
    /// Mirrored direction (hide reveals the window beneath).
    pub(crate) reverse: bool,
}

/// All engine state, as one explicit context object.
pub struct Toolkit {
    pub(crate) metrics: ScreenMetrics,
    pub(crate) windows: HashMap<WindowId, Window>,
    pub(crate) stack: WindowStack,
    pub(crate) header_widgets: Vec<Box<dyn Widget>>,
    pub(crate) timers: TimerPool,
    pub(crate) input: InputState,
    pub(crate) dirty: DirtyFlags,
    pub(crate) epoch: u64,
    pub(crate) theme: Theme,
    pub(crate) fonts: Box<dyn FontProvider>,
    pub(crate) header_font: FontId,
    pub(crate) global_handler: Option<GlobalHandler>,
    pub(crate) unused_handler: Option<UnusedHandler>,
    pub(crate) clicker: Option<Clicker>,
    pub(crate) scroll_num: i32,
    pub(crate) scroll_denom: i32,
    pub(crate) transition_frames: i32,
    pub(crate) header_justify: Justify,
    pub(crate) header_text_pos: Option<i32>,
    pub(crate) started: bool,
    pub(crate) pending_transition: Option<PendingTransition>,
    pub(crate) last_tick: u64,
}

impl Toolkit {
    /// Build the context for a display described by `metrics`.
    ///
    /// Fails only when the font provider has no fonts at all — a UI with
    /// no renderable glyphs cannot proceed.
    pub fn new(
        metrics: ScreenMetrics,
        mut fonts: Box<dyn FontProvider>,
    ) -> Result<Self, FontError> {
        let header_font = fonts.acquire("menu", metrics.content_y - 8)?;
        Ok(Self {
            metrics,
            windows: HashMap::new(),
            stack: WindowStack::new(),
            header_widgets: Vec::new(),
            timers: TimerPool::new(),
            input: InputState::new(),
            dirty: DirtyFlags::empty(),
            epoch: 0,
            theme: Theme::default(),
            fonts,
            header_font,
            global_handler: None,
            unused_handler: None,
            clicker: None,
            scroll_num: 1,
            scroll_denom: 1,
            transition_frames: 16,
            header_justify: Justify::default(),
            header_text_pos: None,
            started: false,
            pending_transition: None,
            last_tick: 0,
        })
    }

    /// The display metrics this context was built for.
    #[inline]
    pub fn metrics(&self) -> ScreenMetrics {
        self.metrics
    }

    /// The window stack.
    #[inline]
    pub fn stack(&self) -> &WindowStack {
        &self.stack
    }

    /// The current dirty bits.
    #[inline]
    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    /// The global invalidation epoch.
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The button/scroll state machine.
    #[inline]
    pub fn input_state(&self) -> &InputState {
        &self.input
    }

    /// The timer pool.
    #[inline]
    pub fn timers(&self) -> &TimerPool {
        &self.timers
    }

    /// The active appearance table.
    #[inline]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Replace the appearance table and invalidate every window.
    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.invalidate_all();
    }

    /// Bump the global epoch; every window force-repaints when it next
    /// reaches the top.
    pub fn invalidate_all(&mut self) {
        self.epoch += 1;
    }

    /// The font provider.
    pub fn fonts_mut(&mut self) -> &mut dyn FontProvider {
        self.fonts.as_mut()
    }

    // --- Windows ----------------------------------------------------------

    /// A fresh window inheriting the active window's title.
    pub fn new_window(&mut self) -> Window {
        let mut win = Window::new(&self.metrics);
        win.epoch = self.epoch;
        if let Some(top) = self.stack.top()
            && let Some(top_win) = self.windows.get(&top)
        {
            win.title = Cow::Owned(top_win.title.clone().into_owned());
        }
        win
    }

    /// Register a window with the arena. It is not shown yet.
    pub fn add_window(&mut self, mut win: Window) -> WindowId {
        let id = win.id();
        win.epoch = self.epoch;
        self.windows.insert(id, win);
        id
    }

    /// A registered window by id.
    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id)
    }

    /// A registered window by id, mutable.
    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.get_mut(&id)
    }

    /// Show a window: reorder to top if already on-screen, push otherwise.
    ///
    /// When the loop is running and the new window matches the previous
    /// top's full-content-area geometry, a sliding transition is recorded
    /// for the loop to play before the next redraw.
    pub fn show(&mut self, id: WindowId) {
        if !self.windows.contains_key(&id) {
            warn!(?id, "show of unknown window");
            return;
        }
        if !self.stack.contains(id) {
            let old_top = self.stack.top();
            self.stack.push_top(id);
            if self.started
                && let Some(old_id) = old_top
                && let (Some(old), Some(new)) = (self.windows.get(&old_id), self.windows.get(&id))
                && Self::transition_geometry(&old.rect, &new.rect, &self.metrics)
            {
                self.pending_transition = Some(PendingTransition {
                    outgoing: old.surface.clone(),
                    incoming: id,
                    reverse: false,
                });
            }
        } else {
            self.stack.move_to(id, MoveTarget::Absolute(0));
        }
        self.dirty |= DirtyFlags::WINDOW_AREA | DirtyFlags::HEADER;
        if let Some(top) = self.stack.top()
            && self.windows.get(&top).is_some_and(Window::has_input)
        {
            self.dirty |= DirtyFlags::INPUT;
        }
    }

    /// Hide a window: remove *all* stack entries referencing it.
    ///
    /// Returns the count removed; 0 means it was not on the stack and
    /// nothing changed. Revealing a geometry-matching window plays the
    /// mirrored sliding transition.
    pub fn hide(&mut self, id: WindowId) -> usize {
        let count = self.stack.remove_all(id);
        if count == 0 {
            return 0;
        }
        self.dirty |= DirtyFlags::WINDOW_AREA | DirtyFlags::HEADER;
        let reveal = self
            .stack
            .top()
            .filter(|_| self.started)
            .filter(|top_id| {
                match (self.windows.get(&id), self.windows.get(top_id)) {
                    (Some(hidden), Some(new_top)) => {
                        Self::transition_geometry(&new_top.rect, &hidden.rect, &self.metrics)
                    }
                    _ => false,
                }
            });
        if let Some(top_id) = reveal {
            self.redraw_window_surface(id);
            if let Some(hidden) = self.windows.get(&id) {
                self.pending_transition = Some(PendingTransition {
                    outgoing: hidden.surface.clone(),
                    incoming: top_id,
                    reverse: true,
                });
            }
        }
        count
    }

    /// Hide a window, tear down its widgets, and drop it.
    pub fn close(&mut self, id: WindowId) {
        if self.stack.contains(id) {
            self.hide(id);
        }
        match self.windows.remove(&id) {
            Some(mut win) => win.teardown(),
            None => warn!(?id, "close of unknown window"),
        }
    }

    /// Relocate a window's stack entry, preserving its minimized flag.
    pub fn move_window(&mut self, id: WindowId, target: MoveTarget) -> bool {
        let moved = self.stack.move_to(id, target);
        if moved {
            self.dirty |= DirtyFlags::FILTHY;
        }
        moved
    }

    /// Flag a window's stack entry as minimized; the loop demotes it to
    /// the back when it reaches the top.
    pub fn minimize(&mut self, id: WindowId) -> bool {
        self.stack.set_minimized(id, true)
    }

    /// Auto-size a registered window to its widgets and show it centered.
    pub fn popup(&mut self, id: WindowId) {
        let metrics = self.metrics;
        if let Some(win) = self.windows.get_mut(&id) {
            win.fit_to_widgets(&metrics);
        }
        self.show(id);
    }

    /// Register and pop up a window in one step.
    pub fn add_popup(&mut self, win: Window) -> WindowId {
        let id = self.add_window(win);
        self.popup(id);
        id
    }

    /// Retitle a window, repainting the header if it is on top.
    pub fn set_title(&mut self, id: WindowId, title: impl Into<Cow<'static, str>>) {
        if let Some(win) = self.windows.get_mut(&id) {
            win.title = title.into();
            if self.stack.top() == Some(id) {
                self.dirty |= DirtyFlags::HEADER;
            }
        }
    }

    /// Show the header row above a window.
    pub fn show_header(&mut self, id: WindowId) {
        let metrics = self.metrics;
        if let Some(win) = self.windows.get_mut(&id)
            && win.show_header(&metrics)
        {
            self.dirty |= DirtyFlags::FILTHY;
        }
    }

    /// Hide the header row, letting the window cover the full screen.
    pub fn hide_header(&mut self, id: WindowId) {
        let metrics = self.metrics;
        if let Some(win) = self.windows.get_mut(&id)
            && win.hide_header(&metrics)
        {
            self.dirty |= DirtyFlags::FILTHY;
        }
    }

    // --- Header widgets ---------------------------------------------------

    /// Add a detached widget to the header row.
    pub fn add_header_widget(&mut self, mut widget: Box<dyn Widget>) -> WidgetId {
        widget.core_mut().window = None;
        let id = widget.core().id();
        self.header_widgets.push(widget);
        id
    }

    /// Remove a header widget by id.
    pub fn remove_header_widget(&mut self, id: WidgetId) -> Option<Box<dyn Widget>> {
        let pos = self
            .header_widgets
            .iter()
            .position(|w| w.core().id() == id)?;
        Some(self.header_widgets.remove(pos))
    }

    // --- Modal input ------------------------------------------------------

    /// Start a modal input session on the top window.
    ///
    /// The widget lands in the bottom-right input corner; returns its
    /// height for caller layout, or `None` with no window on the stack.
    pub fn start_input(&mut self, widget: Box<dyn Widget>) -> Option<i32> {
        let Some(top) = self.stack.top() else {
            warn!("input session with no window on the stack");
            return None;
        };
        self.start_input_for(top, widget)
    }

    /// Start a modal input session on a specific window.
    pub fn start_input_for(&mut self, id: WindowId, widget: Box<dyn Widget>) -> Option<i32> {
        let metrics = self.metrics;
        let win = self.windows.get_mut(&id)?;
        let h = win.set_input(widget, &metrics);
        self.dirty |= DirtyFlags::WINDOW_AREA | DirtyFlags::INPUT;
        Some(h)
    }

    /// End the top window's modal input session.
    ///
    /// Queues the [`INPUT_END`] sentinel for the focus widget, then
    /// destroys the input widget.
    pub fn end_input(&mut self) {
        let Some(top) = self.stack.top() else { return };
        let Some(win) = self.windows.get_mut(&top) else {
            return;
        };
        if win.has_input() {
            win.queue_input(INPUT_END);
            if let Some(mut input) = win.take_input() {
                input.destroy();
            }
            win.mark_dirty();
            self.dirty |= DirtyFlags::WINDOW_AREA | DirtyFlags::INPUT;
        }
    }

    /// Move the top window's modal input widget to a screen position.
    pub fn move_input(&mut self, x: i32, y: i32) {
        if let Some(win) = self.stack.top().and_then(|id| self.windows.get_mut(&id))
            && let Some(input) = win.input.as_mut()
        {
            let core = input.core_mut();
            core.x = x;
            core.y = y;
            core.dirty = true;
            self.dirty |= DirtyFlags::WINDOW_AREA | DirtyFlags::INPUT;
        }
    }

    /// Size of the top window's modal input widget, if one is active.
    pub fn input_size(&self) -> Option<(i32, i32)> {
        let win = self.stack.top().and_then(|id| self.windows.get(&id))?;
        win.input_size()
    }

    /// Queue an input code on the top window's ring buffer.
    ///
    /// The template for cross-thread input injection: producers push
    /// here, the loop drains into the focus widget. Returns `false` when
    /// the buffer rejected the code.
    pub fn queue_input(&mut self, code: u32) -> bool {
        match self.stack.top().and_then(|id| self.windows.get_mut(&id)) {
            Some(win) => win.queue_input(code),
            None => {
                warn!(code, "input code dropped, no window on the stack");
                false
            }
        }
    }

    // --- Timers -----------------------------------------------------------

    /// Create a one-shot timer due `delay_ms` from the loop's current
    /// tick.
    pub fn create_timer(
        &mut self,
        delay_ms: u64,
        cb: impl FnMut(&mut Toolkit) + 'static,
    ) -> TimerId {
        self.timers.create(self.last_tick, delay_ms, Box::new(cb))
    }

    /// Cancel a pending timer. Stale handles are a reported no-op.
    pub fn cancel_timer(&mut self, id: TimerId) -> bool {
        self.timers.cancel(id)
    }

    // --- Hooks and knobs --------------------------------------------------

    /// Install or clear the first-refusal global event handler.
    pub fn set_global_event_handler(&mut self, handler: Option<GlobalHandler>) {
        self.global_handler = handler;
    }

    /// Install or clear the last-resort unused-event handler.
    pub fn set_global_unused_handler(&mut self, handler: Option<UnusedHandler>) {
        self.unused_handler = handler;
    }

    /// Install or clear the feedback-click callback.
    pub fn set_clicker(&mut self, clicker: Option<Clicker>) {
        self.clicker = clicker;
    }

    /// Set the scroll numerator/denominator pair.
    ///
    /// A denominator above 1 smooths coarse scroll input by accumulating
    /// sub-unit deltas.
    pub fn set_scroll_multiplier(&mut self, num: i32, denom: i32) {
        self.scroll_num = num;
        self.scroll_denom = denom;
    }

    /// Set the window transition frame count (clamped to at least 1).
    pub fn set_transition_frames(&mut self, frames: i32) {
        self.transition_frames = frames.max(1);
    }

    /// Set the header title justification.
    pub fn set_header_justification(&mut self, justify: Justify) {
        self.header_justify = justify;
    }

    /// Pin the header title to a text position, or `None` to center it.
    pub fn set_header_text_position(&mut self, x: Option<i32>) {
        self.header_text_pos = x;
    }

    /// Whether a button is currently pressed.
    pub fn button_pressed(&self, btn: Button) -> bool {
        self.input.pressed(btn)
    }

    // --- Internals --------------------------------------------------------

    /// Clear a window's surface and force-repaint all its widgets.
    pub(crate) fn redraw_window_surface(&mut self, id: WindowId) {
        let Some(win) = self.windows.get_mut(&id) else {
            return;
        };
        let mut ctx = DrawCtx {
            fonts: self.fonts.as_mut(),
            theme: &self.theme,
        };
        let Window {
            widgets, surface, ..
        } = win;
        surface.clear(Color::KEY);
        for w in widgets {
            w.draw(surface, &mut ctx);
            w.core_mut().dirty = false;
        }
    }

    /// Apply a deferred widget command.
    pub(crate) fn apply_command(&mut self, cmd: Command) {
        match cmd {
            Command::Register(win) => {
                self.add_window(win);
            }
            Command::Show(id) => self.show(id),
            Command::Hide(id) => {
                self.hide(id);
            }
            Command::Close(id) => self.close(id),
            Command::Popup(id) => self.popup(id),
            Command::StartInput(widget) => {
                self.start_input(widget);
            }
            Command::EndInput => self.end_input(),
        }
    }

    /// Whether two window rects qualify for the sliding transition: equal
    /// size with the resident window filling the content area.
    fn transition_geometry(resident: &Rect, moving: &Rect, metrics: &ScreenMetrics) -> bool {
        resident.w == moving.w
            && resident.h == moving.h
            && resident.x == metrics.content_x
            && resident.y == metrics.content_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hatui_render::FixedFontProvider;

    fn toolkit() -> Toolkit {
        Toolkit::new(
            ScreenMetrics::gray_160x128(),
            Box::new(FixedFontProvider::standard()),
        )
        .unwrap()
    }

    #[test]
    fn empty_font_provider_refuses_to_initialize() {
        let r = Toolkit::new(
            ScreenMetrics::gray_160x128(),
            Box::new(FixedFontProvider::new()),
        );
        assert!(r.is_err());
    }

    #[test]
    fn show_is_idempotent_on_stack_count() {
        let mut tk = toolkit();
        let win = tk.new_window();
        let id = tk.add_window(win);
        tk.show(id);
        tk.show(id);
        tk.show(id);
        assert_eq!(tk.stack().len(), 1);
        assert_eq!(tk.stack().top(), Some(id));
    }

    #[test]
    fn show_reorders_existing_entry_to_top() {
        let mut tk = toolkit();
        let a = tk.add_window(Window::new(&tk.metrics()));
        let b = tk.add_window(Window::new(&tk.metrics()));
        tk.show(a);
        tk.show(b);
        assert_eq!(tk.stack().top(), Some(b));
        tk.show(a);
        assert_eq!(tk.stack().top(), Some(a));
        assert_eq!(tk.stack().len(), 2);
    }

    #[test]
    fn hide_counts_removed_entries() {
        let mut tk = toolkit();
        let a = tk.add_window(Window::new(&tk.metrics()));
        let b = tk.add_window(Window::new(&tk.metrics()));
        tk.show(a);
        tk.show(b);
        assert_eq!(tk.hide(b), 1);
        assert_eq!(tk.stack().top(), Some(a));
        assert_eq!(tk.hide(b), 0);
        assert_eq!(tk.stack().len(), 1);
    }

    #[test]
    fn close_tears_the_window_down() {
        let mut tk = toolkit();
        let a = tk.add_window(Window::new(&tk.metrics()));
        tk.show(a);
        tk.close(a);
        assert!(tk.stack().is_empty());
        assert!(tk.window(a).is_none());
    }

    #[test]
    fn new_window_inherits_top_title() {
        let mut tk = toolkit();
        let mut first = tk.new_window();
        first.title = Cow::Borrowed("Settings");
        let id = tk.add_window(first);
        tk.show(id);
        let second = tk.new_window();
        assert_eq!(second.title.as_ref(), "Settings");
    }

    #[test]
    fn set_theme_bumps_epoch() {
        let mut tk = toolkit();
        let before = tk.epoch();
        tk.set_theme(Theme::default());
        assert_eq!(tk.epoch(), before + 1);
    }

    #[test]
    fn popup_centers_and_shows() {
        let mut tk = toolkit();
        let win = tk.new_window();
        let id = tk.add_window(win);
        tk.popup(id);
        assert_eq!(tk.stack().top(), Some(id));
    }

    #[test]
    fn transition_frames_clamp_to_one() {
        let mut tk = toolkit();
        tk.set_transition_frames(0);
        assert_eq!(tk.transition_frames, 1);
        tk.set_transition_frames(-5);
        assert_eq!(tk.transition_frames, 1);
        tk.set_transition_frames(8);
        assert_eq!(tk.transition_frames, 8);
    }

    #[test]
    fn queue_input_without_windows_is_rejected() {
        let mut tk = toolkit();
        assert!(!tk.queue_input(b'a' as u32));
    }

    #[test]
    fn input_session_round_trip() {
        let mut tk = toolkit();
        let win = tk.new_window();
        let id = tk.add_window(win);
        tk.show(id);

        struct Pad {
            core: crate::widget::WidgetCore,
        }
        impl Widget for Pad {
            fn core(&self) -> &crate::widget::WidgetCore {
                &self.core
            }
            fn core_mut(&mut self) -> &mut crate::widget::WidgetCore {
                &mut self.core
            }
        }
        let mut core = crate::widget::WidgetCore::new(0, 0);
        core.w = 40;
        core.h = 20;
        let h = tk.start_input(Box::new(Pad { core }));
        assert_eq!(h, Some(20));
        assert!(tk.window(id).unwrap().has_input());
        assert_eq!(tk.input_size(), Some((40, 20)));

        tk.move_input(5, 5);

        tk.end_input();
        assert_eq!(tk.input_size(), None);
        let win = tk.window(id).unwrap();
        assert!(!win.has_input());
        // The focus widget will drain the sentinel next iteration.
        assert_eq!(win.queued_input(), 1);
    }
}
