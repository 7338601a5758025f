#![forbid(unsafe_code)]

//! The widget base: shared core state, the behavioral trait, and the
//! dispatch context handed to handlers.
//!
//! Widgets are trait objects owned by their window. Every handler defaults
//! to "not handled" (`UNUSED`) except the per-frame/per-timer callbacks,
//! which default to an empty result. A widget that changes visible state
//! must set its dirty flag; outside forced full repaints the engine only
//! repaints widgets that marked themselves dirty.
//!
//! Handlers cannot borrow the whole toolkit (their widget is already
//! borrowed out of it), so side effects on windows and the stack are
//! expressed as [`Command`]s queued on the [`EventCtx`] and applied by the
//! loop after the dispatch phase. Timer creation is direct — the pool is a
//! disjoint part of the context — so handlers get a cancellable handle
//! back immediately.

use crate::timer::{TimerCallback, TimerId, TimerPool};
use crate::window::{Window, WindowId};
use hatui_core::event::{Button, EventResult};
use hatui_core::geometry::Rect;
use hatui_render::{FontProvider, Surface, Theme};
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_WIDGET_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a widget, independent of its storage position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetId(u64);

impl WidgetId {
    fn next() -> Self {
        WidgetId(NEXT_WIDGET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// State every widget carries, embedded in the concrete widget struct.
#[derive(Debug)]
pub struct WidgetCore {
    /// Horizontal position (window-local pixels).
    pub x: i32,
    /// Vertical position (window-local pixels).
    pub y: i32,
    /// Width in pixels.
    pub w: i32,
    /// Height in pixels.
    pub h: i32,
    /// Whether this widget is a focus candidate.
    pub focusable: bool,
    /// Whether the focused widget wants the raw key stream.
    pub rawkeys: bool,
    /// Whether held buttons re-dispatch the down event every tick.
    pub keyrepeat: bool,
    /// Press duration (ms) after which the held-handler fires.
    pub holdtime: u64,
    /// Needs repaint. Starts true: every widget is painted once.
    pub dirty: bool,
    /// Opaque user data.
    pub data: Option<Box<dyn Any>>,
    /// Second opaque user data slot.
    pub data2: Option<Box<dyn Any>>,
    pub(crate) frame_last: u64,
    pub(crate) frame_delay: u64,
    pub(crate) timer_last: u64,
    pub(crate) timer_delay: u64,
    pub(crate) window: Option<WindowId>,
    id: WidgetId,
}

impl WidgetCore {
    /// A default core at the given position: zero size, not focusable, no
    /// repeat, hold-time 1000 ms, dirty.
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            w: 0,
            h: 0,
            focusable: false,
            rawkeys: false,
            keyrepeat: false,
            holdtime: 1000,
            dirty: true,
            data: None,
            data2: None,
            frame_last: 0,
            frame_delay: 0,
            timer_last: 0,
            timer_delay: 0,
            window: None,
            id: WidgetId::next(),
        }
    }

    /// This widget's stable identity.
    #[inline]
    pub fn id(&self) -> WidgetId {
        self.id
    }

    /// The window currently owning this widget, if any.
    #[inline]
    pub fn window(&self) -> Option<WindowId> {
        self.window
    }

    /// The widget rectangle.
    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }

    /// Mark this widget as needing repaint.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Schedule the per-frame callback at `fps` frames per second.
    ///
    /// `fps` of 0 disables the schedule.
    pub fn set_fps(&mut self, fps: u64, now: u64) {
        if fps != 0 {
            self.frame_last = now;
            self.frame_delay = 1000 / fps;
        } else {
            self.frame_last = 0;
            self.frame_delay = 0;
        }
    }

    /// Schedule the per-timer callback every `ms` milliseconds.
    ///
    /// Independent of the frame schedule. `ms` of 0 disables it.
    pub fn set_timer(&mut self, ms: u64, now: u64) {
        self.timer_last = now;
        self.timer_delay = ms;
    }
}

impl Default for WidgetCore {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// A polymorphic interactive/drawable unit.
///
/// All behavioral operations default to "not handled"; the frame and timer
/// callbacks default to "handled, no bits set". Concrete widgets override
/// what they use and leave the rest.
pub trait Widget {
    /// Shared core state.
    fn core(&self) -> &WidgetCore;

    /// Shared core state, mutable.
    fn core_mut(&mut self) -> &mut WidgetCore;

    /// Paint into the surface. Widget coordinates are window-local.
    fn draw(&mut self, _srf: &mut Surface, _ctx: &mut DrawCtx<'_>) {}

    /// A button went down while this widget was the event target.
    fn down(&mut self, _btn: Button, _ctx: &mut EventCtx<'_>) -> EventResult {
        EventResult::UNUSED
    }

    /// A button was released after `held_ms` without a hold having fired.
    fn button(&mut self, _btn: Button, _held_ms: u64, _ctx: &mut EventCtx<'_>) -> EventResult {
        EventResult::UNUSED
    }

    /// A button crossed the hold-time threshold. Dispatched at most once
    /// per press, and only when [`Widget::overrides_held`] is true.
    fn held(&mut self, _btn: Button, _ctx: &mut EventCtx<'_>) -> EventResult {
        EventResult::UNUSED
    }

    /// Whether this widget has a real held-handler.
    ///
    /// The hold state machine skips widgets that keep the default.
    fn overrides_held(&self) -> bool {
        false
    }

    /// Scroll wheel movement (already scaled by the loop's multiplier).
    fn scroll(&mut self, _delta: i32, _ctx: &mut EventCtx<'_>) -> EventResult {
        EventResult::UNUSED
    }

    /// A tap on the touch surface.
    fn tap(&mut self, _pos: i32, _ctx: &mut EventCtx<'_>) -> EventResult {
        EventResult::UNUSED
    }

    /// A queued text-input code drained from the window buffer.
    fn input(&mut self, _code: u32, _ctx: &mut EventCtx<'_>) -> EventResult {
        EventResult::UNUSED
    }

    /// Per-frame callback, fired by the frame schedule.
    fn frame(&mut self, _ctx: &mut EventCtx<'_>) -> EventResult {
        EventResult::empty()
    }

    /// Per-timer callback, fired by the timer schedule.
    fn timer(&mut self, _ctx: &mut EventCtx<'_>) -> EventResult {
        EventResult::empty()
    }

    /// Teardown hook, called once when the owning window is destroyed.
    fn destroy(&mut self) {}
}

/// Deferred side effects queued by widget handlers.
///
/// Applied by the loop after the dispatch phase of the iteration that
/// queued them, before the top window is recomputed and before redraw.
pub enum Command {
    /// Register a window with the toolkit arena.
    Register(Window),
    /// Show a registered window (reorder to top or push).
    Show(WindowId),
    /// Hide every stack entry of a window.
    Hide(WindowId),
    /// Hide, tear down, and drop a window.
    Close(WindowId),
    /// Auto-size a window to its widgets, center it, and show it.
    Popup(WindowId),
    /// Start a modal input session on the top window.
    StartInput(Box<dyn Widget>),
    /// End the top window's modal input session.
    EndInput,
}

/// Context handed to behavioral widget handlers.
pub struct EventCtx<'a> {
    /// The tick the current iteration is running at.
    pub tick: u64,
    timers: &'a mut TimerPool,
    commands: &'a mut Vec<Command>,
}

impl<'a> EventCtx<'a> {
    pub(crate) fn new(
        tick: u64,
        timers: &'a mut TimerPool,
        commands: &'a mut Vec<Command>,
    ) -> Self {
        Self {
            tick,
            timers,
            commands,
        }
    }

    /// Create a one-shot timer due `delay_ms` from now.
    pub fn create_timer(
        &mut self,
        delay_ms: u64,
        cb: impl FnMut(&mut crate::toolkit::Toolkit) + 'static,
    ) -> TimerId {
        self.timers.create(self.tick, delay_ms, Box::new(cb) as TimerCallback)
    }

    /// Cancel a timer before it fires. Stale handles are a reported no-op.
    pub fn cancel_timer(&mut self, id: TimerId) -> bool {
        self.timers.cancel(id)
    }

    /// Register a window; its id is usable in further commands at once.
    pub fn add_window(&mut self, win: Window) -> WindowId {
        let id = win.id();
        self.commands.push(Command::Register(win));
        id
    }

    /// Show a window after dispatch completes.
    pub fn show(&mut self, id: WindowId) {
        self.commands.push(Command::Show(id));
    }

    /// Hide a window after dispatch completes.
    pub fn hide(&mut self, id: WindowId) {
        self.commands.push(Command::Hide(id));
    }

    /// Close (hide + destroy) a window after dispatch completes.
    pub fn close(&mut self, id: WindowId) {
        self.commands.push(Command::Close(id));
    }

    /// Register a window and pop it up sized to its widgets.
    pub fn popup(&mut self, win: Window) -> WindowId {
        let id = win.id();
        self.commands.push(Command::Register(win));
        self.commands.push(Command::Popup(id));
        id
    }

    /// Begin a modal input session on the top window.
    pub fn start_input(&mut self, widget: Box<dyn Widget>) {
        self.commands.push(Command::StartInput(widget));
    }

    /// End the top window's modal input session.
    pub fn end_input(&mut self) {
        self.commands.push(Command::EndInput);
    }
}

/// Context handed to draw calls.
pub struct DrawCtx<'a> {
    /// The font provider for text measurement and drawing.
    pub fonts: &'a mut dyn FontProvider,
    /// The active appearance table.
    pub theme: &'a Theme,
}

/// Fire a widget's due frame/timer callbacks for this iteration.
///
/// The unused bit is masked out of schedule results before accumulation.
pub(crate) fn run_schedules(
    w: &mut dyn Widget,
    tick: u64,
    ctx: &mut EventCtx<'_>,
) -> EventResult {
    let mut eret = EventResult::empty();
    let (frame_due, timer_due) = {
        let c = w.core();
        (
            c.frame_delay != 0 && c.frame_last + c.frame_delay <= tick,
            c.timer_delay != 0 && c.timer_last + c.timer_delay <= tick,
        )
    };
    if frame_due {
        w.core_mut().frame_last = tick;
        eret |= w.frame(ctx).used();
    }
    if timer_due {
        // The timer schedule restarts one past the tick, unlike frames.
        w.core_mut().timer_last = tick + 1;
        eret |= w.timer(ctx).used();
    }
    eret
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain {
        core: WidgetCore,
        frames: u32,
        timers: u32,
    }

    impl Plain {
        fn new() -> Self {
            Self {
                core: WidgetCore::new(0, 0),
                frames: 0,
                timers: 0,
            }
        }
    }

    impl Widget for Plain {
        fn core(&self) -> &WidgetCore {
            &self.core
        }
        fn core_mut(&mut self) -> &mut WidgetCore {
            &mut self.core
        }
        fn frame(&mut self, _ctx: &mut EventCtx<'_>) -> EventResult {
            self.frames += 1;
            EventResult::UNUSED | EventResult::CLICK
        }
        fn timer(&mut self, _ctx: &mut EventCtx<'_>) -> EventResult {
            self.timers += 1;
            EventResult::empty()
        }
    }

    fn ctx_parts() -> (TimerPool, Vec<Command>) {
        (TimerPool::new(), Vec::new())
    }

    #[test]
    fn defaults_match_contract() {
        let mut w = Plain::new();
        let (mut pool, mut cmds) = ctx_parts();
        let mut ctx = EventCtx::new(0, &mut pool, &mut cmds);
        assert_eq!(w.core().w, 0);
        assert!(!w.core().focusable);
        assert_eq!(w.core().holdtime, 1000);
        assert!(w.core().dirty);
        assert_eq!(w.down(Button::MENU, &mut ctx), EventResult::UNUSED);
        assert_eq!(w.scroll(1, &mut ctx), EventResult::UNUSED);
        assert!(!w.overrides_held());
    }

    #[test]
    fn schedules_fire_when_due_and_mask_unused() {
        let mut w = Plain::new();
        w.core_mut().set_fps(100, 0); // every 10ms
        let (mut pool, mut cmds) = ctx_parts();

        let mut ctx = EventCtx::new(5, &mut pool, &mut cmds);
        assert_eq!(run_schedules(&mut w, 5, &mut ctx), EventResult::empty());
        assert_eq!(w.frames, 0);

        let mut ctx = EventCtx::new(10, &mut pool, &mut cmds);
        let r = run_schedules(&mut w, 10, &mut ctx);
        assert_eq!(w.frames, 1);
        // Unused masked out, click kept.
        assert_eq!(r, EventResult::CLICK);
    }

    #[test]
    fn frame_and_timer_schedules_are_independent() {
        let mut w = Plain::new();
        w.core_mut().set_fps(100, 0);
        w.core_mut().set_timer(50, 0);
        let (mut pool, mut cmds) = ctx_parts();
        let mut ctx = EventCtx::new(50, &mut pool, &mut cmds);
        run_schedules(&mut w, 50, &mut ctx);
        assert_eq!(w.frames, 1);
        assert_eq!(w.timers, 1);
        // Timer last lands one past the tick.
        assert_eq!(w.core().timer_last, 51);
        assert_eq!(w.core().frame_last, 50);
    }

    #[test]
    fn zero_fps_disables_frame_schedule() {
        let mut w = Plain::new();
        w.core_mut().set_fps(100, 0);
        w.core_mut().set_fps(0, 0);
        let (mut pool, mut cmds) = ctx_parts();
        let mut ctx = EventCtx::new(1000, &mut pool, &mut cmds);
        run_schedules(&mut w, 1000, &mut ctx);
        assert_eq!(w.frames, 0);
    }

    #[test]
    fn widget_ids_are_unique() {
        let a = WidgetCore::new(0, 0);
        let b = WidgetCore::new(0, 0);
        assert_ne!(a.id(), b.id());
    }
}
