#![forbid(unsafe_code)]

//! The event/redraw loop.
//!
//! One iteration runs a fixed sequence: resolve the top window (demoting
//! a minimized top), catch the window up to the global epoch, fire due
//! per-widget frame/timer callbacks, expire pool timers, poll one input
//! event, run the button state machine and dispatch, drain queued input
//! codes, apply deferred widget commands, play any pending window
//! transition, repaint what the dirty bits demand, and present. The
//! aggregate result's `CLICK` bit triggers the feedback callback, `DONE`
//! terminates the loop with its status byte, and a residual `UNUSED` bit
//! is offered to the registered fallback handler.
//!
//! Running out of windows mid-loop is the designed exit with status 0;
//! *starting* the loop with an empty stack is a programmer error and
//! aborts with a diagnostic.

use crate::stack::MoveTarget;
use crate::toolkit::{DirtyFlags, Justify, Toolkit};
use crate::widget::{Command, DrawCtx, EventCtx, run_schedules};
use crate::window::{Window, WindowId};
use hatui_backend::Backend;
use hatui_core::event::{Button, EventResult, InputEvent};
use hatui_core::geometry::Rect;
use hatui_render::{Color, FontError, FontProvider, Surface};
use std::io;
use tracing::{debug, warn};

/// Frame pacing delay (ms) on backends without natural pacing.
const PACING_DELAY_MS: u64 = 30;

/// Per-frame delay (ms) while a window transition plays.
const TRANSITION_DELAY_MS: u64 = 10;

/// The run-loop: owns the toolkit context, the backend, and the screen
/// surface everything composites onto.
pub struct EventLoop<B: Backend> {
    tk: Toolkit,
    backend: B,
    screen: Surface,
    commands: Vec<Command>,
}

impl<B: Backend> EventLoop<B> {
    /// Build a loop over a backend.
    ///
    /// Fails only when the font provider is empty (see [`Toolkit::new`]).
    pub fn new(backend: B, fonts: Box<dyn FontProvider>) -> Result<Self, FontError> {
        let metrics = backend.metrics();
        let tk = Toolkit::new(metrics, fonts)?;
        let screen = Surface::new(metrics.width, metrics.height);
        Ok(Self {
            tk,
            backend,
            screen,
            commands: Vec::new(),
        })
    }

    /// The toolkit context.
    #[inline]
    pub fn toolkit(&self) -> &Toolkit {
        &self.tk
    }

    /// The toolkit context, mutable.
    #[inline]
    pub fn toolkit_mut(&mut self) -> &mut Toolkit {
        &mut self.tk
    }

    /// The backend.
    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutable.
    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The composed screen surface.
    #[inline]
    pub fn screen(&self) -> &Surface {
        &self.screen
    }

    /// Run until the stack empties (status 0) or a handler returns
    /// `DONE` (its status byte).
    ///
    /// # Panics
    ///
    /// Starting with no window on the stack violates a load-bearing
    /// precondition of every later step and aborts the process.
    pub fn run(&mut self) -> io::Result<u8> {
        assert!(
            !self.tk.stack.is_empty(),
            "event loop started with no window on the stack"
        );
        self.tk.started = true;
        self.tk.dirty |= DirtyFlags::FILTHY;
        loop {
            if let Some(status) = self.iterate()? {
                debug!(status, "event loop finished");
                return Ok(status);
            }
        }
    }

    /// Run one loop iteration.
    ///
    /// Returns `Some(status)` when the loop is done: the stack emptied
    /// (status 0) or a dispatch returned `DONE`.
    pub fn iterate(&mut self) -> io::Result<Option<u8>> {
        self.tk.started = true;
        if self.tk.stack.is_empty() {
            return Ok(Some(0));
        }

        // A minimized top goes to the back before anything runs.
        if self.tk.stack.top_minimized()
            && let Some(top) = self.tk.stack.top()
        {
            self.tk.move_window(top, MoveTarget::End);
        }
        let Some(win_id) = self.tk.stack.top() else {
            return Ok(Some(0));
        };
        let tick = self.backend.ticks();
        self.tk.last_tick = tick;

        // Epoch catch-up and event-target resolution.
        let (target_id, wants_raw) = {
            let Some(win) = self.tk.windows.get_mut(&win_id) else {
                warn!(?win_id, "stack entry without a window, dropping it");
                self.tk.stack.remove_all(win_id);
                return Ok(None);
            };
            if win.epoch < self.tk.epoch {
                self.tk.dirty |= DirtyFlags::FILTHY;
                win.dirty = true;
                win.epoch = self.tk.epoch;
            }
            let target_id = win.event_target_id();
            let wants_raw = win.event_target_mut().is_some_and(|w| w.core().rawkeys);
            (target_id, wants_raw)
        };

        let mut eret = EventResult::empty();
        let mut commands = std::mem::take(&mut self.commands);

        // Per-widget frame/timer callbacks: header, modal input, window.
        {
            let mut ctx = EventCtx::new(tick, &mut self.tk.timers, &mut commands);
            for w in self.tk.header_widgets.iter_mut() {
                eret |= run_schedules(w.as_mut(), tick, &mut ctx);
            }
        }
        let show_header = self
            .tk
            .windows
            .get(&win_id)
            .is_some_and(|w| w.show_header);
        if show_header && self.tk.header_widgets.iter().any(|w| w.core().dirty) {
            self.tk.dirty |= DirtyFlags::HEADER;
        }
        if let Some(win) = self.tk.windows.get_mut(&win_id) {
            let mut ctx = EventCtx::new(tick, &mut self.tk.timers, &mut commands);
            if let Some(input) = win.input.as_mut() {
                eret |= run_schedules(input.as_mut(), tick, &mut ctx);
                if input.core().dirty {
                    self.tk.dirty |= DirtyFlags::INPUT;
                }
            }
            for w in win.widgets.iter_mut() {
                eret |= run_schedules(w.as_mut(), tick, &mut ctx);
            }
        }

        // Expire due pool timers: unlink first, invoke after, so a
        // callback creating a timer is never re-scanned this pass.
        while let Some(mut cb) = self.tk.timers.take_first_due(tick) {
            cb(&mut self.tk);
        }

        // One input poll; raw stream when the target asked for it.
        let ev = if wants_raw {
            self.backend.poll_raw_event()
        } else {
            self.backend.poll_event()
        };

        // Gating: the global handler gets first refusal, but never sees
        // a button id owned by a different widget or mid-press.
        let mut local = ev.is_some() && target_id.is_some();
        let mut global = ev.is_some() && self.tk.global_handler.is_some();
        if let Some(InputEvent::ButtonDown(b)) = ev
            && !self.tk.input.global_may_take(b, tick, target_id)
        {
            global = false;
        }
        if global {
            let held_ms = ev
                .and_then(|e| e.button())
                .map(|b| tick.saturating_sub(self.tk.input.press_time(b)))
                .unwrap_or(0);
            let handler = self.tk.global_handler.as_mut().expect("checked above");
            if handler(ev.expect("checked above"), held_ms) {
                local = false;
            }
        }

        // Scroll accumulation runs even when dispatch is vetoed; the
        // remainder must carry across iterations.
        let mut scroll_arg = None;
        if let Some(InputEvent::Scroll(delta)) = ev {
            scroll_arg = self
                .tk
                .input
                .accumulate_scroll(delta, self.tk.scroll_num, self.tk.scroll_denom);
        }

        // Button state machine, dispatch, hold detection, input drain.
        let mut release_ms: u64 = 0;
        if let Some(win) = self.tk.windows.get_mut(&win_id) {
            let mut ctx = EventCtx::new(tick, &mut self.tk.timers, &mut commands);
            match ev {
                Some(InputEvent::ButtonDown(b)) => {
                    self.tk.input.note_down(b, tick, target_id);
                    let keyrepeat = target_id
                        .and_then(|id| win.widget_by_id_mut(id))
                        .is_some_and(|w| w.core().keyrepeat);
                    if local
                        && self.tk.input.down_dispatches(b, tick, target_id, keyrepeat)
                        && let Some(w) = target_id.and_then(|id| win.widget_by_id_mut(id))
                    {
                        let er = w.down(b, &mut ctx);
                        self.tk.input.accumulate_down(b, er);
                        eret |= er.used();
                    }
                }
                Some(InputEvent::ButtonUp(b)) => {
                    let release = self.tk.input.take_release(b, tick);
                    release_ms = release.held_ms;
                    if local
                        && target_id == release.owner
                        && !release.hold_sent
                        && let Some(w) = target_id.and_then(|id| win.widget_by_id_mut(id))
                    {
                        let er = w.button(b, release.held_ms, &mut ctx);
                        eret |= er;
                        // The aggregate stays unused only when the
                        // up-event and every prior down-event agreed.
                        if er.contains(EventResult::UNUSED)
                            && release.down_results.contains(EventResult::UNUSED)
                        {
                            eret.insert(EventResult::UNUSED);
                        } else {
                            eret.remove(EventResult::UNUSED);
                        }
                    }
                }
                Some(InputEvent::Scroll(_)) => {
                    if local
                        && let Some(arg) = scroll_arg
                        && let Some(w) = target_id.and_then(|id| win.widget_by_id_mut(id))
                    {
                        eret |= w.scroll(arg, &mut ctx).used();
                    }
                }
                Some(InputEvent::Tap(pos)) => {
                    if local
                        && let Some(w) = target_id.and_then(|id| win.widget_by_id_mut(id))
                    {
                        eret |= w.tap(pos, &mut ctx).used();
                    }
                }
                None => {}
            }

            // Hold detection: every pressed id past the target's
            // threshold fires at most once per press, and only into a
            // widget with a real held-handler. An accepted hold
            // suppresses the eventual click.
            if let Some(w) = target_id.and_then(|id| win.widget_by_id_mut(id))
                && w.overrides_held()
            {
                let holdtime = w.core().holdtime;
                let pressed: Vec<Button> = self.tk.input.pressed_buttons().collect();
                for b in pressed {
                    if tick.saturating_sub(self.tk.input.press_time(b)) >= holdtime
                        && !self.tk.input.hold_sent(b)
                    {
                        let er = w.held(b, &mut ctx);
                        if !er.contains(EventResult::UNUSED) {
                            eret |= er;
                            self.tk.input.mark_hold_sent(b);
                        }
                    }
                }
            }

            // Drain queued input codes into the focus widget.
            while let Some(code) = win.queue.pop() {
                if let Some(focus) = win.focus
                    && let Some(fw) = win.widget_mut(focus)
                {
                    eret |= fw.input(code, &mut ctx).used();
                }
            }
        }

        // Deferred widget commands land before the top window is
        // recomputed and before redraw, so a handler can close a window
        // ahead of its stale widgets repainting.
        for cmd in commands.drain(..) {
            self.tk.apply_command(cmd);
        }
        self.commands = commands;

        self.play_transition()?;

        // The stack may have changed during dispatch; empty means done.
        if self.tk.stack.is_empty() {
            return Ok(Some(0));
        }
        let win_id = self.tk.stack.top().expect("stack is non-empty");

        // Header row.
        let show_header = self
            .tk
            .windows
            .get(&win_id)
            .is_some_and(|w| w.show_header);
        if self.tk.dirty.contains(DirtyFlags::HEADER) && show_header {
            self.draw_header(win_id);
            self.tk.dirty.remove(DirtyFlags::HEADER);
            self.tk.dirty.insert(DirtyFlags::SCREEN);
        }

        // Widget repaint into the window surface: full when the window is
        // dirty, otherwise only widgets that marked themselves.
        if let Some(win) = self.tk.windows.get_mut(&win_id) {
            let mut ctx = DrawCtx {
                fonts: self.tk.fonts.as_mut(),
                theme: &self.tk.theme,
            };
            let Window {
                widgets,
                surface,
                dirty,
                ..
            } = win;
            if *dirty {
                surface.clear(Color::KEY);
                for w in widgets.iter_mut() {
                    w.draw(surface, &mut ctx);
                    w.core_mut().dirty = false;
                }
                *dirty = false;
                self.tk.dirty |= DirtyFlags::WINDOW_AREA;
            } else {
                let mut any = false;
                for w in widgets.iter_mut() {
                    if w.core().dirty {
                        surface.fill_rect(w.core().rect(), Color::KEY);
                        w.draw(surface, &mut ctx);
                        w.core_mut().dirty = false;
                        any = true;
                    }
                }
                if any {
                    self.tk.dirty |= DirtyFlags::WINDOW_AREA;
                }
            }
        }

        // Composite the window surface onto the screen with its chrome.
        if self.tk.dirty.contains(DirtyFlags::WINDOW_AREA) {
            if let Some(win) = self.tk.windows.get(&win_id) {
                let m = self.tk.metrics;
                let theme = self.tk.theme;
                let bg = win.background.unwrap_or(theme.window_bg);
                self.screen.fill_rect(win.rect, bg);
                self.screen.blit_rect(
                    &win.surface,
                    Rect::from_size(win.rect.w, win.rect.h),
                    win.rect.x,
                    win.rect.y,
                );
                if win.rect.x > m.content_x + 2 || win.rect.y > m.content_y + 2 {
                    self.screen.draw_rect(win.rect, theme.window_border);
                }
                if win.show_header {
                    self.screen.hline(0, m.width, m.content_y, theme.header_line);
                }
            }
            self.tk.dirty.remove(DirtyFlags::WINDOW_AREA);
            self.tk.dirty.insert(DirtyFlags::SCREEN);
        }

        // Composite the modal input region over everything else.
        if self.tk.dirty.contains(DirtyFlags::INPUT) {
            let mut drew = false;
            if let Some(win) = self.tk.windows.get_mut(&win_id)
                && win.input.is_some()
            {
                let theme = self.tk.theme;
                let mut ctx = DrawCtx {
                    fonts: self.tk.fonts.as_mut(),
                    theme: &self.tk.theme,
                };
                let input = win.input.as_mut().expect("checked above");
                let r = input.core().rect();
                self.screen.fill_rect(r, theme.window_bg);
                self.screen.draw_rect(r, theme.window_border);
                input.draw(&mut self.screen, &mut ctx);
                input.core_mut().dirty = false;
                drew = true;
            }
            self.tk.dirty.remove(DirtyFlags::INPUT);
            if drew {
                self.tk.dirty.insert(DirtyFlags::SCREEN);
            }
        }

        // Post-dispatch signals.
        if eret.contains(EventResult::CLICK)
            && let Some(clicker) = self.tk.clicker.as_mut()
        {
            clicker();
        }
        if eret.contains(EventResult::DONE) {
            return Ok(Some(eret.exit_status()));
        }
        if eret.contains(EventResult::UNUSED)
            && let Some(ev) = ev
            && let Some(handler) = self.tk.unused_handler.as_mut()
        {
            eret |= handler(ev, release_ms);
            if eret.contains(EventResult::DONE) {
                return Ok(Some(eret.exit_status()));
            }
        }

        if self.tk.dirty.contains(DirtyFlags::SCREEN) {
            self.backend.present(&self.screen)?;
            self.tk.dirty.remove(DirtyFlags::SCREEN);
        }
        if self.backend.needs_frame_pacing() {
            self.backend.delay(PACING_DELAY_MS);
        }
        Ok(None)
    }

    /// Play a recorded sliding transition: N frames compositing both
    /// surfaces at increasing horizontal offsets, then a settle frame.
    /// Purely cosmetic; window state is already final when this runs.
    fn play_transition(&mut self) -> io::Result<()> {
        let Some(t) = self.tk.pending_transition.take() else {
            return Ok(());
        };
        if !t.reverse {
            self.tk.redraw_window_surface(t.incoming);
        }
        let m = self.tk.metrics;
        let theme = self.tk.theme;
        let frames = self.tk.transition_frames.max(1);
        let Some(incoming) = self.tk.windows.get(&t.incoming) else {
            return Ok(());
        };
        let rect = incoming.rect;
        let jump = rect.w / frames;
        let content = Rect::new(m.content_x, m.content_y, m.content_w(), m.content_h());

        let steps: Vec<i32> = if t.reverse {
            (0..frames).rev().collect()
        } else {
            (0..frames).collect()
        };
        for i in steps {
            let off = i * jump;
            self.screen.fill_rect(content, theme.window_bg);
            let (resident, moving) = if t.reverse {
                (&incoming.surface, &t.outgoing)
            } else {
                (&t.outgoing, &incoming.surface)
            };
            self.screen.blit_rect(
                resident,
                Rect::new(off, 0, rect.w - off, rect.h),
                m.content_x,
                m.content_y,
            );
            self.screen.blit_rect(
                moving,
                Rect::new(0, 0, off, rect.h),
                rect.w - off + m.content_x,
                m.content_y,
            );
            self.screen.hline(0, m.width, m.content_y, theme.header_line);
            self.backend.present(&self.screen)?;
            if self.backend.needs_frame_pacing() {
                self.backend.delay(TRANSITION_DELAY_MS);
            }
        }

        // Settle on the incoming window.
        self.screen.fill_rect(content, theme.window_bg);
        self.screen.blit_rect(
            &incoming.surface,
            Rect::from_size(rect.w, rect.h),
            m.content_x,
            m.content_y,
        );
        self.screen.hline(0, m.width, m.content_y, theme.header_line);
        self.backend.present(&self.screen)?;
        Ok(())
    }

    /// Repaint the header row: themed background, forced header widgets,
    /// the top window's title at the configured justification, and the
    /// separator line.
    fn draw_header(&mut self, win_id: WindowId) {
        let m = self.tk.metrics;
        let theme = self.tk.theme;
        let title = self
            .tk
            .windows
            .get(&win_id)
            .map(|w| w.title.to_string())
            .unwrap_or_default();

        self.screen
            .fill_rect(Rect::new(0, 0, m.width, m.content_y), theme.header_bg);
        {
            let mut ctx = DrawCtx {
                fonts: self.tk.fonts.as_mut(),
                theme: &self.tk.theme,
            };
            for w in self.tk.header_widgets.iter_mut() {
                w.draw(&mut self.screen, &mut ctx);
                w.core_mut().dirty = false;
            }
        }

        let font = self.tk.header_font;
        let tw = self.tk.fonts.text_width(font, &title);
        let th = self.tk.fonts.text_height(font);
        let mut textpos = self.tk.header_text_pos.unwrap_or(m.width / 2);
        match self.tk.header_justify {
            Justify::Right => textpos -= tw,
            Justify::Center => textpos -= tw / 2,
            Justify::Left => {}
        }
        self.tk.fonts.draw_text(
            font,
            &mut self.screen,
            textpos,
            (m.content_y - th) / 2,
            theme.header_fg,
            &title,
        );
        self.screen.hline(0, m.width, m.content_y, theme.header_line);
    }
}
