//! Button, hold, scroll, and input-drain behavior driven through the
//! event loop with a scripted headless backend.

use hatui_backend::{HeadlessBackend, ScreenMetrics};
use hatui_core::event::{Button, EventResult, InputEvent};
use hatui_render::FixedFontProvider;
use hatui_runtime::{EventCtx, EventLoop, Widget, WidgetCore};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Default)]
struct Log(Rc<RefCell<Vec<String>>>);

impl Log {
    fn push(&self, s: String) {
        self.0.borrow_mut().push(s);
    }
    fn take(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

/// A focusable widget that records every dispatch it receives.
struct Key {
    core: WidgetCore,
    log: Log,
    down_result: EventResult,
    up_result: EventResult,
    held_result: Option<EventResult>,
}

impl Key {
    fn boxed(log: &Log) -> Box<Self> {
        let mut core = WidgetCore::new(0, 0);
        core.focusable = true;
        core.w = 50;
        core.h = 20;
        Box::new(Self {
            core,
            log: log.clone(),
            down_result: EventResult::UNUSED,
            up_result: EventResult::UNUSED,
            held_result: None,
        })
    }
}

impl Widget for Key {
    fn core(&self) -> &WidgetCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }
    fn down(&mut self, btn: Button, _ctx: &mut EventCtx<'_>) -> EventResult {
        self.log.push(format!("down:{}", btn.0));
        self.down_result
    }
    fn button(&mut self, btn: Button, held_ms: u64, _ctx: &mut EventCtx<'_>) -> EventResult {
        self.log.push(format!("up:{}:{held_ms}", btn.0));
        self.up_result
    }
    fn held(&mut self, btn: Button, _ctx: &mut EventCtx<'_>) -> EventResult {
        self.log.push(format!("held:{}", btn.0));
        self.held_result.unwrap_or(EventResult::UNUSED)
    }
    fn overrides_held(&self) -> bool {
        self.held_result.is_some()
    }
    fn scroll(&mut self, delta: i32, _ctx: &mut EventCtx<'_>) -> EventResult {
        self.log.push(format!("scroll:{delta}"));
        EventResult::empty()
    }
    fn input(&mut self, code: u32, _ctx: &mut EventCtx<'_>) -> EventResult {
        self.log.push(format!("input:{code}"));
        EventResult::empty()
    }
}

fn harness(tick_step: u64, rig: impl FnOnce(&mut Key)) -> (EventLoop<HeadlessBackend>, Log) {
    let log = Log::default();
    let backend = HeadlessBackend::new(ScreenMetrics::gray_160x128(), tick_step);
    let mut ui = EventLoop::new(backend, Box::new(FixedFontProvider::standard())).unwrap();
    let mut widget = Key::boxed(&log);
    rig(&mut widget);
    let mut win = ui.toolkit_mut().new_window();
    win.add_widget(widget);
    let id = ui.toolkit_mut().add_window(win);
    ui.toolkit_mut().show(id);
    (ui, log)
}

fn step(ui: &mut EventLoop<HeadlessBackend>, n: usize) {
    for _ in 0..n {
        ui.iterate().unwrap();
    }
}

#[test]
fn fresh_press_dispatches_down_once() {
    let (mut ui, log) = harness(10, |_| {});
    let b = Button::ACTION;
    ui.backend_mut().push_event(10, InputEvent::ButtonDown(b));
    step(&mut ui, 4);
    assert_eq!(log.take(), vec![format!("down:{}", b.0)]);
    assert!(ui.toolkit().button_pressed(b));
}

#[test]
fn release_dispatches_click_with_held_duration() {
    let (mut ui, log) = harness(10, |_| {});
    let b = Button::ACTION;
    ui.backend_mut().push_event(10, InputEvent::ButtonDown(b));
    ui.backend_mut().push_event(40, InputEvent::ButtonUp(b));
    step(&mut ui, 6);
    assert_eq!(
        log.take(),
        vec![format!("down:{}", b.0), format!("up:{}:30", b.0)]
    );
    assert!(!ui.toolkit().button_pressed(b));
}

#[test]
fn repeat_downs_need_keyrepeat() {
    let b = Button::FORWARD;
    // Without repeat: the second hardware down is swallowed.
    let (mut ui, log) = harness(10, |_| {});
    ui.backend_mut().push_event(10, InputEvent::ButtonDown(b));
    ui.backend_mut().push_event(20, InputEvent::ButtonDown(b));
    step(&mut ui, 4);
    assert_eq!(log.take().len(), 1);

    // With repeat: every down re-dispatches.
    let (mut ui, log) = harness(10, |k| k.core.keyrepeat = true);
    ui.backend_mut().push_event(10, InputEvent::ButtonDown(b));
    ui.backend_mut().push_event(20, InputEvent::ButtonDown(b));
    ui.backend_mut().push_event(30, InputEvent::ButtonDown(b));
    step(&mut ui, 5);
    assert_eq!(log.take().len(), 3);
}

#[test]
fn hold_fires_once_and_suppresses_click() {
    // Press at tick 100 with hold-time 1000, release at tick 1200.
    let (mut ui, log) = harness(100, |k| k.held_result = Some(EventResult::empty()));
    let b = Button(5);
    ui.backend_mut().push_event(100, InputEvent::ButtonDown(b));
    ui.backend_mut().push_event(1200, InputEvent::ButtonUp(b));
    step(&mut ui, 14);
    let events = log.take();
    assert_eq!(events[0], format!("down:{}", b.0));
    // Exactly one held dispatch, and no up/click after it.
    assert_eq!(
        events.iter().filter(|e| e.starts_with("held:")).count(),
        1
    );
    assert!(!events.iter().any(|e| e.starts_with("up:")));
}

#[test]
fn refused_hold_leaves_click_intact() {
    // A held-handler answering "unused" must not eat the click.
    let (mut ui, log) = harness(100, |k| k.held_result = Some(EventResult::UNUSED));
    let b = Button(5);
    ui.backend_mut().push_event(100, InputEvent::ButtonDown(b));
    ui.backend_mut().push_event(1200, InputEvent::ButtonUp(b));
    step(&mut ui, 14);
    let events = log.take();
    // The refusal repeats while pressed, but the click still lands.
    assert!(events.iter().any(|e| e.starts_with("held:")));
    assert_eq!(events.iter().filter(|e| e.starts_with("up:")).count(), 1);
}

#[test]
fn widget_without_held_handler_is_skipped() {
    let (mut ui, log) = harness(100, |_| {});
    let b = Button(5);
    ui.backend_mut().push_event(100, InputEvent::ButtonDown(b));
    step(&mut ui, 20);
    assert!(!log.take().iter().any(|e| e.starts_with("held:")));
}

#[test]
fn global_handler_vetoes_local_dispatch() {
    let (mut ui, log) = harness(10, |_| {});
    let seen = Rc::new(RefCell::new(0u32));
    let seen2 = Rc::clone(&seen);
    ui.toolkit_mut()
        .set_global_event_handler(Some(Box::new(move |_ev, _ms| {
            *seen2.borrow_mut() += 1;
            true
        })));
    ui.backend_mut()
        .push_event(10, InputEvent::ButtonDown(Button::MENU));
    step(&mut ui, 3);
    assert_eq!(*seen.borrow(), 1);
    assert!(log.take().is_empty());
    // The press is still tracked even though dispatch was vetoed.
    assert!(ui.toolkit().button_pressed(Button::MENU));
}

#[test]
fn unused_fallback_sees_unconsumed_events() {
    let (mut ui, _log) = harness(10, |_| {});
    let fallback = Rc::new(RefCell::new(Vec::new()));
    let fb = Rc::clone(&fallback);
    ui.toolkit_mut()
        .set_global_unused_handler(Some(Box::new(move |ev, ms| {
            fb.borrow_mut().push((ev, ms));
            EventResult::empty()
        })));
    let b = Button::MENU;
    ui.backend_mut().push_event(10, InputEvent::ButtonDown(b));
    ui.backend_mut().push_event(30, InputEvent::ButtonUp(b));
    step(&mut ui, 5);
    // Down and up both defaulted to unused; the up-merge left the unused
    // bit set, so the fallback got the release with its held time.
    let calls = fallback.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], (InputEvent::ButtonUp(b), 20));
}

#[test]
fn click_bit_triggers_feedback() {
    let (mut ui, _log) = harness(10, |k| k.down_result = EventResult::CLICK);
    let clicks = Rc::new(RefCell::new(0u32));
    let c = Rc::clone(&clicks);
    ui.toolkit_mut()
        .set_clicker(Some(Box::new(move || *c.borrow_mut() += 1)));
    ui.backend_mut()
        .push_event(10, InputEvent::ButtonDown(Button::ACTION));
    step(&mut ui, 3);
    assert_eq!(*clicks.borrow(), 1);
}

#[test]
fn scroll_accumulates_to_the_denominator() {
    let (mut ui, log) = harness(10, |_| {});
    ui.toolkit_mut().set_scroll_multiplier(1, 3);
    for i in 0..6 {
        ui.backend_mut()
            .push_event(10 + i * 10, InputEvent::Scroll(1));
    }
    step(&mut ui, 8);
    // Six unit deltas with denominator 3: exactly two dispatches.
    assert_eq!(log.take(), vec!["scroll:1", "scroll:1"]);
}

#[test]
fn scroll_numerator_scales_dispatch() {
    let (mut ui, log) = harness(10, |_| {});
    ui.toolkit_mut().set_scroll_multiplier(4, 1);
    ui.backend_mut().push_event(10, InputEvent::Scroll(-2));
    step(&mut ui, 3);
    assert_eq!(log.take(), vec!["scroll:-8"]);
}

#[test]
fn queued_codes_drain_in_fifo_order() {
    let (mut ui, log) = harness(10, |_| {});
    assert!(ui.toolkit_mut().queue_input(7));
    assert!(ui.toolkit_mut().queue_input(8));
    assert!(ui.toolkit_mut().queue_input(9));
    step(&mut ui, 1);
    assert_eq!(log.take(), vec!["input:7", "input:8", "input:9"]);
}

#[test]
fn raw_stream_reaches_rawkeys_widgets() {
    let (mut ui, log) = harness(10, |k| k.core.rawkeys = true);
    // The decoded stream is ignored while the target wants raw codes.
    ui.backend_mut()
        .push_event(10, InputEvent::ButtonDown(Button::MENU));
    ui.backend_mut()
        .push_raw_event(10, InputEvent::ButtonDown(Button(0x41)));
    step(&mut ui, 2);
    assert_eq!(log.take(), vec![format!("down:{}", 0x41)]);
}
