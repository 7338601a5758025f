#![forbid(unsafe_code)]

//! Button and scroll state tracked across loop iterations.
//!
//! One record per button id: the tick the press started (0 = not
//! pressed), the widget that owned the press, whether a hold event has
//! already been signaled for it, and the raw results accumulated from
//! down-events — the release path needs those to decide whether the
//! whole press counted as "unused". The scroll accumulator carries the
//! sub-unit remainder between iterations.
//!
//! This used to be a set of free-floating arrays; keeping it in one
//! structure makes the button state machine testable without a loop.

use crate::widget::WidgetId;
use hatui_core::event::{BUTTON_SLOTS, Button, EventResult};

/// What the release path needs to know about a press that just ended.
#[derive(Debug, Clone, Copy)]
pub struct Release {
    /// How long the button was held, in ms.
    pub held_ms: u64,
    /// The widget that owned the press, if any.
    pub owner: Option<WidgetId>,
    /// Whether a hold event was already dispatched for this press.
    pub hold_sent: bool,
    /// Accumulated raw results of the press's down-events.
    pub down_results: EventResult,
}

/// Per-button press tracking plus the scroll accumulator.
pub struct InputState {
    press_time: [u64; BUTTON_SLOTS],
    hold_sent: [bool; BUTTON_SLOTS],
    down_results: [EventResult; BUTTON_SLOTS],
    owner: [Option<WidgetId>; BUTTON_SLOTS],
    scroll_accum: i32,
}

impl InputState {
    /// All buttons released, scroll accumulator empty.
    pub fn new() -> Self {
        Self {
            press_time: [0; BUTTON_SLOTS],
            hold_sent: [false; BUTTON_SLOTS],
            down_results: [EventResult::empty(); BUTTON_SLOTS],
            owner: [None; BUTTON_SLOTS],
            scroll_accum: 0,
        }
    }

    /// Whether this button is currently pressed.
    #[inline]
    pub fn pressed(&self, btn: Button) -> bool {
        self.press_time[btn.index()] != 0
    }

    /// The tick the current press of `btn` started, 0 if not pressed.
    #[inline]
    pub fn press_time(&self, btn: Button) -> u64 {
        self.press_time[btn.index()]
    }

    /// The widget owning the current press of `btn`.
    #[inline]
    pub fn owner(&self, btn: Button) -> Option<WidgetId> {
        self.owner[btn.index()]
    }

    /// Whether a hold was already signaled for the current press.
    #[inline]
    pub fn hold_sent(&self, btn: Button) -> bool {
        self.hold_sent[btn.index()]
    }

    /// Whether the global handler may be offered a down-event for `btn`:
    /// only while the id is free or owned by the current target, and only
    /// for a fresh press.
    pub fn global_may_take(&self, btn: Button, tick: u64, target: Option<WidgetId>) -> bool {
        let i = btn.index();
        let owner_ok = self.owner[i].is_none() || self.owner[i] == target;
        let fresh_ok = self.press_time[i] == 0 || self.press_time[i] == tick;
        owner_ok && fresh_ok
    }

    /// Record a down-event, claiming the id for `target` if it is free.
    pub fn note_down(&mut self, btn: Button, tick: u64, target: Option<WidgetId>) {
        let i = btn.index();
        if self.press_time[i] == 0 || self.owner[i].is_none() {
            self.press_time[i] = tick;
            self.owner[i] = target;
            self.hold_sent[i] = false;
        }
    }

    /// Whether the down-event dispatches to `target`: the target owns the
    /// press, and either the press is fresh this tick or the target wants
    /// key repeat.
    pub fn down_dispatches(
        &self,
        btn: Button,
        tick: u64,
        target: Option<WidgetId>,
        keyrepeat: bool,
    ) -> bool {
        let i = btn.index();
        self.owner[i] == target && (self.press_time[i] == tick || keyrepeat)
    }

    /// Fold a down-dispatch result into the per-id raw accumulator.
    pub fn accumulate_down(&mut self, btn: Button, result: EventResult) {
        self.down_results[btn.index()] |= result;
    }

    /// Clear the press record for `btn` and return what the release path
    /// needs.
    pub fn take_release(&mut self, btn: Button, tick: u64) -> Release {
        let i = btn.index();
        let release = Release {
            held_ms: tick.saturating_sub(self.press_time[i]),
            owner: self.owner[i],
            hold_sent: self.hold_sent[i],
            down_results: self.down_results[i],
        };
        self.press_time[i] = 0;
        self.hold_sent[i] = false;
        self.owner[i] = None;
        self.down_results[i] = EventResult::empty();
        release
    }

    /// Mark a hold as signaled so the later up-event is suppressed.
    pub fn mark_hold_sent(&mut self, btn: Button) {
        self.hold_sent[btn.index()] = true;
    }

    /// Buttons currently pressed.
    pub fn pressed_buttons(&self) -> impl Iterator<Item = Button> + '_ {
        (0..BUTTON_SLOTS).filter_map(|i| {
            if self.press_time[i] != 0 {
                Some(Button(i as u8))
            } else {
                None
            }
        })
    }

    /// Accumulate a scroll delta against the `num`/`denom` multiplier.
    ///
    /// With `denom > 1`, deltas collect in the running counter and a
    /// dispatch only emits once its magnitude reaches `denom`; the
    /// counter then wraps by repeated subtraction, carrying the remainder
    /// (always within `(-denom, denom)`) forward. The emitted delta is
    /// the polled delta scaled by `num`.
    pub fn accumulate_scroll(&mut self, delta: i32, num: i32, denom: i32) -> Option<i32> {
        if denom > 1 {
            self.scroll_accum += delta;
            if self.scroll_accum > -denom && self.scroll_accum < denom {
                return None;
            }
            if self.scroll_accum < 0 {
                while self.scroll_accum <= -denom {
                    self.scroll_accum += denom;
                }
            } else {
                while self.scroll_accum >= denom {
                    self.scroll_accum -= denom;
                }
            }
        }
        Some(delta * num)
    }

    /// The scroll remainder carried to the next iteration.
    #[inline]
    pub fn scroll_remainder(&self) -> i32 {
        self.scroll_accum
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::WidgetCore;
    use proptest::prelude::*;

    fn wid() -> WidgetId {
        WidgetCore::new(0, 0).id()
    }

    #[test]
    fn fresh_press_claims_owner_and_dispatches() {
        let mut st = InputState::new();
        let target = Some(wid());
        st.note_down(Button::MENU, 100, target);
        assert!(st.pressed(Button::MENU));
        assert_eq!(st.owner(Button::MENU), target);
        assert!(st.down_dispatches(Button::MENU, 100, target, false));
        // Next iteration, same press: only with key repeat.
        assert!(!st.down_dispatches(Button::MENU, 130, target, false));
        assert!(st.down_dispatches(Button::MENU, 130, target, true));
    }

    #[test]
    fn repeat_down_does_not_reclaim_owner() {
        let mut st = InputState::new();
        let first = Some(wid());
        let second = Some(wid());
        st.note_down(Button::ACTION, 100, first);
        st.note_down(Button::ACTION, 150, second);
        assert_eq!(st.owner(Button::ACTION), first);
        assert_eq!(st.press_time(Button::ACTION), 100);
        assert!(!st.down_dispatches(Button::ACTION, 150, second, true));
    }

    #[test]
    fn release_reports_and_clears() {
        let mut st = InputState::new();
        let target = Some(wid());
        st.note_down(Button::PLAY, 100, target);
        st.accumulate_down(Button::PLAY, EventResult::UNUSED);
        st.mark_hold_sent(Button::PLAY);
        let rel = st.take_release(Button::PLAY, 350);
        assert_eq!(rel.held_ms, 250);
        assert_eq!(rel.owner, target);
        assert!(rel.hold_sent);
        assert!(rel.down_results.contains(EventResult::UNUSED));
        assert!(!st.pressed(Button::PLAY));
        assert_eq!(st.take_release(Button::PLAY, 400).owner, None);
    }

    #[test]
    fn global_gate_honors_owner_and_freshness() {
        let mut st = InputState::new();
        let a = Some(wid());
        let b = Some(wid());
        assert!(st.global_may_take(Button::MENU, 100, a));
        st.note_down(Button::MENU, 100, a);
        // Same tick, same owner: still offered.
        assert!(st.global_may_take(Button::MENU, 100, a));
        // Later tick: the press is no longer fresh.
        assert!(!st.global_may_take(Button::MENU, 140, a));
        // Another target never sees an owned id.
        assert!(!st.global_may_take(Button::MENU, 100, b));
    }

    #[test]
    fn unit_scrolls_emit_every_denominator() {
        let mut st = InputState::new();
        let mut emitted = 0;
        for _ in 0..12 {
            if st.accumulate_scroll(1, 1, 4).is_some() {
                emitted += 1;
            }
        }
        assert_eq!(emitted, 3);
        assert_eq!(st.scroll_remainder(), 0);
    }

    #[test]
    fn scroll_passthrough_without_denominator() {
        let mut st = InputState::new();
        assert_eq!(st.accumulate_scroll(3, 2, 1), Some(6));
        assert_eq!(st.scroll_remainder(), 0);
    }

    #[test]
    fn scroll_sign_change_carries_remainder() {
        let mut st = InputState::new();
        assert_eq!(st.accumulate_scroll(2, 1, 4), None);
        assert_eq!(st.accumulate_scroll(-7, 1, 4), Some(-7));
        // 2 - 7 = -5, wrapped up by one denominator step.
        assert_eq!(st.scroll_remainder(), -1);
    }

    proptest! {
        #[test]
        fn scroll_remainder_stays_bounded(
            deltas in proptest::collection::vec(-3i32..=3, 0..200),
            denom in 2i32..=8,
        ) {
            let mut st = InputState::new();
            for d in deltas {
                st.accumulate_scroll(d, 1, denom);
                prop_assert!(st.scroll_remainder() > -denom);
                prop_assert!(st.scroll_remainder() < denom);
            }
        }
    }
}
