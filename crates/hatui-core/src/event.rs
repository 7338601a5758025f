#![forbid(unsafe_code)]

//! Input events and dispatch result codes.
//!
//! Buttons are a small fixed integer space (128 ids): enough for the
//! physical controls of a media-player style device plus a few synthetic
//! character codes used by text-entry key repeat. Decoded events carry a
//! button id or an integer argument (scroll delta, tap position); the raw
//! stream delivers unfiltered key codes to widgets that ask for them.

use bitflags::bitflags;

/// Number of button id slots tracked by the input state machine.
pub const BUTTON_SLOTS: usize = 128;

/// A button identifier.
///
/// Ids double as ASCII codes for the synthetic text-entry buttons, so the
/// whole space fits in 7 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Button(pub u8);

impl Button {
    /// Menu / back control.
    pub const MENU: Button = Button(b'm');
    /// Rewind / scroll-left control.
    pub const REWIND: Button = Button(b'w');
    /// Fast-forward / scroll-right control.
    pub const FORWARD: Button = Button(b'f');
    /// Play/pause control.
    pub const PLAY: Button = Button(b'd');
    /// Select / action control.
    pub const ACTION: Button = Button(b'\n');

    /// Slot index into the input state arrays.
    #[inline]
    pub const fn index(self) -> usize {
        (self.0 as usize) % BUTTON_SLOTS
    }
}

/// A decoded input event from the backend.
///
/// `None` from a poll means the iteration proceeds without input; timers
/// and redraw still run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// A button was pressed.
    ButtonDown(Button),
    /// A button was released.
    ButtonUp(Button),
    /// Scroll wheel movement with a signed delta.
    Scroll(i32),
    /// A tap on the touch surface with its position.
    Tap(i32),
}

impl InputEvent {
    /// The button id this event concerns, if it is a button event.
    #[inline]
    pub const fn button(&self) -> Option<Button> {
        match self {
            InputEvent::ButtonDown(b) | InputEvent::ButtonUp(b) => Some(*b),
            _ => None,
        }
    }
}

bitflags! {
    /// Bit-flag result of every widget dispatch.
    ///
    /// An empty result means "handled, nothing further". Bits 8..16 carry
    /// the process exit status when [`EventResult::DONE`] is set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EventResult: u32 {
        /// The handler did not act on the input; an outer layer may take it.
        const UNUSED = 1 << 0;
        /// Trigger the feedback click this iteration.
        const CLICK = 1 << 1;
        /// Terminate the loop; bits 8..16 carry the exit status.
        const DONE = 1 << 2;
        // The status byte lives in bits 8..16.
        const _ = !0;
    }
}

impl EventResult {
    /// A `DONE` result carrying an exit status.
    #[inline]
    pub const fn done(status: u8) -> Self {
        Self::from_bits_retain(Self::DONE.bits() | ((status as u32) << 8))
    }

    /// The exit status byte of a `DONE` result.
    #[inline]
    pub const fn exit_status(self) -> u8 {
        (self.bits() >> 8) as u8
    }

    /// Strip the `UNUSED` bit, keeping everything else.
    ///
    /// Frame/timer callbacks and non-final dispatches accumulate with the
    /// unused bit masked out; only the button-release path merges it.
    #[inline]
    pub const fn used(self) -> Self {
        Self::from_bits_retain(self.bits() & !Self::UNUSED.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_round_trips_status() {
        let r = EventResult::done(42);
        assert!(r.contains(EventResult::DONE));
        assert_eq!(r.exit_status(), 42);
    }

    #[test]
    fn used_strips_only_unused() {
        let r = EventResult::UNUSED | EventResult::CLICK;
        assert_eq!(r.used(), EventResult::CLICK);
        assert_eq!(EventResult::done(7).used(), EventResult::done(7));
    }

    #[test]
    fn status_byte_survives_accumulation() {
        let mut acc = EventResult::empty();
        acc |= EventResult::CLICK;
        acc |= EventResult::done(3);
        assert_eq!(acc.exit_status(), 3);
        assert!(acc.contains(EventResult::CLICK | EventResult::DONE));
    }

    #[test]
    fn button_index_stays_in_range() {
        assert!(Button::ACTION.index() < BUTTON_SLOTS);
        assert!(Button(0xff).index() < BUTTON_SLOTS);
    }

    #[test]
    fn event_button_extraction() {
        assert_eq!(
            InputEvent::ButtonDown(Button::MENU).button(),
            Some(Button::MENU)
        );
        assert_eq!(InputEvent::Scroll(-2).button(), None);
    }
}
