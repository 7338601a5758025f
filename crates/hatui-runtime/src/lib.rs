#![forbid(unsafe_code)]

//! The hatui windowing engine.
//!
//! This crate owns the interactive lifecycle of an on-device UI: a stack
//! of windows, each holding an ordered collection of widgets, driven by a
//! single-threaded event/redraw loop. The loop body is the scheduler —
//! there is no preemption and no second execution context. Widget
//! callbacks run to completion inside the iteration that dispatched them,
//! and "waiting" is always modeled by re-polling on the next iteration
//! (pool timers, per-widget schedules, held-key repeats, dirty flags).
//!
//! Per-iteration ordering is a contract callers may rely on: per-widget
//! frame/timer callbacks fire before input dispatch, input dispatch before
//! the drain of queued input codes, and everything before redraw
//! compositing — so a timer callback can close a window before that
//! window's stale widgets would repaint.
//!
//! All engine state lives in [`Toolkit`], an explicit context object
//! passed through the loop. If an embedding adds an input-polling thread,
//! it must marshal into the loop thread through a bounded queue; the
//! per-window input-code buffer ([`Window::queue_input`]) is the template,
//! including its backpressure policy.

pub mod event_loop;
pub mod input_state;
pub mod stack;
pub mod timer;
pub mod toolkit;
pub mod widget;
pub mod window;

pub use event_loop::EventLoop;
pub use input_state::{InputState, Release};
pub use stack::{MoveTarget, StackEntry, WindowStack};
pub use timer::{TimerCallback, TimerId, TimerPool};
pub use toolkit::{Clicker, DirtyFlags, GlobalHandler, Justify, Toolkit, UnusedHandler};
pub use widget::{Command, DrawCtx, EventCtx, Widget, WidgetCore, WidgetId};
pub use window::{INPUT_END, INPUT_QUEUE_CAPACITY, Window, WindowId};
