//! Deadline clock for trivia rounds.
//!
//! Converts an absolute deadline into a remaining-time value that only ever
//! decreases, exposes a warning flag near the end, and fires a one-shot
//! expiry signal.
//!
//! # Components
//!
//! - [`DeadlineClock`] - Pure clock, a function of the injected wall-clock time
//! - [`ClockState`] - Sub-state machine that turns `ClockTick` events into
//!   `ClockUpdated` notifications and a single `DeadlineExpired` event per round
//! - [`format_remaining`] - `MM:SS` display projection

mod clock;
mod state;

pub use clock::{format_remaining, remaining_at, ClockReading, DeadlineClock, DEFAULT_WARNING_SECS};
pub use state::ClockState;
