//! State machine traits.

use crate::{Action, Event};
use std::time::Duration;

/// A deterministic, synchronous state machine.
///
/// Implementations must not perform I/O or read the wall clock; time is
/// injected through [`StateMachine::set_time`] before each event.
pub trait StateMachine {
    /// Process an event and return the actions to execute.
    fn handle(&mut self, event: Event) -> Vec<Action>;

    /// Set the current time (since the UNIX epoch in production, simulated
    /// time in simulation).
    fn set_time(&mut self, now: Duration);

    /// The time last injected with [`StateMachine::set_time`].
    fn now(&self) -> Duration;
}

/// A component of a composite state machine.
///
/// Returns `None` for events it does not handle, so the parent can route
/// events without knowing every component's interests.
pub trait SubStateMachine {
    /// Try to handle an event. `None` means "not mine".
    fn try_handle(&mut self, event: &Event) -> Option<Vec<Action>>;

    /// Set the current time.
    fn set_time(&mut self, now: Duration);
}
