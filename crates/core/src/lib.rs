//! Core types for the trivia round engine.
//!
//! This crate provides the foundational types for the engine architecture:
//!
//! - [`Event`]: All possible inputs to the state machine
//! - [`Action`]: All possible outputs from the state machine
//! - [`Notification`]: Outputs addressed to the presentation layer
//! - [`EventPriority`]: Ordering priority for events at the same timestamp
//! - [`StateMachine`]: The trait that all state machines implement
//!
//! # Architecture
//!
//! The core is built on a simple event-driven model:
//!
//! ```text
//! Events → StateMachine::handle() → Actions
//! ```
//!
//! The state machine is:
//! - **Synchronous**: No async, no .await
//! - **Deterministic**: Same state + event = same actions
//! - **Pure-ish**: Mutates self, but performs no I/O
//!
//! All I/O is handled by the runner (simulation or production) which:
//! 1. Delivers events to the state machine
//! 2. Executes the returned actions against the external capabilities
//! 3. Converts action results back into events
//!
//! Ledger notifications, clock ticks, user actions and callbacks all enter
//! through the same `handle` entry point, so the state machine is the single
//! writer of round state.

mod action;
mod event;
mod notification;
mod traits;

pub use action::Action;
pub use event::{Event, EventPriority, SortKey};
pub use notification::Notification;
pub use traits::{StateMachine, SubStateMachine};

use trivia_types::RoundId;

/// Timer identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Deadline clock cadence.
    ClockTick,
}

/// What a round query is for.
///
/// The ledger only answers "what is the current round"; the key records
/// which trigger the query serves, so that concurrent triggers for the same
/// round share a single outstanding query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKey {
    /// Startup fetch; no round is known yet.
    Current,
    /// Refresh on behalf of a specific round.
    Round(RoundId),
}

impl QueryKey {
    /// The round this query serves, if any.
    pub fn round_id(&self) -> Option<RoundId> {
        match self {
            QueryKey::Current => None,
            QueryKey::Round(id) => Some(*id),
        }
    }
}
