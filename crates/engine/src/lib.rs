//! Reconciliation controller.
//!
//! [`EngineStateMachine`] composes the deadline clock, the round state
//! machine and the stats book into the single [`StateMachine`] the runners
//! drive. It is the only writer of round state: ledger notifications, clock
//! ticks, participant actions and the callbacks of delegated calls all go
//! through [`StateMachine::handle`].
//!
//! [`StateMachine`]: trivia_core::StateMachine
//! [`StateMachine::handle`]: trivia_core::StateMachine::handle

mod config;
mod state;

pub use config::ControllerConfig;
pub use state::{EngineStateMachine, EngineStats};
