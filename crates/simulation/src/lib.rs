//! Deterministic simulation for the trivia round engine.
//!
//! The [`SimulationRunner`] drives an `EngineStateMachine` against an
//! in-memory [`SimulatedLedger`] in simulated time. All randomness (call
//! latency, dropped reveals, failed queries) is drawn from a seeded
//! `ChaCha8Rng`, so a seed fully determines a run.
//!
//! ```
//! use std::time::Duration;
//! use trivia_simulation::{LedgerConfig, SimulationRunner};
//! use trivia_types::{ParticipantId, RoundContent};
//!
//! let mut runner = SimulationRunner::new(ParticipantId::new("0xabc"), LedgerConfig::default(), 42);
//! runner.initialize();
//! let round = runner
//!     .start_round(RoundContent::new("2 + 2?", ["3", "4"]), 30, 1)
//!     .unwrap();
//! runner.run_for(Duration::from_secs(1));
//! assert_eq!(runner.engine().round().map(|r| r.round_id()), Some(round));
//! ```

mod event_queue;
mod ledger;
mod runner;

pub use event_queue::EventKey;
pub use ledger::{content_hash_of, LedgerConfig, SimulatedLedger};
pub use runner::{SimulationRunner, SimulationStats, SIM_EPOCH};
