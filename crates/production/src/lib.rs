//! Production runner with async I/O.
//!
//! This crate wraps the deterministic engine state machine with real async
//! I/O:
//!
//! - Ledger calls via the capability traits in [`capabilities`]
//! - Clock ticks via tokio timers
//! - Ledger notifications and participant actions via tokio channels
//! - Notifications out via a tokio broadcast channel
//!
//! # Architecture
//!
//! Uses the event aggregator pattern: a single task owns the state machine
//! and receives events via mpsc channels. This avoids mutex contention and
//! keeps the reconciliation controller the single writer of round state.
//!
//! ```text
//!  LedgerSink ──┐                                   ┌─▶ EngineHandle::subscribe
//!  EngineHandle ┼─▶ ProductionRunner ─▶ Notification┘
//!  TimerManager ┘      │      ▲
//!                      ▼      │ callbacks
//!                  tokio::spawn(timeout(EngineContext::call))
//! ```
//!
//! # Example
//!
//! ```no_run
//! use trivia_production::{EngineConfig, EngineContext, ProductionRunner};
//! # use std::sync::Arc;
//! # async fn example<C>(client: Arc<C>) -> anyhow::Result<()>
//! # where C: trivia_production::RoundSource + trivia_production::ContentResolver
//! #     + trivia_production::CommitmentSink + trivia_production::IdentityVerifier
//! #     + trivia_production::StatsSource + 'static {
//! let config = EngineConfig::load("trivia.toml")?;
//! let mut runner = ProductionRunner::builder()
//!     .participant(trivia_types::ParticipantId::new("0xabc"))
//!     .context(Arc::new(EngineContext::from_client(client)))
//!     .config(config)
//!     .build()?;
//!
//! let handle = runner.handle();
//! let _shutdown = runner.shutdown_handle();
//! tokio::spawn(runner.run());
//! handle.submit().await?;
//! # Ok(())
//! # }
//! ```

pub mod capabilities;
mod config;
mod context;
mod logging;
pub mod metrics;
mod runner;
mod timers;

#[cfg(test)]
mod testing;

pub use capabilities::{
    CommitmentSink, ContentResolver, IdentityVerifier, RoundSource, StatsSource,
};
pub use config::{
    ClockConfig, ConfigError, EngineConfig, LeaderboardConfig, ReconciliationConfig,
    RunnerConfig, SortKeySetting, TieBreakSetting,
};
pub use context::EngineContext;
pub use logging::{init_logging, LoggingConfig, LoggingError, DEFAULT_FILTER};
pub use runner::{
    EngineHandle, LedgerSink, ProductionRunner, ProductionRunnerBuilder, RunnerError,
    ShutdownHandle,
};
pub use timers::TimerManager;
