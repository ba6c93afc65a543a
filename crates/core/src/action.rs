//! Action types for the deterministic state machine.

use crate::{Event, Notification, QueryKey, TimerId};
use std::time::Duration;
use trivia_types::{Digest, RoundId, VerifyParams};

/// Actions the state machine wants to perform.
///
/// Actions are **commands** - they describe something to do.
/// The runner executes actions and may convert results back into events.
#[derive(Debug, Clone)]
pub enum Action {
    // ═══════════════════════════════════════════════════════════════════════
    // Timers
    // ═══════════════════════════════════════════════════════════════════════
    /// Set a timer to fire after a duration.
    ///
    /// Setting a timer that is already pending replaces it.
    SetTimer { id: TimerId, duration: Duration },

    // ═══════════════════════════════════════════════════════════════════════
    // Internal (fed back as events with Internal priority)
    // ═══════════════════════════════════════════════════════════════════════
    /// Enqueue an internal event for immediate processing.
    ///
    /// Internal events are processed at the same timestamp with higher
    /// priority than external events, preserving causality.
    EnqueueInternal { event: Event },

    // ═══════════════════════════════════════════════════════════════════════
    // Delegated Work (async, returns callback event)
    // ═══════════════════════════════════════════════════════════════════════
    /// Query the ledger for the current round and resolve its content.
    ///
    /// Returns `Event::RoundQueried` with the same key when complete.
    QueryRound { key: QueryKey },

    /// Submit a commitment digest for a round.
    ///
    /// Returns `Event::CommitmentSubmitted` when complete.
    SubmitCommitment { round_id: RoundId, digest: Digest },

    /// Run the external identity prover.
    ///
    /// Returns `Event::IdentityVerified` when complete.
    VerifyIdentity { params: VerifyParams },

    /// Fetch participant stats.
    ///
    /// Returns `Event::StatsFetched` when complete.
    FetchStats,

    // ═══════════════════════════════════════════════════════════════════════
    // Presentation
    // ═══════════════════════════════════════════════════════════════════════
    /// Publish a state change or an action outcome.
    Notify { notification: Notification },
}

impl Action {
    /// Get the action type name for telemetry.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::SetTimer { .. } => "SetTimer",
            Action::EnqueueInternal { .. } => "EnqueueInternal",
            Action::QueryRound { .. } => "QueryRound",
            Action::SubmitCommitment { .. } => "SubmitCommitment",
            Action::VerifyIdentity { .. } => "VerifyIdentity",
            Action::FetchStats => "FetchStats",
            Action::Notify { .. } => "Notify",
        }
    }

    /// Shorthand for a notification action.
    pub fn notify(notification: Notification) -> Self {
        Action::Notify { notification }
    }
}
