//! Event types for the deterministic state machine.

use crate::QueryKey;
use trivia_types::{
    ContentHash, Digest, EngineError, ParticipantStat, ProofToken, Round, RoundId, VerifyParams,
};

/// Priority levels for event ordering within the same timestamp.
///
/// Events at the same time are processed in priority order.
/// Lower values = higher priority (processed first).
///
/// This ensures causality is preserved: internal events (consequences of
/// processing an event) are handled before new external inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EventPriority {
    /// Internal events: consequences of prior event processing.
    /// Processed first to maintain causality.
    Internal = 0,

    /// Timer events: scheduled by the engine itself.
    Timer = 1,

    /// Network events: notifications pushed by the ledger.
    Network = 2,

    /// Client events: actions taken by the local participant.
    Client = 3,
}

/// All possible events the engine can receive.
///
/// Events are **passive data** - they describe something that happened.
/// The state machine processes events and returns actions.
#[derive(Debug, Clone)]
pub enum Event {
    // ═══════════════════════════════════════════════════════════════════════
    // Timers (priority: Timer)
    // ═══════════════════════════════════════════════════════════════════════
    /// Deadline clock cadence. Recomputes the remaining time and drives the
    /// refresh policy for unresolved rounds.
    ClockTick,

    // ═══════════════════════════════════════════════════════════════════════
    // Ledger notifications (priority: Network)
    // ═══════════════════════════════════════════════════════════════════════
    /// A new round was started on the ledger.
    RoundStarted {
        round_id: RoundId,
        content_hash: ContentHash,
        /// Absolute deadline, seconds since the UNIX epoch.
        deadline: u64,
    },

    /// The correct answer of a round was revealed on the ledger.
    AnswerRevealed {
        round_id: RoundId,
        correct_digest: Digest,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Participant actions (priority: Client)
    // ═══════════════════════════════════════════════════════════════════════
    /// Fetch the current state at startup.
    StartupRequested,

    /// Start identity verification.
    VerifyRequested { params: VerifyParams },

    /// Select an option of the current round by index.
    OptionSelected { index: usize },

    /// Commit the selected option.
    SubmitRequested,

    /// Change the leaderboard sort key.
    SortKeyChanged { key: SortKey },

    /// Re-fetch participant stats.
    StatsRefreshRequested,

    // ═══════════════════════════════════════════════════════════════════════
    // Internal Events (priority: Internal)
    // ═══════════════════════════════════════════════════════════════════════
    /// The deadline of the tracked round passed. Fired once per round.
    DeadlineExpired { round_id: RoundId },

    // ═══════════════════════════════════════════════════════════════════════
    // Async Callbacks (priority: Internal)
    // Results from delegated external calls
    // ═══════════════════════════════════════════════════════════════════════
    /// Round query completed.
    ///
    /// Callback from `Action::QueryRound`. Carries the assembled round
    /// (ledger observation plus resolved content) or the failure.
    RoundQueried {
        key: QueryKey,
        result: Result<Round, EngineError>,
    },

    /// Commitment submission completed.
    ///
    /// Callback from `Action::SubmitCommitment`.
    CommitmentSubmitted {
        round_id: RoundId,
        digest: Digest,
        result: Result<(), EngineError>,
    },

    /// Identity verification completed.
    ///
    /// Callback from `Action::VerifyIdentity`.
    IdentityVerified {
        result: Result<ProofToken, EngineError>,
    },

    /// Stats fetch completed.
    ///
    /// Callback from `Action::FetchStats`.
    StatsFetched {
        result: Result<Vec<ParticipantStat>, EngineError>,
    },
}

/// Leaderboard sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortKey {
    /// Descending by tokens earned.
    #[default]
    Tokens,
    /// Descending by `correct / total`, with `0/0 = 0`.
    Accuracy,
}

impl Event {
    /// Get the priority for this event type.
    pub fn priority(&self) -> EventPriority {
        match self {
            Event::DeadlineExpired { .. }
            | Event::RoundQueried { .. }
            | Event::CommitmentSubmitted { .. }
            | Event::IdentityVerified { .. }
            | Event::StatsFetched { .. } => EventPriority::Internal,

            Event::ClockTick => EventPriority::Timer,

            Event::RoundStarted { .. } | Event::AnswerRevealed { .. } => EventPriority::Network,

            Event::StartupRequested
            | Event::VerifyRequested { .. }
            | Event::OptionSelected { .. }
            | Event::SubmitRequested
            | Event::SortKeyChanged { .. }
            | Event::StatsRefreshRequested => EventPriority::Client,
        }
    }

    /// Check if this is an internal event (consequence of prior processing).
    pub fn is_internal(&self) -> bool {
        self.priority() == EventPriority::Internal
    }

    /// Get the event type name for telemetry.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::ClockTick => "ClockTick",
            Event::RoundStarted { .. } => "RoundStarted",
            Event::AnswerRevealed { .. } => "AnswerRevealed",
            Event::StartupRequested => "StartupRequested",
            Event::VerifyRequested { .. } => "VerifyRequested",
            Event::OptionSelected { .. } => "OptionSelected",
            Event::SubmitRequested => "SubmitRequested",
            Event::SortKeyChanged { .. } => "SortKeyChanged",
            Event::StatsRefreshRequested => "StatsRefreshRequested",
            Event::DeadlineExpired { .. } => "DeadlineExpired",
            Event::RoundQueried { .. } => "RoundQueried",
            Event::CommitmentSubmitted { .. } => "CommitmentSubmitted",
            Event::IdentityVerified { .. } => "IdentityVerified",
            Event::StatsFetched { .. } => "StatsFetched",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priorities() {
        assert_eq!(Event::ClockTick.priority(), EventPriority::Timer);
        assert!(Event::DeadlineExpired {
            round_id: RoundId(1)
        }
        .is_internal());
        assert_eq!(Event::SubmitRequested.priority(), EventPriority::Client);
        assert_eq!(
            Event::AnswerRevealed {
                round_id: RoundId(1),
                correct_digest: Digest::ZERO,
            }
            .priority(),
            EventPriority::Network
        );
        assert!(EventPriority::Internal < EventPriority::Client);
    }
}
