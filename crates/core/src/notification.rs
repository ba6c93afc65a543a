//! Outbound notifications for the presentation layer.

use trivia_types::{Digest, EngineError, ParticipantStat, Round, RoundId};

/// State changes and action outcomes published to the presentation layer.
///
/// The runner forwards these; it never interprets them.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// The tracked round was loaded or changed.
    RoundUpdated(Round),

    /// The displayed round was dropped because a newer round started and its
    /// content is not loaded yet. `round_id` is the newer round.
    RoundCleared { round_id: RoundId },

    /// The deadline clock was recomputed.
    ClockUpdated { remaining: u64, warning: bool },

    /// The ranked leaderboard changed.
    LeaderboardUpdated(Vec<ParticipantStat>),

    /// A participant action was rejected.
    ActionRejected(EngineError),

    /// Identity verification succeeded.
    Verified,

    /// The local participant's commitment was accepted.
    CommitmentAccepted { round_id: RoundId, digest: Digest },
}

impl Notification {
    /// Get a human-readable name for this notification type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Notification::RoundUpdated(_) => "RoundUpdated",
            Notification::RoundCleared { .. } => "RoundCleared",
            Notification::ClockUpdated { .. } => "ClockUpdated",
            Notification::LeaderboardUpdated(_) => "LeaderboardUpdated",
            Notification::ActionRejected(_) => "ActionRejected",
            Notification::Verified => "Verified",
            Notification::CommitmentAccepted { .. } => "CommitmentAccepted",
        }
    }
}
