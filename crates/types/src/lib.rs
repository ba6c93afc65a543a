//! Core types for the trivia round synchronization engine.
//!
//! This crate provides the foundational types used by every other crate:
//!
//! - **Primitives**: [`Digest`] and the commitment hasher ([`commitment_digest`])
//! - **Identifiers**: [`RoundId`], [`ParticipantId`], [`ContentHash`]
//! - **Round types**: [`Round`], [`Phase`], [`RoundContent`], [`RoundObservation`],
//!   [`Commitment`]
//! - **Stats**: [`ParticipantStat`]
//! - **Errors**: [`EngineError`], the taxonomy surfaced to callers
//!
//! # Design Philosophy
//!
//! This crate is self-contained and does not depend on any other workspace
//! crate, making it the foundation layer.

mod digest;
mod error;
mod identifiers;
mod round;
mod stats;

pub use digest::{commitment_digest, Digest, HexError, DIGEST_LEN};
pub use error::EngineError;
pub use identifiers::{ContentHash, ParticipantId, ProofToken, RoundId};
pub use round::{Commitment, Phase, Round, RoundContent, RoundObservation};
pub use stats::ParticipantStat;

/// Parameters passed to the external identity prover.
///
/// Opaque to the engine; forwarded verbatim to the verifier capability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyParams {
    /// Title shown by the prover.
    pub title: String,
    /// Description shown by the prover.
    pub description: String,
    /// Where the prover should return after verification.
    pub callback_url: String,
}

/// Test utilities.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use super::*;

    /// The canonical four-option round used throughout the tests.
    pub fn test_content() -> RoundContent {
        RoundContent::new(
            "What is the capital of France?",
            ["London", "Paris", "Berlin", "Madrid"],
        )
    }

    /// Create an unrevealed observation for a round.
    pub fn test_observation(round_id: u64, deadline: u64) -> RoundObservation {
        RoundObservation {
            round_id: RoundId(round_id),
            content_hash: ContentHash::of(format!("round-{round_id}").as_bytes()),
            deadline,
            revealed: false,
            self_committed: false,
            correct_digest: None,
        }
    }

    /// Create an open test round with the canonical content.
    pub fn test_round(round_id: u64, deadline: u64) -> Round {
        Round::assemble(test_observation(round_id, deadline), test_content())
            .expect("test content is valid")
    }

    /// Create a participant stat record.
    pub fn test_stat(participant: &str, tokens: u64, correct: u64, total: u64) -> ParticipantStat {
        ParticipantStat {
            participant: ParticipantId::new(participant),
            correct_count: correct,
            total_answered: total,
            tokens_earned: tokens,
            power_ups_used: 0,
        }
    }
}
