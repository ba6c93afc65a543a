//! External capabilities the engine consumes.
//!
//! Each trait is a narrow interface onto one operation of the external
//! ledger (or a service next to it). Implementations convert their transport
//! failures into the matching [`EngineError`] kind; the runner additionally
//! bounds every call with the configured request timeout.

use async_trait::async_trait;
use trivia_types::{
    ContentHash, Digest, EngineError, ParticipantStat, ProofToken, RoundContent, RoundId,
    RoundObservation, VerifyParams,
};

/// Query the ledger's current round.
#[async_trait]
pub trait RoundSource: Send + Sync {
    /// Fails with [`EngineError::Unavailable`].
    async fn query_current_round(&self) -> Result<RoundObservation, EngineError>;
}

/// Submit the local participant's commitment.
#[async_trait]
pub trait CommitmentSink: Send + Sync {
    /// Fails with [`EngineError::SubmissionFailed`] or
    /// [`EngineError::PhaseViolation`] when the ledger no longer accepts
    /// commitments for the round.
    async fn submit_commitment(&self, round_id: RoundId, digest: Digest)
        -> Result<(), EngineError>;
}

/// Run the external identity prover.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Fails with [`EngineError::VerificationFailed`].
    async fn verify(&self, params: &VerifyParams) -> Result<ProofToken, EngineError>;
}

/// Resolve a round's question text and options from its content hash.
#[async_trait]
pub trait ContentResolver: Send + Sync {
    /// Fails with [`EngineError::Unavailable`].
    async fn resolve_content(
        &self,
        round_id: RoundId,
        content_hash: ContentHash,
    ) -> Result<RoundContent, EngineError>;
}

/// Fetch aggregate participant stats.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Fails with [`EngineError::Unavailable`].
    async fn fetch_stats(&self) -> Result<Vec<ParticipantStat>, EngineError>;
}
