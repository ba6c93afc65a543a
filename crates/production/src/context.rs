//! Process-wide engine context.

use crate::capabilities::{
    CommitmentSink, ContentResolver, IdentityVerifier, RoundSource, StatsSource,
};
use crate::RunnerError;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use trivia_types::{
    Digest, EngineError, ParticipantStat, ProofToken, Round, RoundId, VerifyParams,
};

const CREATED: u8 = 0;
const LIVE: u8 = 1;
const TORN_DOWN: u8 = 2;

/// Holds the external capabilities for the lifetime of the process.
///
/// Created once at startup and shared by reference (`Arc`) with every task
/// the runner spawns. Calls are only made between [`EngineContext::init`]
/// and [`EngineContext::teardown`]; outside that window every call fails
/// with [`EngineError::Unavailable`] without touching the capability.
pub struct EngineContext {
    rounds: Arc<dyn RoundSource>,
    content: Arc<dyn ContentResolver>,
    commitments: Arc<dyn CommitmentSink>,
    identity: Arc<dyn IdentityVerifier>,
    stats: Arc<dyn StatsSource>,
    state: AtomicU8,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("state", &self.state.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl EngineContext {
    pub fn new(
        rounds: Arc<dyn RoundSource>,
        content: Arc<dyn ContentResolver>,
        commitments: Arc<dyn CommitmentSink>,
        identity: Arc<dyn IdentityVerifier>,
        stats: Arc<dyn StatsSource>,
    ) -> Self {
        Self {
            rounds,
            content,
            commitments,
            identity,
            stats,
            state: AtomicU8::new(CREATED),
        }
    }

    /// Build a context from one client that provides every capability.
    pub fn from_client<C>(client: Arc<C>) -> Self
    where
        C: RoundSource
            + ContentResolver
            + CommitmentSink
            + IdentityVerifier
            + StatsSource
            + 'static,
    {
        Self::new(
            client.clone(),
            client.clone(),
            client.clone(),
            client.clone(),
            client,
        )
    }

    /// Open the context for calls. Fails once torn down.
    pub fn init(&self) -> Result<(), RunnerError> {
        match self
            .state
            .compare_exchange(CREATED, LIVE, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) | Err(LIVE) => {
                info!("Engine context initialized");
                Ok(())
            }
            Err(_) => Err(RunnerError::ContextTornDown),
        }
    }

    /// Close the context. Calls in flight complete; new calls fail.
    pub fn teardown(&self) {
        if self.state.swap(TORN_DOWN, Ordering::AcqRel) != TORN_DOWN {
            info!("Engine context torn down");
        }
    }

    pub fn is_live(&self) -> bool {
        self.state.load(Ordering::Acquire) == LIVE
    }

    fn ensure_live(&self) -> Result<(), EngineError> {
        if self.is_live() {
            Ok(())
        } else {
            Err(EngineError::unavailable("engine context is not live"))
        }
    }

    /// Query the current round and resolve its content.
    pub async fn query_round(&self) -> Result<Round, EngineError> {
        self.ensure_live()?;
        let observation = self.rounds.query_current_round().await?;
        debug!(round = %observation.round_id, revealed = observation.revealed, "Round observed");
        let content = self
            .content
            .resolve_content(observation.round_id, observation.content_hash)
            .await?;
        Round::assemble(observation, content)
    }

    pub async fn submit_commitment(&self, round_id: RoundId, digest: Digest) -> Result<(), EngineError> {
        self.ensure_live()
            .map_err(|e| EngineError::submission_failed(e.to_string()))?;
        self.commitments.submit_commitment(round_id, digest).await
    }

    pub async fn verify(&self, params: &VerifyParams) -> Result<ProofToken, EngineError> {
        self.ensure_live()
            .map_err(|e| EngineError::verification_failed(e.to_string()))?;
        self.identity.verify(params).await
    }

    pub async fn fetch_stats(&self) -> Result<Vec<ParticipantStat>, EngineError> {
        self.ensure_live()?;
        self.stats.fetch_stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLedger;

    #[tokio::test]
    async fn test_calls_only_while_live() {
        let ledger = Arc::new(FakeLedger::with_round(7, 1_700_000_030));
        let context = EngineContext::from_client(ledger);

        assert!(matches!(
            context.query_round().await,
            Err(EngineError::Unavailable { .. })
        ));

        context.init().unwrap();
        let round = context.query_round().await.unwrap();
        assert_eq!(round.round_id(), RoundId(7));
        assert_eq!(round.options()[1], "Paris");

        context.teardown();
        assert!(matches!(
            context.submit_commitment(RoundId(7), Digest::ZERO).await,
            Err(EngineError::SubmissionFailed { .. })
        ));
        assert!(matches!(context.init(), Err(RunnerError::ContextTornDown)));
    }

    #[tokio::test]
    async fn test_invalid_content_is_unavailable() {
        let ledger = Arc::new(FakeLedger::with_round(7, 1_700_000_030));
        ledger.set_content(trivia_types::RoundContent::new("q", ["only"]));
        let context = EngineContext::from_client(ledger);
        context.init().unwrap();

        assert!(matches!(
            context.query_round().await,
            Err(EngineError::Unavailable { .. })
        ));
    }
}
