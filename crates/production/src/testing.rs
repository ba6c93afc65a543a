//! In-memory capability fakes for the runner tests.

use crate::capabilities::{
    CommitmentSink, ContentResolver, IdentityVerifier, RoundSource, StatsSource,
};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use trivia_types::test_utils::{test_content, test_observation};
use trivia_types::{
    ContentHash, Digest, EngineError, ParticipantStat, ProofToken, RoundContent, RoundId,
    RoundObservation, VerifyParams,
};

#[derive(Debug)]
struct Inner {
    observation: RoundObservation,
    content: RoundContent,
    submissions: Vec<(RoundId, Digest)>,
    stats: Vec<ParticipantStat>,
    verify_ok: bool,
    query_delay: Option<Duration>,
}

/// A ledger holding a single round.
#[derive(Debug)]
pub(crate) struct FakeLedger {
    inner: Mutex<Inner>,
}

impl FakeLedger {
    pub(crate) fn with_round(round_id: u64, deadline: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                observation: test_observation(round_id, deadline),
                content: test_content(),
                submissions: vec![],
                stats: vec![],
                verify_ok: true,
                query_delay: None,
            }),
        }
    }

    pub(crate) fn set_content(&self, content: RoundContent) {
        self.inner.lock().unwrap().content = content;
    }

    pub(crate) fn set_stats(&self, stats: Vec<ParticipantStat>) {
        self.inner.lock().unwrap().stats = stats;
    }

    pub(crate) fn set_verify_ok(&self, ok: bool) {
        self.inner.lock().unwrap().verify_ok = ok;
    }

    pub(crate) fn set_query_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().query_delay = Some(delay);
    }

    pub(crate) fn submissions(&self) -> Vec<(RoundId, Digest)> {
        self.inner.lock().unwrap().submissions.clone()
    }
}

#[async_trait]
impl RoundSource for FakeLedger {
    async fn query_current_round(&self) -> Result<RoundObservation, EngineError> {
        let (observation, delay) = {
            let inner = self.inner.lock().unwrap();
            (inner.observation.clone(), inner.query_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(observation)
    }
}

#[async_trait]
impl ContentResolver for FakeLedger {
    async fn resolve_content(
        &self,
        _round_id: RoundId,
        _content_hash: ContentHash,
    ) -> Result<RoundContent, EngineError> {
        Ok(self.inner.lock().unwrap().content.clone())
    }
}

#[async_trait]
impl CommitmentSink for FakeLedger {
    async fn submit_commitment(&self, round_id: RoundId, digest: Digest) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.submissions.iter().any(|(id, _)| *id == round_id) {
            return Err(EngineError::submission_failed("already committed"));
        }
        inner.submissions.push((round_id, digest));
        inner.observation.self_committed = true;
        Ok(())
    }
}

#[async_trait]
impl IdentityVerifier for FakeLedger {
    async fn verify(&self, _params: &VerifyParams) -> Result<ProofToken, EngineError> {
        if self.inner.lock().unwrap().verify_ok {
            Ok(ProofToken("proof".into()))
        } else {
            Err(EngineError::verification_failed("prover rejected"))
        }
    }
}

#[async_trait]
impl StatsSource for FakeLedger {
    async fn fetch_stats(&self) -> Result<Vec<ParticipantStat>, EngineError> {
        Ok(self.inner.lock().unwrap().stats.clone())
    }
}
