//! Simulated ledger with deterministic latency and fault injection.
//!
//! Holds the authoritative rounds, commitments and participant stats that a
//! real deployment would read from the contract. Randomness (latency
//! jitter, dropped reveals, failed queries) comes from the caller's seeded
//! RNG so runs are reproducible.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info};
use trivia_types::{
    commitment_digest, ContentHash, Digest, EngineError, ParticipantId, ParticipantStat, Phase,
    Round, RoundContent, RoundId, RoundObservation,
};

/// Configuration for the simulated ledger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Id assigned to the first round started.
    pub first_round: u64,
    /// Base latency of query, submission, verification and stats calls.
    pub call_latency: Duration,
    /// Base latency of pushed notifications.
    pub notification_latency: Duration,
    /// Jitter as a fraction of base latency (0.0 - 1.0).
    pub jitter_fraction: f64,
    /// Probability that an `AnswerRevealed` notification is never delivered.
    pub drop_reveal_rate: f64,
    /// Probability that a round query fails with `Unavailable`.
    pub query_failure_rate: f64,
    /// Tokens credited for a correct commitment.
    pub reward_tokens: u64,
    /// Whether identity verification succeeds.
    pub verify_ok: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            first_round: 1,
            call_latency: Duration::from_millis(50),
            notification_latency: Duration::from_millis(20),
            jitter_fraction: 0.1,
            drop_reveal_rate: 0.0,
            query_failure_rate: 0.0,
            reward_tokens: 10,
            verify_ok: true,
        }
    }
}

/// A round as the ledger stores it.
#[derive(Debug, Clone)]
struct LedgerRound {
    content: RoundContent,
    content_hash: ContentHash,
    deadline: u64,
    correct_index: usize,
    revealed: bool,
    commitments: HashMap<ParticipantId, Digest>,
}

impl LedgerRound {
    fn correct_digest(&self) -> Digest {
        commitment_digest(&self.content.options[self.correct_index])
    }
}

/// Content hash the ledger publishes for a round's content.
pub fn content_hash_of(content: &RoundContent) -> ContentHash {
    let mut bytes = content.prompt.as_bytes().to_vec();
    for option in &content.options {
        bytes.push(0);
        bytes.extend_from_slice(option.as_bytes());
    }
    ContentHash::of(&bytes)
}

/// In-memory stand-in for the external ledger.
#[derive(Debug)]
pub struct SimulatedLedger {
    config: LedgerConfig,
    rounds: BTreeMap<RoundId, LedgerRound>,
    next_round: RoundId,
    /// Stats in first-seen order.
    stats: Vec<ParticipantStat>,
}

impl SimulatedLedger {
    pub fn new(config: LedgerConfig) -> Self {
        let next_round = RoundId(config.first_round);
        Self {
            config,
            rounds: BTreeMap::new(),
            next_round,
            stats: Vec::new(),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut LedgerConfig {
        &mut self.config
    }

    /// The most recently started round.
    pub fn current_round(&self) -> Option<RoundId> {
        self.rounds.keys().next_back().copied()
    }

    // ─── Round Lifecycle ───

    /// Start a new round. Returns its id and content hash.
    pub fn start_round(
        &mut self,
        content: RoundContent,
        deadline: u64,
        correct_index: usize,
    ) -> Result<(RoundId, ContentHash), EngineError> {
        content.validate()?;
        if correct_index >= content.options.len() {
            return Err(EngineError::invalid_option(format!(
                "answer key {correct_index} out of range for {} options",
                content.options.len()
            )));
        }

        let round_id = self.next_round;
        self.next_round = round_id.next();
        let content_hash = content_hash_of(&content);
        self.rounds.insert(
            round_id,
            LedgerRound {
                content,
                content_hash,
                deadline,
                correct_index,
                revealed: false,
                commitments: HashMap::new(),
            },
        );
        info!(round = %round_id, deadline, "Ledger started round");
        Ok((round_id, content_hash))
    }

    /// Reveal a round's answer and tally its commitments.
    ///
    /// Returns the revealed digest, or `None` if the round is unknown or
    /// already revealed.
    pub fn reveal(&mut self, round_id: RoundId) -> Option<Digest> {
        let round = self.rounds.get_mut(&round_id)?;
        if round.revealed {
            return None;
        }
        round.revealed = true;
        let correct = round.correct_digest();

        let mut committed: Vec<(ParticipantId, Digest)> = round
            .commitments
            .iter()
            .map(|(p, d)| (p.clone(), *d))
            .collect();
        committed.sort_by(|a, b| a.0.cmp(&b.0));

        let reward = self.config.reward_tokens;
        for (participant, digest) in committed {
            let stat = self.stat_mut(&participant);
            stat.total_answered += 1;
            if digest == correct {
                stat.correct_count += 1;
                stat.tokens_earned += reward;
            }
        }
        info!(round = %round_id, "Ledger revealed round");
        Some(correct)
    }

    fn stat_mut(&mut self, participant: &ParticipantId) -> &mut ParticipantStat {
        let index = match self.stats.iter().position(|s| &s.participant == participant) {
            Some(index) => index,
            None => {
                self.stats.push(ParticipantStat::new(participant.clone()));
                self.stats.len() - 1
            }
        };
        &mut self.stats[index]
    }

    // ─── Calls ───

    /// What the ledger reports about the current round to `participant`.
    pub fn observe(&self, participant: &ParticipantId) -> Result<RoundObservation, EngineError> {
        let (&round_id, round) = self
            .rounds
            .iter()
            .next_back()
            .ok_or_else(|| EngineError::unavailable("no round has started"))?;
        Ok(RoundObservation {
            round_id,
            content_hash: round.content_hash,
            deadline: round.deadline,
            revealed: round.revealed,
            self_committed: round.commitments.contains_key(participant),
            correct_digest: round.revealed.then(|| round.correct_digest()),
        })
    }

    /// Resolve content for a round by its published hash.
    pub fn resolve_content(
        &self,
        round_id: RoundId,
        content_hash: ContentHash,
    ) -> Result<RoundContent, EngineError> {
        match self.rounds.get(&round_id) {
            Some(round) if round.content_hash == content_hash => Ok(round.content.clone()),
            Some(_) => Err(EngineError::unavailable(format!(
                "content hash mismatch for round {round_id}"
            ))),
            None => Err(EngineError::unavailable(format!("unknown round {round_id}"))),
        }
    }

    /// Observe the current round and resolve its content in one step.
    pub fn query_round(&self, participant: &ParticipantId) -> Result<Round, EngineError> {
        let observation = self.observe(participant)?;
        let content = self.resolve_content(observation.round_id, observation.content_hash)?;
        Round::assemble(observation, content)
    }

    /// Record a commitment. `now` is seconds since the epoch.
    pub fn submit(
        &mut self,
        round_id: RoundId,
        participant: &ParticipantId,
        digest: Digest,
        now: u64,
    ) -> Result<(), EngineError> {
        let round = self
            .rounds
            .get_mut(&round_id)
            .ok_or_else(|| EngineError::submission_failed(format!("unknown round {round_id}")))?;

        if round.revealed {
            return Err(EngineError::phase_violation(
                "commit",
                Phase::Revealed,
                "round already revealed",
            ));
        }
        if now >= round.deadline {
            return Err(EngineError::submission_failed("deadline passed"));
        }
        if round.commitments.contains_key(participant) {
            return Err(EngineError::phase_violation(
                "commit",
                Phase::Committed,
                "participant already committed",
            ));
        }
        round.commitments.insert(participant.clone(), digest);
        debug!(round = %round_id, participant = %participant.short(), "Ledger recorded commitment");
        Ok(())
    }

    /// Commit `option` on behalf of another participant.
    pub fn commit_as(
        &mut self,
        round_id: RoundId,
        participant: &ParticipantId,
        option: &str,
        now: u64,
    ) -> Result<(), EngineError> {
        self.submit(round_id, participant, commitment_digest(option), now)
    }

    pub fn commitment_count(&self, round_id: RoundId) -> usize {
        self.rounds
            .get(&round_id)
            .map(|r| r.commitments.len())
            .unwrap_or(0)
    }

    pub fn stats(&self) -> Vec<ParticipantStat> {
        self.stats.clone()
    }

    // ─── Fault Injection ───

    /// Sample latency for an external call.
    pub fn sample_call_latency(&self, rng: &mut ChaCha8Rng) -> Duration {
        self.jittered(self.config.call_latency, rng)
    }

    /// Sample latency for a pushed notification.
    pub fn sample_notification_latency(&self, rng: &mut ChaCha8Rng) -> Duration {
        self.jittered(self.config.notification_latency, rng)
    }

    fn jittered(&self, base: Duration, rng: &mut ChaCha8Rng) -> Duration {
        let jitter_range = base.as_secs_f64() * self.config.jitter_fraction;
        let jitter = if jitter_range > 0.0 {
            rng.gen_range(-jitter_range..jitter_range)
        } else {
            0.0
        };
        Duration::from_secs_f64((base.as_secs_f64() + jitter).max(0.001))
    }

    /// Whether a reveal notification should be dropped.
    pub fn should_drop_reveal(&self, rng: &mut ChaCha8Rng) -> bool {
        self.config.drop_reveal_rate > 0.0 && rng.gen::<f64>() < self.config.drop_reveal_rate
    }

    /// Whether a round query should fail.
    pub fn should_fail_query(&self, rng: &mut ChaCha8Rng) -> bool {
        self.config.query_failure_rate > 0.0 && rng.gen::<f64>() < self.config.query_failure_rate
    }
}
