//! Engine state machine.

use crate::ControllerConfig;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use trivia_clock::ClockState;
use trivia_core::{
    Action, Event, Notification, QueryKey, SortKey, StateMachine, SubStateMachine, TimerId,
};
use trivia_leaderboard::StatsBook;
use trivia_round::{Announcement, ApplyOutcome, RevealOutcome, RoundState};
use trivia_types::{
    Digest, EngineError, ParticipantId, ParticipantStat, Phase, ProofToken, Round, RoundId,
    VerifyParams,
};

/// Counters exposed to the runners for metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// `QueryRound` actions emitted.
    pub queries_issued: u64,
    /// Triggers dropped because an outstanding query already covered them.
    pub triggers_coalesced: u64,
    /// Query responses and notifications discarded as stale.
    pub stale_responses: u64,
    /// Failed round queries.
    pub query_failures: u64,
    /// Commitments accepted by the ledger.
    pub submissions_accepted: u64,
    /// Commitments the ledger rejected or that failed in transport.
    pub submissions_failed: u64,
}

/// Combined engine state machine.
///
/// Composes the deadline clock, the round state machine and the stats book.
/// Routing:
/// - `ClockTick` → clock (remaining, expiry), then the refresh policy
/// - ledger notifications and `DeadlineExpired` → round state plus a query
/// - participant actions → guards, then a delegated action or a rejection
/// - callbacks → merged into round state or the stats book
pub struct EngineStateMachine {
    config: ControllerConfig,

    /// Deadline clock for the tracked round.
    clock: ClockState,

    /// Round state. Only this state machine writes to it.
    round: RoundState,

    /// Accumulated participant stats.
    stats: StatsBook,
    sort_key: SortKey,
    stats_in_flight: bool,
    /// Whether the last stats fetch failed.
    stats_failed: bool,
    /// Whether any stats fetch has succeeded.
    stats_loaded: bool,
    /// When the last stats fetch was issued.
    last_stats_at: Option<Duration>,
    /// Last round whose reveal triggered a stats fetch.
    stats_after_reveal: Option<RoundId>,

    // ═══════════════════════════════════════════════════════════════════════
    // Identity
    // ═══════════════════════════════════════════════════════════════════════
    /// Proof of the last successful verification this session.
    proof: Option<ProofToken>,
    verifying: bool,

    // ═══════════════════════════════════════════════════════════════════════
    // Reconciliation
    // ═══════════════════════════════════════════════════════════════════════
    /// Outstanding queries. At most one per key.
    in_flight: HashSet<QueryKey>,
    /// When the last query was issued.
    last_query_at: Option<Duration>,
    /// Whether the last query response failed or was stale.
    last_query_failed: bool,

    /// Current time.
    now: Duration,

    counters: EngineStats,
}

impl std::fmt::Debug for EngineStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineStateMachine")
            .field("participant", self.round.participant())
            .field("round", &self.round.current_id())
            .field("high_water", &self.round.high_water())
            .field("phase", &self.round.phase())
            .field("verified", &self.proof.is_some())
            .field("in_flight", &self.in_flight.len())
            .field("now", &self.now)
            .finish()
    }
}

impl EngineStateMachine {
    /// Create an engine for the local participant.
    pub fn new(participant: ParticipantId, config: ControllerConfig) -> Self {
        Self {
            clock: ClockState::new(config.warning_threshold_secs),
            round: RoundState::new(participant),
            stats: StatsBook::new(),
            sort_key: config.default_sort,
            stats_in_flight: false,
            stats_failed: false,
            stats_loaded: false,
            last_stats_at: None,
            stats_after_reveal: None,
            proof: None,
            verifying: false,
            in_flight: HashSet::new(),
            last_query_at: None,
            last_query_failed: false,
            now: Duration::ZERO,
            counters: EngineStats::default(),
            config,
        }
    }

    /// Start the clock cadence.
    ///
    /// Returns the initial timer. The runner follows up with
    /// `Event::StartupRequested` to fetch the current state.
    pub fn initialize(&mut self) -> Vec<Action> {
        vec![Action::SetTimer {
            id: TimerId::ClockTick,
            duration: self.config.tick_interval,
        }]
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Snapshots
    // ═══════════════════════════════════════════════════════════════════════

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// The displayed round.
    pub fn round(&self) -> Option<&Round> {
        self.round.current()
    }

    pub fn round_state(&self) -> &RoundState {
        &self.round
    }

    pub fn clock(&self) -> &ClockState {
        &self.clock
    }

    /// The ranked leaderboard under the current sort key.
    pub fn leaderboard(&self) -> Vec<ParticipantStat> {
        self.stats.ranked(self.sort_key, self.config.tie_break)
    }

    pub fn stats_book(&self) -> &StatsBook {
        &self.stats
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn is_verified(&self) -> bool {
        self.proof.is_some()
    }

    /// Counters for metrics.
    pub fn stats(&self) -> EngineStats {
        self.counters
    }

    /// Number of outstanding round queries.
    pub fn queries_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Reconciliation
    // ═══════════════════════════════════════════════════════════════════════

    /// Issue a query unless an outstanding one already covers the key.
    fn query(&mut self, key: QueryKey) -> Vec<Action> {
        if self.is_covered(key) {
            self.counters.triggers_coalesced += 1;
            trace!(?key, "Query already in flight, dropping trigger");
            return vec![];
        }
        self.in_flight.insert(key);
        self.counters.queries_issued += 1;
        self.last_query_at = Some(self.now);
        debug!(?key, "Querying current round");
        vec![Action::QueryRound { key }]
    }

    /// Whether an outstanding query answers for `key`.
    ///
    /// A `Current` query answers for whichever round the ledger holds, so it
    /// covers any round trigger, and a query for the newest known round
    /// covers `Current`. A `Current` answer that turns out older than the
    /// newest round is followed up in [`Self::on_round_queried`].
    fn is_covered(&self, key: QueryKey) -> bool {
        if self.in_flight.contains(&key) {
            return true;
        }
        match key {
            QueryKey::Round(_) => self.in_flight.contains(&QueryKey::Current),
            QueryKey::Current => self
                .round
                .high_water()
                .is_some_and(|hw| self.in_flight.contains(&QueryKey::Round(hw))),
        }
    }

    /// The key a refresh for the tracked round uses.
    fn tracked_key(&self) -> QueryKey {
        self.round
            .high_water()
            .map(QueryKey::Round)
            .unwrap_or(QueryKey::Current)
    }

    /// Whether the tracked round still needs an authoritative answer.
    fn is_unresolved(&self) -> bool {
        if self.round.high_water().is_none() {
            return self.last_query_failed;
        }
        let revealed = self.round.phase() == Some(Phase::Revealed);
        self.round.awaiting_content()
            || self.last_query_failed
            || (self.clock.is_expired() && !revealed)
    }

    fn deadline_passed(&self) -> bool {
        let now = self.now.as_secs();
        self.clock.is_expired() || self.round.current().is_some_and(|r| now >= r.deadline())
    }

    fn on_clock_tick(&mut self) -> Vec<Action> {
        let mut actions = vec![Action::SetTimer {
            id: TimerId::ClockTick,
            duration: self.config.tick_interval,
        }];
        let clock_actions = self
            .clock
            .try_handle(&Event::ClockTick)
            .unwrap_or_default();
        // An expiring tick leaves the query to the DeadlineExpired handler.
        let expiring = clock_actions
            .iter()
            .any(|a| matches!(a, Action::EnqueueInternal { .. }));
        actions.extend(clock_actions);

        if !expiring && self.is_unresolved() && self.is_due(self.last_query_at) {
            let key = self.tracked_key();
            trace!(?key, "Refreshing unresolved round");
            actions.extend(self.query(key));
        }
        if self.stats_failed && self.is_due(self.last_stats_at) {
            trace!("Retrying failed stats fetch");
            actions.extend(self.fetch_stats());
        }
        actions
    }

    /// At least one refresh interval has passed since `last`.
    fn is_due(&self, last: Option<Duration>) -> bool {
        last.map_or(true, |at| {
            self.now.saturating_sub(at) >= self.config.refresh_interval
        })
    }

    fn on_round_started(&mut self, round_id: RoundId, deadline: u64) -> Vec<Action> {
        let mut actions = vec![];
        match self.round.announce(round_id) {
            Announcement::Stale { current } => {
                self.counters.stale_responses += 1;
                trace!(received = %round_id, current = %current, "Ignoring stale RoundStarted");
                return actions;
            }
            Announcement::Current => {
                self.clock.arm(round_id, deadline);
            }
            Announcement::New { previous } => {
                info!(round = %round_id, previous = ?previous, deadline, "Round started");
                self.clock.arm(round_id, deadline);
                self.last_query_failed = false;
                if previous.is_some() {
                    actions.push(Action::notify(Notification::RoundCleared { round_id }));
                }
            }
        }
        actions.extend(self.query(QueryKey::Round(round_id)));
        actions
    }

    fn on_answer_revealed(&mut self, round_id: RoundId, correct_digest: &Digest) -> Vec<Action> {
        let displayed = self.round.current_id();
        let outcome = match self.round.apply_reveal(round_id, correct_digest) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.counters.stale_responses += 1;
                trace!(error = %err, "Ignoring stale AnswerRevealed");
                return vec![];
            }
        };

        let mut actions = vec![];
        match outcome {
            RevealOutcome::Revealed { correct } => {
                info!(round = %round_id, correct, "Answer revealed");
                actions.extend(self.publish_round());
                actions.extend(self.after_reveal(round_id));
            }
            RevealOutcome::NotLoaded if displayed.is_some() && self.round.current().is_none() => {
                // The reveal named a round newer than the displayed one.
                self.clock.disarm();
                actions.push(Action::notify(Notification::RoundCleared { round_id }));
            }
            RevealOutcome::AlreadyRevealed | RevealOutcome::Unmatched | RevealOutcome::NotLoaded => {}
        }
        actions.extend(self.query(QueryKey::Round(round_id)));
        actions
    }

    fn on_deadline_expired(&mut self, round_id: RoundId) -> Vec<Action> {
        if self.round.high_water() != Some(round_id) {
            trace!(round = %round_id, "Ignoring expiry for superseded round");
            return vec![];
        }
        if self.round.phase() == Some(Phase::Revealed) {
            return vec![];
        }
        debug!(round = %round_id, "Deadline expired without reveal, re-querying");
        self.query(QueryKey::Round(round_id))
    }

    fn on_round_queried(&mut self, key: QueryKey, result: Result<Round, EngineError>) -> Vec<Action> {
        self.in_flight.remove(&key);

        let round = match result {
            Ok(round) => round,
            Err(err) => {
                self.counters.query_failures += 1;
                self.last_query_failed = true;
                warn!(?key, error = %err, "Round query failed");
                if key == QueryKey::Current {
                    return vec![Action::notify(Notification::ActionRejected(err))];
                }
                return vec![];
            }
        };

        let round_id = round.round_id();
        let deadline = round.deadline();
        match self.round.apply_query(round) {
            Err(err) => {
                self.counters.stale_responses += 1;
                self.last_query_failed = true;
                trace!(?key, error = %err, "Discarding stale round response");
                if key == QueryKey::Current {
                    // Round triggers were folded into this query.
                    let key = self.tracked_key();
                    return self.query(key);
                }
                vec![]
            }
            Ok(outcome) => {
                self.last_query_failed = false;
                match outcome {
                    ApplyOutcome::Adopted => {
                        info!(round = %round_id, "Round loaded");
                        self.clock.arm(round_id, deadline);
                        let mut actions = self.publish_round();
                        if self.round.phase() == Some(Phase::Revealed) {
                            actions.extend(self.after_reveal(round_id));
                        }
                        actions
                    }
                    ApplyOutcome::Advanced => {
                        debug!(round = %round_id, phase = ?self.round.phase(), "Round advanced");
                        let mut actions = self.publish_round();
                        if self.round.phase() == Some(Phase::Revealed) {
                            actions.extend(self.after_reveal(round_id));
                        }
                        actions
                    }
                    ApplyOutcome::Unchanged => vec![],
                }
            }
        }
    }

    fn publish_round(&self) -> Vec<Action> {
        self.round
            .current()
            .map(|r| Action::notify(Notification::RoundUpdated(r.clone())))
            .into_iter()
            .collect()
    }

    /// A reveal was observed: scores changed, refresh stats once per round.
    fn after_reveal(&mut self, round_id: RoundId) -> Vec<Action> {
        if self.stats_after_reveal == Some(round_id) {
            return vec![];
        }
        self.stats_after_reveal = Some(round_id);
        self.fetch_stats()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Participant actions
    // ═══════════════════════════════════════════════════════════════════════

    fn on_startup(&mut self) -> Vec<Action> {
        let mut actions = self.query(QueryKey::Current);
        actions.extend(self.fetch_stats());
        actions
    }

    fn on_verify_requested(&mut self, params: &VerifyParams) -> Vec<Action> {
        if self.verifying {
            trace!("Verification already in progress");
            return vec![];
        }
        self.verifying = true;
        debug!(title = %params.title, "Requesting identity verification");
        vec![Action::VerifyIdentity {
            params: params.clone(),
        }]
    }

    fn on_identity_verified(&mut self, result: Result<ProofToken, EngineError>) -> Vec<Action> {
        self.verifying = false;
        match result {
            Ok(token) => {
                info!("Identity verified");
                self.proof = Some(token);
                vec![Action::notify(Notification::Verified)]
            }
            Err(err) => {
                warn!(error = %err, "Identity verification failed");
                self.proof = None;
                let err = if matches!(err, EngineError::VerificationFailed { .. }) {
                    err
                } else {
                    EngineError::verification_failed(err.to_string())
                };
                vec![Action::notify(Notification::ActionRejected(err))]
            }
        }
    }

    fn on_option_selected(&mut self, index: usize) -> Vec<Action> {
        match self.round.select_option(index) {
            Ok(()) => {
                trace!(index, "Option selected");
                vec![]
            }
            Err(err) => reject(err),
        }
    }

    fn on_submit_requested(&mut self) -> Vec<Action> {
        if self.proof.is_none() {
            return reject(EngineError::verification_failed(
                "identity not verified this session",
            ));
        }
        match self.round.prepare_submission(self.deadline_passed()) {
            Ok((round_id, digest)) => {
                debug!(round = %round_id, digest = ?digest, "Submitting commitment");
                vec![Action::SubmitCommitment { round_id, digest }]
            }
            Err(err) => reject(err),
        }
    }

    fn on_commitment_submitted(
        &mut self,
        round_id: RoundId,
        digest: Digest,
        result: Result<(), EngineError>,
    ) -> Vec<Action> {
        if let Err(err) = result {
            self.counters.submissions_failed += 1;
            let was_current = self.round.fail_submission(round_id);
            warn!(round = %round_id, error = %err, "Commitment submission failed");
            if !was_current {
                return vec![];
            }
            return reject(err);
        }

        match self.round.confirm_submission(round_id, digest) {
            Ok(commitment) => {
                self.counters.submissions_accepted += 1;
                info!(round = %round_id, digest = %commitment.digest, "Commitment accepted");
                let mut actions = vec![Action::notify(Notification::CommitmentAccepted {
                    round_id,
                    digest: commitment.digest,
                })];
                actions.extend(self.publish_round());
                actions
            }
            Err(err @ EngineError::StaleResponse { .. }) => {
                self.counters.stale_responses += 1;
                trace!(error = %err, "Commitment confirmed for superseded round");
                vec![]
            }
            Err(err) => {
                warn!(round = %round_id, error = %err, "Duplicate commitment rejected");
                reject(err)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Leaderboard
    // ═══════════════════════════════════════════════════════════════════════

    fn fetch_stats(&mut self) -> Vec<Action> {
        if self.stats_in_flight {
            trace!("Stats fetch already in flight");
            return vec![];
        }
        self.stats_in_flight = true;
        self.last_stats_at = Some(self.now);
        vec![Action::FetchStats]
    }

    fn on_stats_fetched(&mut self, result: Result<Vec<ParticipantStat>, EngineError>) -> Vec<Action> {
        self.stats_in_flight = false;
        match result {
            Ok(batch) => {
                self.stats_failed = false;
                let first = !self.stats_loaded;
                self.stats_loaded = true;
                let report = self.stats.merge(batch);
                if report.rejected > 0 {
                    warn!(rejected = report.rejected, "Stats batch contained inconsistent records");
                }
                if report.changed() || first {
                    vec![self.publish_leaderboard()]
                } else {
                    trace!("Stats unchanged");
                    vec![]
                }
            }
            Err(err) => {
                self.stats_failed = true;
                warn!(error = %err, "Stats fetch failed, retrying on refresh");
                vec![]
            }
        }
    }

    fn on_sort_key_changed(&mut self, key: SortKey) -> Vec<Action> {
        self.sort_key = key;
        vec![self.publish_leaderboard()]
    }

    fn publish_leaderboard(&self) -> Action {
        Action::notify(Notification::LeaderboardUpdated(self.leaderboard()))
    }
}

fn reject(err: EngineError) -> Vec<Action> {
    debug!(error = %err, "Action rejected");
    vec![Action::notify(Notification::ActionRejected(err))]
}

impl StateMachine for EngineStateMachine {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::ClockTick => self.on_clock_tick(),

            Event::RoundStarted {
                round_id,
                content_hash,
                deadline,
            } => {
                trace!(round = %round_id, content = %content_hash.0, "RoundStarted received");
                self.on_round_started(round_id, deadline)
            }
            Event::AnswerRevealed {
                round_id,
                correct_digest,
            } => self.on_answer_revealed(round_id, &correct_digest),
            Event::DeadlineExpired { round_id } => self.on_deadline_expired(round_id),

            Event::StartupRequested => self.on_startup(),
            Event::VerifyRequested { params } => self.on_verify_requested(&params),
            Event::OptionSelected { index } => self.on_option_selected(index),
            Event::SubmitRequested => self.on_submit_requested(),
            Event::SortKeyChanged { key } => self.on_sort_key_changed(key),
            Event::StatsRefreshRequested => self.fetch_stats(),

            Event::RoundQueried { key, result } => self.on_round_queried(key, result),
            Event::CommitmentSubmitted {
                round_id,
                digest,
                result,
            } => self.on_commitment_submitted(round_id, digest, result),
            Event::IdentityVerified { result } => self.on_identity_verified(result),
            Event::StatsFetched { result } => self.on_stats_fetched(result),
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
        self.clock.set_time(now);
    }

    fn now(&self) -> Duration {
        self.now
    }
}
