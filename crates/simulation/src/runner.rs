//! Deterministic simulation runner.
//!
//! Drives one engine against a [`SimulatedLedger`] in simulated time. When
//! the engine emits a delegated action the runner answers it from the
//! ledger and schedules the callback after a sampled latency.

use crate::event_queue::EventKey;
use crate::ledger::{LedgerConfig, SimulatedLedger};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info, trace};
use trivia_core::{Action, Event, Notification, SortKey, StateMachine, TimerId};
use trivia_engine::{ControllerConfig, EngineStateMachine};
use trivia_types::{
    EngineError, ParticipantId, Phase, ProofToken, RoundContent, RoundId, VerifyParams,
};

/// Simulated wall-clock time at which every run starts.
///
/// Deadlines are absolute epoch seconds, so simulated time starts at a
/// realistic instant rather than zero.
pub const SIM_EPOCH: Duration = Duration::from_secs(1_700_000_000);

/// Statistics collected during simulation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimulationStats {
    /// Total events processed.
    pub events_processed: u64,
    /// Events processed by priority.
    pub events_by_priority: [u64; 4],
    /// Total actions generated.
    pub actions_generated: u64,
    /// Round queries answered by the ledger.
    pub round_queries: u64,
    /// Round queries failed by fault injection.
    pub query_failures_injected: u64,
    /// Commitment submissions sent to the ledger.
    pub submissions: u64,
    /// Identity verifications requested.
    pub verifications: u64,
    /// Stats fetches answered.
    pub stats_fetches: u64,
    /// Reveal notifications dropped by fault injection.
    pub reveals_dropped: u64,
    /// Timers set.
    pub timers_set: u64,
}

/// Deterministic simulation runner.
///
/// Processes events in deterministic order and executes actions.
/// Given the same seed, produces identical results every run.
pub struct SimulationRunner {
    /// The engine under test.
    engine: EngineStateMachine,

    /// The ledger it talks to.
    ledger: SimulatedLedger,

    /// Global event queue, ordered deterministically.
    event_queue: BTreeMap<EventKey, Event>,

    /// Sequence counter for deterministic ordering.
    sequence: u64,

    /// Current simulation time.
    now: Duration,

    /// RNG for latency and faults (seeded for determinism).
    rng: ChaCha8Rng,

    /// Pending timer events, so re-arming replaces them.
    timers: HashMap<TimerId, EventKey>,

    /// Every notification the engine published, with its time.
    notifications: Vec<(Duration, Notification)>,

    /// Last phase the engine published for each round.
    observed_phases: BTreeMap<RoundId, Phase>,

    stats: SimulationStats,
}

impl SimulationRunner {
    /// Create a runner for `participant` with default engine settings.
    pub fn new(participant: ParticipantId, ledger_config: LedgerConfig, seed: u64) -> Self {
        Self::with_config(participant, ControllerConfig::default(), ledger_config, seed)
    }

    pub fn with_config(
        participant: ParticipantId,
        config: ControllerConfig,
        ledger_config: LedgerConfig,
        seed: u64,
    ) -> Self {
        info!(participant = %participant.short(), seed, "Created simulation runner");
        Self {
            engine: EngineStateMachine::new(participant, config),
            ledger: SimulatedLedger::new(ledger_config),
            event_queue: BTreeMap::new(),
            sequence: 0,
            now: SIM_EPOCH,
            rng: ChaCha8Rng::seed_from_u64(seed),
            timers: HashMap::new(),
            notifications: Vec::new(),
            observed_phases: BTreeMap::new(),
            stats: SimulationStats::default(),
        }
    }

    // ─── Accessors ───

    pub fn engine(&self) -> &EngineStateMachine {
        &self.engine
    }

    pub fn ledger(&self) -> &SimulatedLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut SimulatedLedger {
        &mut self.ledger
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Get current simulation time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Current simulation time in whole epoch seconds.
    pub fn now_secs(&self) -> u64 {
        self.now.as_secs()
    }

    /// Time elapsed since [`SIM_EPOCH`].
    pub fn elapsed(&self) -> Duration {
        self.now.saturating_sub(SIM_EPOCH)
    }

    pub fn notifications(&self) -> &[(Duration, Notification)] {
        &self.notifications
    }

    /// Last phase the engine published for a round.
    pub fn observed_phase(&self, round_id: RoundId) -> Option<Phase> {
        self.observed_phases.get(&round_id).copied()
    }

    pub fn observed_phases(&self) -> &BTreeMap<RoundId, Phase> {
        &self.observed_phases
    }

    /// Rejections published so far, oldest first.
    pub fn rejections(&self) -> Vec<&EngineError> {
        self.notifications
            .iter()
            .filter_map(|(_, n)| match n {
                Notification::ActionRejected(err) => Some(err),
                _ => None,
            })
            .collect()
    }

    /// The most recently published leaderboard.
    pub fn last_leaderboard(&self) -> Option<&[trivia_types::ParticipantStat]> {
        self.notifications.iter().rev().find_map(|(_, n)| match n {
            Notification::LeaderboardUpdated(ranked) => Some(ranked.as_slice()),
            _ => None,
        })
    }

    // ─── Scripting ───

    /// Start the engine clock and request the current state.
    pub fn initialize(&mut self) {
        self.engine.set_time(self.now);
        for action in self.engine.initialize() {
            self.process_action(action);
        }
        self.schedule_event(self.now, Event::StartupRequested);
    }

    /// Start a round on the ledger and push `RoundStarted` to the engine.
    pub fn start_round(
        &mut self,
        content: RoundContent,
        duration_secs: u64,
        correct_index: usize,
    ) -> Result<RoundId, EngineError> {
        let deadline = self.now_secs() + duration_secs;
        let (round_id, content_hash) =
            self.ledger
                .start_round(content, deadline, correct_index)?;
        self.notify(Event::RoundStarted {
            round_id,
            content_hash,
            deadline,
        });
        Ok(round_id)
    }

    /// Reveal a round on the ledger and push `AnswerRevealed`, unless fault
    /// injection drops the notification.
    pub fn reveal_round(&mut self, round_id: RoundId) -> bool {
        let Some(correct_digest) = self.ledger.reveal(round_id) else {
            return false;
        };
        if self.ledger.should_drop_reveal(&mut self.rng) {
            self.stats.reveals_dropped += 1;
            debug!(round = %round_id, "Reveal notification dropped");
            return true;
        }
        self.notify(Event::AnswerRevealed {
            round_id,
            correct_digest,
        });
        true
    }

    /// Deliver a ledger notification after the sampled notification latency.
    pub fn notify(&mut self, event: Event) {
        let latency = self.ledger.sample_notification_latency(&mut self.rng);
        self.schedule_event(self.now + latency, event);
    }

    /// Deliver a participant action now.
    pub fn client(&mut self, event: Event) {
        self.schedule_event(self.now, event);
    }

    pub fn verify(&mut self) {
        self.client(Event::VerifyRequested {
            params: VerifyParams::default(),
        });
    }

    pub fn select_option(&mut self, index: usize) {
        self.client(Event::OptionSelected { index });
    }

    pub fn submit(&mut self) {
        self.client(Event::SubmitRequested);
    }

    pub fn set_sort_key(&mut self, key: SortKey) {
        self.client(Event::SortKeyChanged { key });
    }

    // ─── Event Loop ───

    /// Run for `duration` of simulated time.
    pub fn run_for(&mut self, duration: Duration) {
        let end = self.now + duration;
        self.run_until(end);
    }

    /// Run simulation until no more events or time limit reached.
    pub fn run_until(&mut self, end_time: Duration) {
        trace!(
            end_time_secs = end_time.as_secs_f64(),
            "Running simulation step"
        );

        while let Some((key, event)) = self.event_queue.pop_first() {
            if key.time > end_time {
                self.event_queue.insert(key, event);
                break;
            }
            self.now = key.time;
            trace!(time = ?self.now, event = event.type_name(), "Processing event");

            self.stats.events_processed += 1;
            self.stats.events_by_priority[event.priority() as usize] += 1;

            if matches!(event, Event::ClockTick) {
                self.timers.remove(&TimerId::ClockTick);
            }

            self.engine.set_time(self.now);
            let actions = self.engine.handle(event);
            self.stats.actions_generated += actions.len() as u64;

            for action in actions {
                self.process_action(action);
            }
        }

        if self.now < end_time {
            self.now = end_time;
        }
    }

    /// Process an action from the engine.
    fn process_action(&mut self, action: Action) {
        match action {
            Action::SetTimer { id, duration } => {
                if let Some(old) = self.timers.remove(&id) {
                    self.event_queue.remove(&old);
                }
                let key = self.schedule_event(self.now + duration, timer_event(id));
                self.timers.insert(id, key);
                self.stats.timers_set += 1;
            }

            Action::EnqueueInternal { event } => {
                self.schedule_event(self.now, event);
            }

            // Delegated calls: answer from the ledger now, deliver the
            // callback after the sampled latency.
            Action::QueryRound { key } => {
                self.stats.round_queries += 1;
                let result = if self.ledger.should_fail_query(&mut self.rng) {
                    self.stats.query_failures_injected += 1;
                    Err(EngineError::unavailable("injected query failure"))
                } else {
                    self.ledger
                        .query_round(self.engine.round_state().participant())
                };
                self.schedule_callback(Event::RoundQueried { key, result });
            }

            Action::SubmitCommitment { round_id, digest } => {
                self.stats.submissions += 1;
                let participant = self.engine.round_state().participant().clone();
                let now = self.now_secs();
                let result = self.ledger.submit(round_id, &participant, digest, now);
                self.schedule_callback(Event::CommitmentSubmitted {
                    round_id,
                    digest,
                    result,
                });
            }

            Action::VerifyIdentity { .. } => {
                self.stats.verifications += 1;
                let result = if self.ledger.config().verify_ok {
                    Ok(ProofToken(format!(
                        "sim-proof-{}",
                        self.engine.round_state().participant().short()
                    )))
                } else {
                    Err(EngineError::verification_failed("prover rejected"))
                };
                self.schedule_callback(Event::IdentityVerified { result });
            }

            Action::FetchStats => {
                self.stats.stats_fetches += 1;
                let result = Ok(self.ledger.stats());
                self.schedule_callback(Event::StatsFetched { result });
            }

            Action::Notify { notification } => {
                if let Notification::RoundUpdated(round) = &notification {
                    self.observed_phases.insert(round.round_id(), round.phase());
                }
                self.notifications.push((self.now, notification));
            }
        }
    }

    fn schedule_callback(&mut self, event: Event) {
        let latency = self.ledger.sample_call_latency(&mut self.rng);
        self.schedule_event(self.now + latency, event);
    }

    fn schedule_event(&mut self, time: Duration, event: Event) -> EventKey {
        self.sequence += 1;
        let key = EventKey::new(time, &event, self.sequence);
        self.event_queue.insert(key, event);
        key
    }
}

fn timer_event(id: TimerId) -> Event {
    match id {
        TimerId::ClockTick => Event::ClockTick,
    }
}
