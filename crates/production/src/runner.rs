//! Production runner implementation.

use crate::config::{ConfigError, EngineConfig};
use crate::context::EngineContext;
use crate::metrics;
use crate::timers::TimerManager;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, instrument, span, trace, Level};
use trivia_core::{Action, Event, Notification, SortKey, StateMachine};
use trivia_engine::{EngineStateMachine, EngineStats};
use trivia_types::{ContentHash, Digest, EngineError, ParticipantId, RoundId, VerifyParams};

/// Errors from the production runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Event channel closed")]
    ChannelClosed,
    #[error("Engine context was torn down")]
    ContextTornDown,
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Handle for shutting down a running ProductionRunner.
///
/// When dropped, signals the runner to exit gracefully.
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: Option<oneshot::Sender<()>>,
}

impl ShutdownHandle {
    /// Trigger shutdown (consumes the handle).
    pub fn shutdown(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for ShutdownHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Feeds ledger notifications into the runner.
///
/// Whatever listens to the ledger's `RoundStarted` / `AnswerRevealed`
/// subscriptions calls these methods; the events join the same queue as
/// every other trigger.
#[derive(Debug, Clone)]
pub struct LedgerSink {
    tx: mpsc::Sender<Event>,
}

impl LedgerSink {
    pub async fn round_started(
        &self,
        round_id: RoundId,
        content_hash: ContentHash,
        deadline: u64,
    ) -> Result<(), RunnerError> {
        self.send(Event::RoundStarted {
            round_id,
            content_hash,
            deadline,
        })
        .await
    }

    pub async fn answer_revealed(
        &self,
        round_id: RoundId,
        correct_digest: Digest,
    ) -> Result<(), RunnerError> {
        self.send(Event::AnswerRevealed {
            round_id,
            correct_digest,
        })
        .await
    }

    async fn send(&self, event: Event) -> Result<(), RunnerError> {
        self.tx.send(event).await.map_err(|_| RunnerError::ChannelClosed)
    }
}

/// The presentation layer's view of a running engine.
///
/// Participant actions are queued as client events; their outcomes arrive
/// as [`Notification`]s on [`EngineHandle::subscribe`].
#[derive(Debug, Clone)]
pub struct EngineHandle {
    client_tx: mpsc::Sender<Event>,
    notifications: broadcast::Sender<Notification>,
}

impl EngineHandle {
    /// Subscribe to notifications published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub async fn verify(&self, params: VerifyParams) -> Result<(), RunnerError> {
        self.send(Event::VerifyRequested { params }).await
    }

    pub async fn select_option(&self, index: usize) -> Result<(), RunnerError> {
        self.send(Event::OptionSelected { index }).await
    }

    pub async fn submit(&self) -> Result<(), RunnerError> {
        self.send(Event::SubmitRequested).await
    }

    pub async fn set_sort_key(&self, key: SortKey) -> Result<(), RunnerError> {
        self.send(Event::SortKeyChanged { key }).await
    }

    pub async fn refresh_stats(&self) -> Result<(), RunnerError> {
        self.send(Event::StatsRefreshRequested).await
    }

    /// Re-fetch the current round, as at startup.
    pub async fn refresh(&self) -> Result<(), RunnerError> {
        self.send(Event::StartupRequested).await
    }

    async fn send(&self, event: Event) -> Result<(), RunnerError> {
        self.client_tx
            .send(event)
            .await
            .map_err(|_| RunnerError::ChannelClosed)
    }
}

/// Builder for constructing a [`ProductionRunner`].
///
/// Required fields:
/// - `participant` - The local participant's address
/// - `context` - External capabilities
///
/// Optional fields:
/// - `config` - Engine configuration (defaults to [`EngineConfig::default`])
#[derive(Debug, Default)]
pub struct ProductionRunnerBuilder {
    participant: Option<ParticipantId>,
    context: Option<Arc<EngineContext>>,
    config: EngineConfig,
}

impl ProductionRunnerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn participant(mut self, participant: ParticipantId) -> Self {
        self.participant = Some(participant);
        self
    }

    pub fn context(mut self, context: Arc<EngineContext>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ProductionRunner, RunnerError> {
        let participant = self
            .participant
            .ok_or(RunnerError::MissingField("participant"))?;
        let context = self.context.ok_or(RunnerError::MissingField("context"))?;
        self.config.validate()?;

        let capacity = self.config.runner.channel_capacity;

        // Separate channels per event priority:
        // - callback: results of delegated calls and internal events, never blocks
        // - timer: clock ticks, small dedicated channel
        // - ledger: pushed ledger notifications
        // - client: participant actions
        let (callback_tx, callback_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::channel(16);
        let (ledger_tx, ledger_rx) = mpsc::channel(capacity);
        let (client_tx, client_rx) = mpsc::channel(capacity);
        let (notifications, _) = broadcast::channel(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let state = EngineStateMachine::new(participant, self.config.controller_config());

        Ok(ProductionRunner {
            callback_rx,
            callback_tx,
            timer_rx,
            ledger_rx,
            ledger_tx,
            client_rx,
            client_tx,
            notifications,
            state,
            context,
            timer_manager: TimerManager::new(timer_tx),
            request_timeout: self.config.request_timeout(),
            last_stats: EngineStats::default(),
            shutdown_rx,
            shutdown_tx: Some(shutdown_tx),
        })
    }
}

/// Production runner.
///
/// A single task owns the state machine and receives events over channels,
/// so there is exactly one writer and no lock. Delegated calls run as
/// spawned tasks and report back on the callback channel.
pub struct ProductionRunner {
    /// Receives internal events and callbacks of delegated calls.
    callback_rx: mpsc::UnboundedReceiver<Event>,
    /// Clone this to report results from spawned tasks.
    callback_tx: mpsc::UnboundedSender<Event>,
    /// Receives clock ticks.
    timer_rx: mpsc::Receiver<Event>,
    /// Receives ledger notifications.
    ledger_rx: mpsc::Receiver<Event>,
    ledger_tx: mpsc::Sender<Event>,
    /// Receives participant actions.
    client_rx: mpsc::Receiver<Event>,
    client_tx: mpsc::Sender<Event>,
    /// Outbound notifications.
    notifications: broadcast::Sender<Notification>,
    /// The state machine (owned, not shared).
    state: EngineStateMachine,
    context: Arc<EngineContext>,
    timer_manager: TimerManager,
    /// Bound on every delegated call.
    request_timeout: Duration,
    /// Engine counters at the last metrics update.
    last_stats: EngineStats,
    shutdown_rx: oneshot::Receiver<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

/// Wall-clock time since the UNIX epoch.
fn wall_clock() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

impl ProductionRunner {
    pub fn builder() -> ProductionRunnerBuilder {
        ProductionRunnerBuilder::new()
    }

    /// Handle for the presentation layer.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            client_tx: self.client_tx.clone(),
            notifications: self.notifications.clone(),
        }
    }

    /// Sink for ledger notifications.
    pub fn ledger_sink(&self) -> LedgerSink {
        LedgerSink {
            tx: self.ledger_tx.clone(),
        }
    }

    /// Take the shutdown handle.
    ///
    /// Returns a handle that when dropped triggers graceful shutdown.
    /// Can only be called once; subsequent calls return None.
    pub fn shutdown_handle(&mut self) -> Option<ShutdownHandle> {
        self.shutdown_tx
            .take()
            .map(|tx| ShutdownHandle { tx: Some(tx) })
    }

    pub fn state(&self) -> &EngineStateMachine {
        &self.state
    }

    /// Run the main event loop until shutdown.
    ///
    /// Opens the context, starts the clock and fetches the current state,
    /// then processes events in priority order: callbacks, timers, ledger
    /// notifications, participant actions. Tears the context down on exit.
    pub async fn run(mut self) -> Result<(), RunnerError> {
        self.context.init()?;
        info!(
            participant = %self.state.round_state().participant(),
            request_timeout_ms = self.request_timeout.as_millis() as u64,
            "Starting production runner"
        );

        self.state.set_time(wall_clock());
        for action in self.state.initialize() {
            self.process_action(action);
        }
        self.dispatch(Event::StartupRequested);

        loop {
            tokio::select! {
                biased;

                _ = &mut self.shutdown_rx => {
                    info!("Shutdown signal received");
                    break;
                }

                Some(event) = self.callback_rx.recv() => self.dispatch(event),
                Some(event) = self.timer_rx.recv() => self.dispatch(event),
                Some(event) = self.ledger_rx.recv() => self.dispatch(event),
                Some(event) = self.client_rx.recv() => self.dispatch(event),
            }
        }

        self.timer_manager.disarm_all();
        self.context.teardown();
        info!("Production runner stopped");
        Ok(())
    }

    /// Feed one event through the state machine and execute its actions.
    fn dispatch(&mut self, event: Event) {
        let event_type = event.type_name();
        let event_span = span!(
            Level::INFO,
            "handle_event",
            event.type = %event_type,
            priority = ?event.priority(),
        );
        let _event_guard = event_span.enter();

        self.state.set_time(wall_clock());
        let actions = self.state.handle(event);

        let stats = self.state.stats();
        metrics::record_engine_stats(&self.last_stats, &stats);
        self.last_stats = stats;

        for action in actions {
            self.process_action(action);
        }
    }

    #[instrument(level = "trace", skip_all, fields(action.type = %action.type_name()))]
    fn process_action(&mut self, action: Action) {
        match action {
            Action::SetTimer { id, duration } => {
                self.timer_manager.arm(id, duration);
            }

            Action::EnqueueInternal { event } => {
                // The receiver lives as long as the runner.
                let _ = self.callback_tx.send(event);
            }

            Action::QueryRound { key } => {
                let context = self.context.clone();
                let event_tx = self.callback_tx.clone();
                let timeout = self.request_timeout;
                tokio::spawn(async move {
                    let result = tokio::time::timeout(timeout, context.query_round())
                        .await
                        .unwrap_or_else(|_| {
                            Err(EngineError::unavailable(format!(
                                "round query timed out after {timeout:?}"
                            )))
                        });
                    let _ = event_tx.send(Event::RoundQueried { key, result });
                });
            }

            Action::SubmitCommitment { round_id, digest } => {
                let context = self.context.clone();
                let event_tx = self.callback_tx.clone();
                let timeout = self.request_timeout;
                tokio::spawn(async move {
                    let result =
                        tokio::time::timeout(timeout, context.submit_commitment(round_id, digest))
                            .await
                            .unwrap_or_else(|_| {
                                Err(EngineError::submission_failed(format!(
                                    "submission timed out after {timeout:?}"
                                )))
                            });
                    let _ = event_tx.send(Event::CommitmentSubmitted {
                        round_id,
                        digest,
                        result,
                    });
                });
            }

            Action::VerifyIdentity { params } => {
                let context = self.context.clone();
                let event_tx = self.callback_tx.clone();
                let timeout = self.request_timeout;
                tokio::spawn(async move {
                    let result = tokio::time::timeout(timeout, context.verify(&params))
                        .await
                        .unwrap_or_else(|_| {
                            Err(EngineError::verification_failed(format!(
                                "verification timed out after {timeout:?}"
                            )))
                        });
                    let _ = event_tx.send(Event::IdentityVerified { result });
                });
            }

            Action::FetchStats => {
                let context = self.context.clone();
                let event_tx = self.callback_tx.clone();
                let timeout = self.request_timeout;
                tokio::spawn(async move {
                    let result = tokio::time::timeout(timeout, context.fetch_stats())
                        .await
                        .unwrap_or_else(|_| {
                            Err(EngineError::unavailable(format!(
                                "stats fetch timed out after {timeout:?}"
                            )))
                        });
                    let _ = event_tx.send(Event::StatsFetched { result });
                });
            }

            Action::Notify { notification } => self.publish(notification),
        }
    }

    fn publish(&self, notification: Notification) {
        match &notification {
            Notification::ClockUpdated { remaining, .. } => {
                metrics::set_remaining_seconds(*remaining);
            }
            Notification::RoundUpdated(round) => {
                metrics::set_current_round(round.round_id().0);
            }
            Notification::ActionRejected(err) => {
                debug!(error = %err, kind = err.kind(), "Publishing rejection");
            }
            _ => {}
        }
        if self.notifications.send(notification).is_err() {
            trace!("No notification subscribers");
        }
    }
}
