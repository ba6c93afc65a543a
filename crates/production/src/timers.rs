//! Tokio-backed timers for the production runner.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;
use trivia_core::{Event, TimerId};

fn timer_event(id: TimerId) -> Event {
    match id {
        TimerId::ClockTick => Event::ClockTick,
    }
}

struct Armed {
    fires_at: Instant,
    task: JoinHandle<()>,
}

/// Turns `Action::SetTimer` into timer events on the runner's timer channel.
///
/// At most one timer per [`TimerId`] is pending; arming an id again replaces
/// the pending one, which is how the engine keeps its tick cadence.
pub struct TimerManager {
    armed: HashMap<TimerId, Armed>,
    timer_tx: mpsc::Sender<Event>,
}

impl TimerManager {
    pub fn new(timer_tx: mpsc::Sender<Event>) -> Self {
        Self {
            armed: HashMap::new(),
            timer_tx,
        }
    }

    /// Deliver the timer's event after `after`, replacing any pending one.
    pub fn arm(&mut self, id: TimerId, after: Duration) {
        let fires_at = Instant::now() + after;
        let timer_tx = self.timer_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(fires_at).await;
            // A closed channel means the runner is gone.
            let _ = timer_tx.send(timer_event(id)).await;
        });

        if let Some(previous) = self.armed.insert(id, Armed { fires_at, task }) {
            previous.task.abort();
        }
        trace!(?id, ?after, "Timer armed");
    }

    /// When the pending timer for `id` fires, if one is pending.
    pub fn fires_at(&self, id: TimerId) -> Option<Instant> {
        self.armed
            .get(&id)
            .filter(|armed| !armed.task.is_finished())
            .map(|armed| armed.fires_at)
    }

    /// Drop every pending timer. Used on shutdown.
    pub fn disarm_all(&mut self) {
        for (id, armed) in self.armed.drain() {
            armed.task.abort();
            trace!(?id, "Timer disarmed");
        }
    }
}

impl Drop for TimerManager {
    fn drop(&mut self) {
        self.disarm_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (TimerManager, mpsc::Receiver<Event>) {
        let (timer_tx, timer_rx) = mpsc::channel(4);
        (TimerManager::new(timer_tx), timer_rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_delivered_after_interval() {
        let (mut timers, mut rx) = manager();
        timers.arm(TimerId::ClockTick, Duration::from_secs(1));

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(rx.try_recv().is_err());

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, Event::ClockTick));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_pending_tick() {
        let (mut timers, mut rx) = manager();
        let start = Instant::now();
        timers.arm(TimerId::ClockTick, Duration::from_secs(5));
        timers.arm(TimerId::ClockTick, Duration::from_secs(1));
        assert_eq!(
            timers.fires_at(TimerId::ClockTick),
            Some(start + Duration::from_secs(1))
        );

        rx.recv().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err(), "replaced tick must not fire");
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_all_on_shutdown() {
        let (mut timers, mut rx) = manager();
        timers.arm(TimerId::ClockTick, Duration::from_secs(1));
        timers.disarm_all();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(timers.fires_at(TimerId::ClockTick), None);
    }
}
