//! ClockState sub-state machine.

use crate::{ClockReading, DeadlineClock};
use std::time::Duration;
use trivia_core::{Action, Event, Notification, SubStateMachine};
use trivia_types::RoundId;
use tracing::{debug, trace};

/// Drives the [`DeadlineClock`] for the tracked round.
///
/// Handles:
/// - `Event::ClockTick` → `Notification::ClockUpdated`, plus
///   `Event::DeadlineExpired` (internal) the first time no time remains
///
/// Does NOT handle:
/// - Re-arming the tick timer (handled by the engine)
/// - Reacting to expiry (handled by the engine's reconciliation logic)
#[derive(Debug)]
pub struct ClockState {
    clock: DeadlineClock,
    /// Round the armed deadline belongs to.
    round_id: Option<RoundId>,
    /// Current time.
    now: Duration,
}

impl ClockState {
    pub fn new(warning_threshold: u64) -> Self {
        Self {
            clock: DeadlineClock::new(warning_threshold),
            round_id: None,
            now: Duration::ZERO,
        }
    }

    /// Arm the clock for a round.
    ///
    /// Re-arming for the round already armed is a no-op: a round's deadline
    /// is fixed once set.
    pub fn arm(&mut self, round_id: RoundId, deadline: u64) {
        if self.round_id == Some(round_id) && self.clock.is_armed() {
            return;
        }
        debug!(round = %round_id, deadline, "Deadline clock armed");
        self.round_id = Some(round_id);
        self.clock.reset(deadline);
    }

    /// Disarm the clock.
    pub fn disarm(&mut self) {
        self.round_id = None;
        self.clock.clear();
    }

    /// Observe the clock at the current time and emit the resulting actions.
    pub fn tick(&mut self) -> Vec<Action> {
        let Some(round_id) = self.round_id else {
            return vec![];
        };
        let Some(reading) = self.clock.observe(self.now.as_secs()) else {
            return vec![];
        };

        let ClockReading {
            remaining,
            warning,
            expired_now,
        } = reading;

        let mut actions = vec![Action::notify(Notification::ClockUpdated { remaining, warning })];

        if expired_now {
            debug!(round = %round_id, "Deadline expired");
            actions.push(Action::EnqueueInternal {
                event: Event::DeadlineExpired { round_id },
            });
        } else {
            trace!(round = %round_id, remaining, warning, "Clock tick");
        }

        actions
    }

    pub fn round_id(&self) -> Option<RoundId> {
        self.round_id
    }

    pub fn clock(&self) -> &DeadlineClock {
        &self.clock
    }

    /// Whether the deadline of the armed round has passed.
    pub fn is_expired(&self) -> bool {
        self.clock.is_expired()
    }
}

impl SubStateMachine for ClockState {
    fn try_handle(&mut self, event: &Event) -> Option<Vec<Action>> {
        match event {
            Event::ClockTick => Some(self.tick()),
            _ => None,
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    fn expired_events(actions: &[Action]) -> Vec<RoundId> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::EnqueueInternal {
                    event: Event::DeadlineExpired { round_id },
                } => Some(*round_id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_unarmed_tick_is_silent() {
        let mut state = ClockState::new(5);
        state.set_time(Duration::from_secs(NOW));
        assert!(state.try_handle(&Event::ClockTick).unwrap().is_empty());
        assert!(state.try_handle(&Event::SubmitRequested).is_none());
    }

    #[test]
    fn test_expiry_fires_once_per_round() {
        let mut state = ClockState::new(5);
        state.arm(RoundId(7), NOW + 2);

        let mut fired = vec![];
        for t in 0..6 {
            state.set_time(Duration::from_secs(NOW + t));
            fired.extend(expired_events(&state.tick()));
        }
        assert_eq!(fired, vec![RoundId(7)]);

        // New round restarts the one-shot.
        state.arm(RoundId(8), NOW + 7);
        state.set_time(Duration::from_secs(NOW + 7));
        assert_eq!(expired_events(&state.tick()), vec![RoundId(8)]);
    }

    #[test]
    fn test_rearming_same_round_keeps_one_shot() {
        let mut state = ClockState::new(5);
        state.arm(RoundId(7), NOW);
        state.set_time(Duration::from_secs(NOW));
        assert_eq!(expired_events(&state.tick()).len(), 1);

        state.arm(RoundId(7), NOW);
        assert!(expired_events(&state.tick()).is_empty());
    }

    #[test]
    fn test_tick_notifies_remaining() {
        let mut state = ClockState::new(5);
        state.arm(RoundId(1), NOW + 4);
        state.set_time(Duration::from_secs(NOW));
        let actions = state.tick();
        assert!(matches!(
            actions.as_slice(),
            [Action::Notify {
                notification: Notification::ClockUpdated {
                    remaining: 4,
                    warning: true
                }
            }]
        ));
    }
}
