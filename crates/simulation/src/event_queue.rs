//! Deterministic event ordering.

use std::time::Duration;
use trivia_core::{Event, EventPriority};

/// Key for the simulation event queue.
///
/// Events are ordered by time, then priority, then insertion sequence, so
/// two runs with the same seed process the same events in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey {
    pub time: Duration,
    pub priority: EventPriority,
    pub sequence: u64,
}

impl EventKey {
    pub fn new(time: Duration, event: &Event, sequence: u64) -> Self {
        Self {
            time,
            priority: event.priority(),
            sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trivia_types::RoundId;

    #[test]
    fn test_priority_breaks_time_ties() {
        let t = Duration::from_secs(1);
        let tick = EventKey::new(t, &Event::ClockTick, 1);
        let expired = EventKey::new(
            t,
            &Event::DeadlineExpired {
                round_id: RoundId(1),
            },
            2,
        );
        let submit = EventKey::new(t, &Event::SubmitRequested, 0);

        assert!(expired < tick);
        assert!(tick < submit);
        assert!(EventKey::new(Duration::ZERO, &Event::SubmitRequested, 9) < expired);
    }
}
