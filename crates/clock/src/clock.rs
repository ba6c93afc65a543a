//! Pure deadline clock.

/// Remaining seconds at or below which the clock reports a warning.
pub const DEFAULT_WARNING_SECS: u64 = 5;

/// `max(0, deadline - now)`.
pub fn remaining_at(deadline: u64, now: u64) -> u64 {
    deadline.saturating_sub(now)
}

/// Format seconds as `MM:SS`. Minutes are not capped at 59.
pub fn format_remaining(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Result of observing the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    /// Seconds until the deadline, never negative.
    pub remaining: u64,
    /// `remaining <= warning threshold`.
    pub warning: bool,
    /// True exactly once per armed deadline: on the first observation that
    /// finds no time remaining.
    pub expired_now: bool,
}

/// Deadline clock.
///
/// The remaining value is clamped so it never increases between
/// observations of the same deadline, even if the injected time steps
/// backwards. Re-arming with [`DeadlineClock::reset`] restarts both the
/// clamp and the one-shot expiry.
#[derive(Debug, Clone)]
pub struct DeadlineClock {
    /// Absolute deadline in seconds since the UNIX epoch.
    deadline: Option<u64>,
    /// Last observed remaining value for the current deadline.
    remaining: Option<u64>,
    warning_threshold: u64,
    expiry_fired: bool,
}

impl Default for DeadlineClock {
    fn default() -> Self {
        Self::new(DEFAULT_WARNING_SECS)
    }
}

impl DeadlineClock {
    /// Create an unarmed clock.
    pub fn new(warning_threshold: u64) -> Self {
        Self {
            deadline: None,
            remaining: None,
            warning_threshold,
            expiry_fired: false,
        }
    }

    /// Arm the clock with a new deadline.
    pub fn reset(&mut self, deadline: u64) {
        self.deadline = Some(deadline);
        self.remaining = None;
        self.expiry_fired = false;
    }

    /// Disarm the clock.
    pub fn clear(&mut self) {
        self.deadline = None;
        self.remaining = None;
        self.expiry_fired = false;
    }

    /// Recompute the remaining time at `now` (seconds since the UNIX epoch).
    ///
    /// Returns `None` when the clock is not armed.
    pub fn observe(&mut self, now: u64) -> Option<ClockReading> {
        let deadline = self.deadline?;

        let computed = remaining_at(deadline, now);
        let remaining = match self.remaining {
            Some(previous) => computed.min(previous),
            None => computed,
        };
        self.remaining = Some(remaining);

        let expired_now = remaining == 0 && !self.expiry_fired;
        if expired_now {
            self.expiry_fired = true;
        }

        Some(ClockReading {
            remaining,
            warning: remaining <= self.warning_threshold,
            expired_now,
        })
    }

    /// The armed deadline.
    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    /// Last observed remaining time.
    pub fn remaining(&self) -> Option<u64> {
        self.remaining
    }

    /// Whether the last observation was within the warning threshold.
    pub fn warning(&self) -> bool {
        self.remaining
            .map(|r| r <= self.warning_threshold)
            .unwrap_or(false)
    }

    /// Whether the expiry signal has fired for the armed deadline.
    pub fn is_expired(&self) -> bool {
        self.expiry_fired
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    #[test]
    fn test_countdown_warning_and_single_expiry() {
        let mut clock = DeadlineClock::default();
        clock.reset(NOW + 30);

        let first = clock.observe(NOW).unwrap();
        assert_eq!(first.remaining, 30);
        assert!(!first.warning);

        let mut expiries = 0;
        for t in 1..=25 {
            let r = clock.observe(NOW + t).unwrap();
            expiries += r.expired_now as u32;
        }
        assert_eq!(clock.remaining(), Some(5));
        assert!(clock.warning());
        assert_eq!(expiries, 0);

        for t in 26..=40 {
            let r = clock.observe(NOW + t).unwrap();
            expiries += r.expired_now as u32;
        }
        assert_eq!(clock.remaining(), Some(0));
        assert_eq!(expiries, 1);
        assert!(clock.is_expired());
    }

    #[test]
    fn test_reset_restarts_one_shot() {
        let mut clock = DeadlineClock::default();
        clock.reset(NOW);
        assert!(clock.observe(NOW).unwrap().expired_now);
        assert!(!clock.observe(NOW + 1).unwrap().expired_now);

        clock.reset(NOW + 10);
        assert!(!clock.is_expired());
        assert_eq!(clock.observe(NOW + 1).unwrap().remaining, 9);
        assert!(clock.observe(NOW + 10).unwrap().expired_now);
    }

    #[test]
    fn test_remaining_never_increases() {
        let mut clock = DeadlineClock::default();
        clock.reset(NOW + 30);
        assert_eq!(clock.observe(NOW + 10).unwrap().remaining, 20);
        // Wall clock stepped backwards.
        assert_eq!(clock.observe(NOW + 5).unwrap().remaining, 20);
    }

    #[test]
    fn test_past_deadline_expires_on_first_observation() {
        let mut clock = DeadlineClock::default();
        clock.reset(NOW - 100);
        let r = clock.observe(NOW).unwrap();
        assert_eq!(r.remaining, 0);
        assert!(r.expired_now);
    }

    #[test]
    fn test_unarmed_clock() {
        let mut clock = DeadlineClock::default();
        assert_eq!(clock.observe(NOW), None);
        assert!(!clock.warning());
        clock.reset(NOW + 1);
        clock.clear();
        assert!(!clock.is_armed());
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(0), "00:00");
        assert_eq!(format_remaining(5), "00:05");
        assert_eq!(format_remaining(90), "01:30");
        assert_eq!(format_remaining(6_000), "100:00");
    }
}
