//! Per-participant aggregate statistics.

use crate::ParticipantId;
use std::cmp::Ordering;

/// Aggregate record for one participant, accumulated across rounds.
///
/// Invariant: `correct_count <= total_answered`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantStat {
    pub participant: ParticipantId,
    pub correct_count: u64,
    pub total_answered: u64,
    pub tokens_earned: u64,
    pub power_ups_used: u64,
}

impl ParticipantStat {
    /// A fresh record for a participant seen for the first time.
    pub fn new(participant: ParticipantId) -> Self {
        Self {
            participant,
            correct_count: 0,
            total_answered: 0,
            tokens_earned: 0,
            power_ups_used: 0,
        }
    }

    /// Whether the record satisfies `correct_count <= total_answered`.
    pub fn is_consistent(&self) -> bool {
        self.correct_count <= self.total_answered
    }

    /// Compare accuracy (`correct / total`, with `0/0 = 0`) exactly.
    ///
    /// Uses cross-multiplication so no float rounding is involved.
    pub fn cmp_accuracy(&self, other: &Self) -> Ordering {
        match (self.total_answered, other.total_answered) {
            (0, 0) => Ordering::Equal,
            (0, _) => 0u128.cmp(&(other.correct_count as u128)),
            (_, 0) => (self.correct_count as u128).cmp(&0),
            (a_total, b_total) => {
                let lhs = self.correct_count as u128 * b_total as u128;
                let rhs = other.correct_count as u128 * a_total as u128;
                lhs.cmp(&rhs)
            }
        }
    }

    /// Accuracy as a percentage. `0.0` when nothing was answered.
    pub fn accuracy_percent(&self) -> f64 {
        if self.total_answered == 0 {
            return 0.0;
        }
        self.correct_count as f64 / self.total_answered as f64 * 100.0
    }

    /// Accuracy formatted with one decimal, e.g. `"62.5"`.
    pub fn accuracy_display(&self) -> String {
        format!("{:.1}", self.accuracy_percent())
    }
}
