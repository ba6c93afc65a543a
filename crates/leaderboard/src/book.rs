//! Accumulated participant stats.

use crate::{rank_with, SortKey, TieBreak};
use std::collections::HashMap;
use tracing::{debug, warn};
use trivia_types::{ParticipantId, ParticipantStat};

/// Summary of one [`StatsBook::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Participants seen for the first time.
    pub added: usize,
    /// Existing records where at least one counter grew.
    pub updated: usize,
    /// Records rejected for `correct_count > total_answered`.
    pub rejected: usize,
}

impl MergeReport {
    pub fn changed(&self) -> bool {
        self.added > 0 || self.updated > 0
    }
}

/// Participant stats in first-observed order.
///
/// Records are never removed and every counter is merged with `max`, so a
/// stale fetch can never make a counter go backwards.
#[derive(Debug, Default)]
pub struct StatsBook {
    records: Vec<ParticipantStat>,
    index: HashMap<ParticipantId, usize>,
}

impl StatsBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a fetched batch.
    pub fn merge(&mut self, batch: impl IntoIterator<Item = ParticipantStat>) -> MergeReport {
        let mut report = MergeReport::default();

        for stat in batch {
            if !stat.is_consistent() {
                warn!(
                    participant = %stat.participant,
                    correct = stat.correct_count,
                    total = stat.total_answered,
                    "Rejecting inconsistent stats record"
                );
                report.rejected += 1;
                continue;
            }

            match self.index.get(&stat.participant) {
                Some(&i) => {
                    if merge_max(&mut self.records[i], &stat) {
                        report.updated += 1;
                    }
                }
                None => {
                    self.index.insert(stat.participant.clone(), self.records.len());
                    self.records.push(stat);
                    report.added += 1;
                }
            }
        }

        debug!(
            added = report.added,
            updated = report.updated,
            rejected = report.rejected,
            total = self.records.len(),
            "Stats merged"
        );
        report
    }

    /// Records in first-observed order.
    pub fn records(&self) -> &[ParticipantStat] {
        &self.records
    }

    pub fn get(&self, participant: &ParticipantId) -> Option<&ParticipantStat> {
        self.index.get(participant).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rank the accumulated records.
    pub fn ranked(&self, key: SortKey, tie_break: TieBreak) -> Vec<ParticipantStat> {
        rank_with(&self.records, key, tie_break)
    }
}

fn merge_max(current: &mut ParticipantStat, incoming: &ParticipantStat) -> bool {
    let before = current.clone();
    current.correct_count = current.correct_count.max(incoming.correct_count);
    current.total_answered = current.total_answered.max(incoming.total_answered);
    current.tokens_earned = current.tokens_earned.max(incoming.tokens_earned);
    current.power_ups_used = current.power_ups_used.max(incoming.power_ups_used);
    *current != before
}
