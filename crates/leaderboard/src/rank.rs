//! Sorting participant stats into a leaderboard.

use std::cmp::Ordering;
use trivia_core::SortKey;
use trivia_types::ParticipantStat;

/// How entries with an equal primary key are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Keep input order (stable sort).
    #[default]
    InputOrder,
    /// Ascending participant identifier.
    Participant,
}

/// Rank stats descending by `key`. Ties keep their input order.
pub fn rank(stats: &[ParticipantStat], key: SortKey) -> Vec<ParticipantStat> {
    rank_with(stats, key, TieBreak::InputOrder)
}

/// Rank stats descending by `key`, ordering ties by `tie_break`.
pub fn rank_with(stats: &[ParticipantStat], key: SortKey, tie_break: TieBreak) -> Vec<ParticipantStat> {
    let mut ranked = stats.to_vec();
    ranked.sort_by(|a, b| {
        let primary = match key {
            SortKey::Tokens => b.tokens_earned.cmp(&a.tokens_earned),
            SortKey::Accuracy => b.cmp_accuracy(a),
        };
        primary.then_with(|| match tie_break {
            TieBreak::InputOrder => Ordering::Equal,
            TieBreak::Participant => a.participant.cmp(&b.participant),
        })
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use trivia_types::test_utils::test_stat;

    fn tokens(ranked: &[ParticipantStat]) -> Vec<u64> {
        ranked.iter().map(|s| s.tokens_earned).collect()
    }

    fn names(ranked: &[ParticipantStat]) -> Vec<&str> {
        ranked.iter().map(|s| s.participant.as_str()).collect()
    }

    #[test]
    fn test_tokens_and_accuracy() {
        let stats = vec![test_stat("a", 50, 5, 8), test_stat("b", 30, 4, 4)];

        assert_eq!(tokens(&rank(&stats, SortKey::Tokens)), vec![50, 30]);

        let by_accuracy = rank(&stats, SortKey::Accuracy);
        assert_eq!(names(&by_accuracy), vec!["b", "a"]);
        assert_eq!(by_accuracy[0].accuracy_display(), "100.0");
        assert_eq!(by_accuracy[1].accuracy_display(), "62.5");
    }

    #[test]
    fn test_ties_keep_input_order() {
        let stats = vec![
            test_stat("c", 10, 1, 2),
            test_stat("a", 10, 2, 4),
            test_stat("b", 20, 0, 0),
        ];
        assert_eq!(names(&rank(&stats, SortKey::Tokens)), vec!["b", "c", "a"]);
        // 1/2 == 2/4 exactly.
        assert_eq!(names(&rank(&stats, SortKey::Accuracy)), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_participant_tie_break() {
        let stats = vec![
            test_stat("c", 10, 1, 2),
            test_stat("a", 10, 2, 4),
            test_stat("b", 20, 0, 0),
        ];
        let ranked = rank_with(&stats, SortKey::Tokens, TieBreak::Participant);
        assert_eq!(names(&ranked), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_zero_answered_ranks_last_on_accuracy() {
        let stats = vec![test_stat("idle", 99, 0, 0), test_stat("one", 1, 1, 3)];
        assert_eq!(names(&rank(&stats, SortKey::Accuracy)), vec!["one", "idle"]);
    }

    #[test]
    fn test_no_filtering() {
        assert!(rank(&[], SortKey::Tokens).is_empty());
        let stats: Vec<_> = (0..5).map(|i| test_stat(&format!("p{i}"), i, 0, 0)).collect();
        assert_eq!(rank(&stats, SortKey::Accuracy).len(), 5);
    }
}
