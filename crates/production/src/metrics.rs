//! Production metrics using the native Prometheus client.
//!
//! Metrics are domain-specific rather than generic event counters.
//! Use traces for event-level granularity during investigations.

use prometheus::{register_counter, register_gauge, Counter, Gauge};
use std::sync::OnceLock;
use trivia_engine::EngineStats;

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Domain-specific metrics for production monitoring.
pub struct Metrics {
    // === Reconciliation ===
    pub queries_issued: Counter,
    pub triggers_coalesced: Counter,
    pub stale_responses: Counter,
    pub query_failures: Counter,

    // === Submissions ===
    pub submissions_accepted: Counter,
    pub submissions_failed: Counter,

    // === Round ===
    pub current_round: Gauge,
    pub remaining_seconds: Gauge,
}

impl Metrics {
    fn new() -> Self {
        Self {
            queries_issued: register_counter!(
                "trivia_round_queries_total",
                "Round queries sent to the ledger"
            )
            .expect("static metric definition"),

            triggers_coalesced: register_counter!(
                "trivia_triggers_coalesced_total",
                "Query triggers dropped because a query was in flight"
            )
            .expect("static metric definition"),

            stale_responses: register_counter!(
                "trivia_stale_responses_total",
                "Responses and notifications discarded for superseded rounds"
            )
            .expect("static metric definition"),

            query_failures: register_counter!(
                "trivia_round_query_failures_total",
                "Round queries that failed or timed out"
            )
            .expect("static metric definition"),

            submissions_accepted: register_counter!(
                "trivia_submissions_accepted_total",
                "Commitments accepted by the ledger"
            )
            .expect("static metric definition"),

            submissions_failed: register_counter!(
                "trivia_submissions_failed_total",
                "Commitment submissions that failed"
            )
            .expect("static metric definition"),

            current_round: register_gauge!("trivia_current_round", "Displayed round id")
                .expect("static metric definition"),

            remaining_seconds: register_gauge!(
                "trivia_remaining_seconds",
                "Seconds until the tracked round's deadline"
            )
            .expect("static metric definition"),
        }
    }
}

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

/// Advance the counters by the difference between two engine snapshots.
pub fn record_engine_stats(previous: &EngineStats, current: &EngineStats) {
    let m = metrics();
    let delta = |prev: u64, cur: u64| cur.saturating_sub(prev) as f64;

    m.queries_issued
        .inc_by(delta(previous.queries_issued, current.queries_issued));
    m.triggers_coalesced
        .inc_by(delta(previous.triggers_coalesced, current.triggers_coalesced));
    m.stale_responses
        .inc_by(delta(previous.stale_responses, current.stale_responses));
    m.query_failures
        .inc_by(delta(previous.query_failures, current.query_failures));
    m.submissions_accepted
        .inc_by(delta(previous.submissions_accepted, current.submissions_accepted));
    m.submissions_failed
        .inc_by(delta(previous.submissions_failed, current.submissions_failed));
}

pub fn set_current_round(round_id: u64) {
    metrics().current_round.set(round_id as f64);
}

pub fn set_remaining_seconds(remaining: u64) {
    metrics().remaining_seconds.set(remaining as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_advance_by_delta() {
        let before = metrics().queries_issued.get();
        let previous = EngineStats {
            queries_issued: 3,
            ..Default::default()
        };
        let current = EngineStats {
            queries_issued: 5,
            ..Default::default()
        };
        record_engine_stats(&previous, &current);
        // Other tests in this binary may record concurrently.
        assert!(metrics().queries_issued.get() >= before + 2.0);

        set_current_round(7);
        assert_eq!(metrics().current_round.get(), 7.0);
    }
}
