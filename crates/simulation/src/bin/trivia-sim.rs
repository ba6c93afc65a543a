//! Trivia round simulator
//!
//! Plays a seeded sequence of rounds against the simulated ledger and prints
//! the phase the engine ended each round in, plus the final leaderboard.
//!
//! # Usage
//!
//! ```bash
//! # Three 30-second rounds
//! trivia-sim --rounds 3 --round-secs 30
//!
//! # Slow ledger, half of all reveal notifications lost
//! trivia-sim --seed 7 --latency-ms 400 --drop-reveals 0.5
//! ```

use anyhow::{ensure, Context, Result};
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trivia_core::SortKey;
use trivia_simulation::{LedgerConfig, SimulationRunner};
use trivia_types::{ParticipantId, RoundContent};

/// Trivia round simulator
///
/// Runs the engine against an in-memory ledger in simulated time.
#[derive(Parser, Debug)]
#[command(name = "trivia-sim")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Number of rounds to play
    #[arg(long, default_value_t = 3)]
    rounds: u32,

    /// Seconds between a round's start and its deadline
    #[arg(long, default_value_t = 30)]
    round_secs: u64,

    /// RNG seed; the same seed replays the same run
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Base latency of ledger calls in milliseconds
    #[arg(long, default_value_t = 50)]
    latency_ms: u64,

    /// Probability that a reveal notification is lost (0.0 - 1.0)
    #[arg(long, default_value_t = 0.0)]
    drop_reveals: f64,

    /// Other participants committing each round
    #[arg(long, default_value_t = 3)]
    bots: u32,

    /// Rank the final leaderboard by accuracy instead of tokens
    #[arg(long)]
    by_accuracy: bool,

    /// Log level filter (overrides RUST_LOG)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    ensure!(cli.round_secs > 0, "--round-secs must be greater than 0");
    ensure!(
        (0.0..=1.0).contains(&cli.drop_reveals),
        "--drop-reveals must be between 0.0 and 1.0"
    );

    let ledger_config = LedgerConfig {
        call_latency: Duration::from_millis(cli.latency_ms),
        notification_latency: Duration::from_millis(cli.latency_ms),
        drop_reveal_rate: cli.drop_reveals,
        ..Default::default()
    };
    let local = ParticipantId::new(format!("0x{:040x}", 1));
    let bots: Vec<ParticipantId> = (0..cli.bots)
        .map(|i| ParticipantId::new(format!("0x{:040x}", 0xb07_u64 + i as u64)))
        .collect();

    let mut runner = SimulationRunner::new(local, ledger_config, cli.seed);
    // Participant choices draw from their own stream so latency sampling
    // does not shift them.
    let mut choices = ChaCha8Rng::seed_from_u64(cli.seed ^ 0x5eed);

    runner.initialize();
    runner.verify();
    runner.run_for(Duration::from_secs(1));

    for n in 1..=cli.rounds {
        let options = ["Alpha", "Bravo", "Charlie", "Delta"];
        let content = RoundContent::new(format!("Question {n}"), options);
        let correct = choices.gen_range(0..options.len());
        let round_id = runner
            .start_round(content, cli.round_secs, correct)
            .with_context(|| format!("failed to start round {n}"))?;
        info!(round = %round_id, "Round started");

        runner.run_for(Duration::from_secs(2));
        runner.select_option(choices.gen_range(0..options.len()));
        runner.submit();

        let now = runner.now_secs();
        for bot in &bots {
            let pick = options[choices.gen_range(0..options.len())];
            // A bot missing the deadline is part of the game.
            let _ = runner.ledger_mut().commit_as(round_id, bot, pick, now);
        }

        runner.run_for(Duration::from_secs(cli.round_secs));
        runner.reveal_round(round_id);
        runner.run_for(Duration::from_secs(6));
    }

    if cli.by_accuracy {
        runner.set_sort_key(SortKey::Accuracy);
    }
    runner.run_for(Duration::from_secs(1));

    println!("Rounds:");
    for (round_id, phase) in runner.observed_phases() {
        println!("  {round_id}  {phase}");
    }

    println!("Leaderboard:");
    for (rank, stat) in runner.last_leaderboard().unwrap_or_default().iter().enumerate() {
        println!(
            "  {:>2}. {}  tokens={:<4} accuracy={}%",
            rank + 1,
            stat.participant.short(),
            stat.tokens_earned,
            stat.accuracy_display(),
        );
    }

    let stats = runner.stats();
    println!(
        "Ledger calls: {} queries, {} submissions, {} stats fetches, {} reveals dropped",
        stats.round_queries, stats.submissions, stats.stats_fetches, stats.reveals_dropped
    );
    Ok(())
}
