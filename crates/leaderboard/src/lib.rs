//! Leaderboard ranking.
//!
//! [`rank`] is a pure function: it never filters, the output always has the
//! same length as the input, and equal entries keep their input order.
//! [`StatsBook`] accumulates fetched records so that counters never go
//! backwards between fetches.

mod book;
mod rank;

pub use book::{MergeReport, StatsBook};
pub use rank::{rank, rank_with, TieBreak};
pub use trivia_core::SortKey;
