//! Round phase state machine.
//!
//! Owns the current [`Round`](trivia_types::Round) and the rules for moving
//! it through `Open → Committed → Revealed`. Every mutation returns an
//! outcome describing what changed, so the caller (the reconciliation
//! controller in `trivia-engine`) can decide what to publish.
//!
//! # Rules
//!
//! - The phase only advances for a fixed round id; a new round id replaces
//!   the round and re-enters at `Open`.
//! - A round's deadline and options are fixed once loaded.
//! - Anything referring to a round older than the newest known round is
//!   stale and never mutates state.
//! - At most one commitment is accepted per round for the local participant.

mod state;

pub use state::{Announcement, ApplyOutcome, RevealOutcome, RoundState};
