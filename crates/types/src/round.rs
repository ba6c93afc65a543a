//! Round, phase and commitment types.

use crate::{commitment_digest, ContentHash, Digest, EngineError, ParticipantId, RoundId};
use std::collections::HashSet;
use std::fmt;

/// Lifecycle phase of a round.
///
/// Ordered: a round only ever moves forward through
/// `Open → Committed → Revealed` for a fixed [`RoundId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Phase {
    /// Accepting the local participant's commitment.
    #[default]
    Open,
    /// The local participant's commitment was accepted; awaiting reveal.
    Committed,
    /// The correct answer is known. Terminal for the round.
    Revealed,
}

impl Phase {
    /// Returns a string representation for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Open => "open",
            Phase::Committed => "committed",
            Phase::Revealed => "revealed",
        }
    }

    /// Whether this phase is terminal for its round.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Revealed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Question text and options, resolved from the round's content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundContent {
    /// Display text of the question.
    pub prompt: String,
    /// Ordered option strings.
    pub options: Vec<String>,
}

impl RoundContent {
    /// Create round content.
    pub fn new<S: Into<String>>(prompt: impl Into<String>, options: impl IntoIterator<Item = S>) -> Self {
        Self {
            prompt: prompt.into(),
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    /// Check the option invariant: at least two entries, none empty, all distinct.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.options.len() < 2 {
            return Err(EngineError::unavailable(format!(
                "round content has {} option(s), need at least 2",
                self.options.len()
            )));
        }
        if self.options.iter().any(|o| o.is_empty()) {
            return Err(EngineError::unavailable("round content has an empty option"));
        }
        let distinct: HashSet<&str> = self.options.iter().map(String::as_str).collect();
        if distinct.len() != self.options.len() {
            return Err(EngineError::unavailable("round content has duplicate options"));
        }
        Ok(())
    }
}

/// What the ledger reports about the current round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundObservation {
    pub round_id: RoundId,
    pub content_hash: ContentHash,
    /// Absolute deadline, seconds since the UNIX epoch.
    pub deadline: u64,
    pub revealed: bool,
    /// Whether the ledger holds a commitment from the local participant.
    pub self_committed: bool,
    /// Digest of the correct option, present once revealed.
    pub correct_digest: Option<Digest>,
}

/// One question cycle as seen by the local participant.
///
/// Fields are private: the deadline and options are fixed once assembled and
/// the phase only moves forward, so mutation goes through [`Round::advance`]
/// and [`Round::reveal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    round_id: RoundId,
    content_hash: ContentHash,
    prompt: String,
    options: Vec<String>,
    deadline: u64,
    phase: Phase,
    self_committed: bool,
    correct_option: Option<usize>,
}

impl Round {
    /// Combine a ledger observation with resolved content.
    ///
    /// The phase is derived from the observation: revealed rounds start
    /// `Revealed`, rounds holding our commitment start `Committed`.
    pub fn assemble(observation: RoundObservation, content: RoundContent) -> Result<Self, EngineError> {
        content.validate()?;

        let mut round = Self {
            round_id: observation.round_id,
            content_hash: observation.content_hash,
            prompt: content.prompt,
            options: content.options,
            deadline: observation.deadline,
            phase: Phase::Open,
            self_committed: false,
            correct_option: None,
        };

        if observation.self_committed {
            round.mark_self_committed();
        }
        if observation.revealed {
            let correct = observation
                .correct_digest
                .and_then(|d| round.option_for_digest(&d));
            round.reveal(correct);
        }
        Ok(round)
    }

    pub fn round_id(&self) -> RoundId {
        self.round_id
    }

    pub fn content_hash(&self) -> ContentHash {
        self.content_hash
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Absolute deadline, seconds since the UNIX epoch.
    pub fn deadline(&self) -> u64 {
        self.deadline
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn self_committed(&self) -> bool {
        self.self_committed
    }

    /// Index of the correct option. Only ever set once revealed.
    pub fn correct_index(&self) -> Option<usize> {
        self.correct_option
    }

    /// Text of the correct option. Only ever set once revealed.
    pub fn correct_option(&self) -> Option<&str> {
        self.correct_option.map(|i| self.options[i].as_str())
    }

    /// Index of the option whose commitment digest equals `digest`.
    pub fn option_for_digest(&self, digest: &Digest) -> Option<usize> {
        self.options
            .iter()
            .position(|o| commitment_digest(o) == *digest)
    }

    /// Move the phase forward. Returns `false` (and changes nothing) if
    /// `phase` would not advance.
    pub fn advance(&mut self, phase: Phase) -> bool {
        if phase <= self.phase {
            return false;
        }
        self.phase = phase;
        true
    }

    /// Record that the local participant's commitment was accepted.
    pub fn mark_self_committed(&mut self) -> bool {
        self.self_committed = true;
        self.advance(Phase::Committed)
    }

    /// Advance to `Revealed`, recording the correct option if known.
    ///
    /// A known correct option is never overwritten.
    pub fn reveal(&mut self, correct_index: Option<usize>) -> bool {
        if self.correct_option.is_none() {
            self.correct_option = correct_index.filter(|&i| i < self.options.len());
        }
        self.advance(Phase::Revealed)
    }
}

/// A participant's irreversible claim for a round.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Commitment {
    pub round_id: RoundId,
    pub participant: ParticipantId,
    pub digest: Digest,
}
