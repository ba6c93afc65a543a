//! Round state: the current round, selection and commitment bookkeeping.

use tracing::{debug, trace, warn};
use trivia_types::{
    commitment_digest, Commitment, Digest, EngineError, ParticipantId, Phase, Round, RoundId,
};

/// Result of a `RoundStarted` announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Announcement {
    /// A newer round. The displayed round (if any) was dropped.
    New { previous: Option<RoundId> },
    /// The round already tracked.
    Current,
    /// Older than the newest known round. Nothing changed.
    Stale { current: RoundId },
}

/// Result of applying a query response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The response replaced the displayed round.
    Adopted,
    /// Same round; its phase or correct option moved forward.
    Advanced,
    /// Same round; nothing new.
    Unchanged,
}

/// Result of an `AnswerRevealed` notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    /// The current round moved to `Revealed` with the matching option.
    Revealed { correct: usize },
    /// The current round was already revealed with a known answer.
    AlreadyRevealed,
    /// No option of the current round hashes to the revealed digest.
    Unmatched,
    /// The revealed round is not loaded.
    NotLoaded,
}

/// The round state machine.
///
/// Tracks the newest round id ever seen (the high-water mark) separately
/// from the displayed round: a `RoundStarted` announcement raises the mark
/// immediately, while the displayed round is only replaced once its content
/// has been fetched.
#[derive(Debug)]
pub struct RoundState {
    participant: ParticipantId,
    current: Option<Round>,
    high_water: Option<RoundId>,
    selection: Option<usize>,
    /// Accepted commitment for the displayed round.
    commitment: Option<Commitment>,
    /// Submission awaiting its callback.
    pending: Option<(RoundId, Digest)>,
}

impl RoundState {
    pub fn new(participant: ParticipantId) -> Self {
        Self {
            participant,
            current: None,
            high_water: None,
            selection: None,
            commitment: None,
            pending: None,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Ledger input
    // ═══════════════════════════════════════════════════════════════════════

    /// Record that `round_id` was started on the ledger.
    pub fn announce(&mut self, round_id: RoundId) -> Announcement {
        match self.high_water {
            Some(current) if round_id < current => {
                trace!(received = %round_id, current = %current, "Ignoring stale round announcement");
                Announcement::Stale { current }
            }
            Some(current) if round_id == current => Announcement::Current,
            _ => {
                let previous = self.current_id();
                debug!(round = %round_id, previous = ?previous, "New round announced");
                self.high_water = Some(round_id);
                if previous.is_some_and(|p| p != round_id) {
                    self.clear_view();
                }
                Announcement::New { previous }
            }
        }
    }

    /// Apply a query response.
    ///
    /// Responses for a round older than the high-water mark are rejected
    /// with [`EngineError::StaleResponse`] and change nothing. A response for
    /// the displayed round is merged: its phase and correct option may move
    /// forward, its deadline and options never change.
    pub fn apply_query(&mut self, round: Round) -> Result<ApplyOutcome, EngineError> {
        self.check_fresh(round.round_id())?;

        match self.current.as_mut() {
            Some(current) if current.round_id() == round.round_id() => {
                Ok(Self::merge(current, &round))
            }
            _ => {
                self.adopt(round);
                Ok(ApplyOutcome::Adopted)
            }
        }
    }

    /// Apply a revealed correct digest.
    pub fn apply_reveal(
        &mut self,
        round_id: RoundId,
        correct_digest: &Digest,
    ) -> Result<RevealOutcome, EngineError> {
        self.check_fresh(round_id)?;

        if self.current_id() != Some(round_id) {
            // A reveal for a round we have not loaded still proves it exists.
            self.announce(round_id);
            return Ok(RevealOutcome::NotLoaded);
        }
        let Some(round) = self.current.as_mut() else {
            return Ok(RevealOutcome::NotLoaded);
        };

        if round.phase() == Phase::Revealed && round.correct_index().is_some() {
            return Ok(RevealOutcome::AlreadyRevealed);
        }

        match round.option_for_digest(correct_digest) {
            Some(correct) => {
                round.reveal(Some(correct));
                debug!(round = %round_id, correct, "Round revealed");
                Ok(RevealOutcome::Revealed { correct })
            }
            None => {
                warn!(round = %round_id, digest = %correct_digest, "Revealed digest matches no option");
                Ok(RevealOutcome::Unmatched)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Participant input
    // ═══════════════════════════════════════════════════════════════════════

    /// Select an option of the displayed round.
    pub fn select_option(&mut self, index: usize) -> Result<(), EngineError> {
        let round = self.open_round("select")?;
        let count = round.options().len();
        if index >= count {
            return Err(EngineError::invalid_option(format!(
                "index {index} out of range for {count} options"
            )));
        }
        self.selection = Some(index);
        Ok(())
    }

    /// Check the submission guards and compute the digest to submit.
    ///
    /// Guards, in order: a round is loaded, it is `Open`, its deadline has
    /// not passed, an option is selected, and no submission for this round
    /// is in flight.
    /// On success the submission is marked in flight.
    pub fn prepare_submission(
        &mut self,
        deadline_expired: bool,
    ) -> Result<(RoundId, Digest), EngineError> {
        let round = self.open_round("submit")?;
        if deadline_expired {
            return Err(EngineError::phase_violation(
                "submit",
                round.phase(),
                "deadline has passed",
            ));
        }
        let index = self
            .selection
            .ok_or_else(|| EngineError::invalid_option("no option selected"))?;
        let option = round
            .options()
            .get(index)
            .ok_or_else(|| EngineError::invalid_option(format!("index {index} out of range")))?;
        if self.pending.is_some_and(|(id, _)| id == round.round_id()) {
            return Err(EngineError::submission_failed(
                "a submission is already in flight",
            ));
        }

        let round_id = round.round_id();
        let digest = commitment_digest(option);
        self.pending = Some((round_id, digest));
        Ok((round_id, digest))
    }

    /// Record an accepted submission.
    ///
    /// At most one commitment is recorded per round; a second acceptance for
    /// the same round is rejected and the first one stands.
    pub fn confirm_submission(
        &mut self,
        round_id: RoundId,
        digest: Digest,
    ) -> Result<Commitment, EngineError> {
        self.clear_pending(round_id);
        self.check_fresh(round_id)?;

        if self.commitment.as_ref().is_some_and(|c| c.round_id == round_id) {
            return Err(EngineError::phase_violation(
                "commit",
                Phase::Committed,
                "a commitment for this round was already accepted",
            ));
        }

        let commitment = Commitment {
            round_id,
            participant: self.participant.clone(),
            digest,
        };
        self.commitment = Some(commitment.clone());
        if let Some(round) = self.current.as_mut().filter(|r| r.round_id() == round_id) {
            round.mark_self_committed();
        }
        Ok(commitment)
    }

    /// Record a failed submission. Returns `true` if it was the one in flight.
    pub fn fail_submission(&mut self, round_id: RoundId) -> bool {
        self.clear_pending(round_id)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    /// The displayed round.
    pub fn current(&self) -> Option<&Round> {
        self.current.as_ref()
    }

    pub fn current_id(&self) -> Option<RoundId> {
        self.current.as_ref().map(Round::round_id)
    }

    /// Newest round id seen from any source.
    pub fn high_water(&self) -> Option<RoundId> {
        self.high_water
    }

    pub fn phase(&self) -> Option<Phase> {
        self.current.as_ref().map(Round::phase)
    }

    pub fn selection(&self) -> Option<usize> {
        self.selection
    }

    pub fn commitment(&self) -> Option<&Commitment> {
        self.commitment.as_ref()
    }

    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    pub fn is_submitting(&self) -> bool {
        self.pending.is_some()
    }

    /// A newer round is known whose content has not been loaded.
    pub fn awaiting_content(&self) -> bool {
        self.high_water.is_some() && self.high_water != self.current_id()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Internals
    // ═══════════════════════════════════════════════════════════════════════

    fn check_fresh(&self, round_id: RoundId) -> Result<(), EngineError> {
        match self.high_water {
            Some(current) if round_id < current => Err(EngineError::StaleResponse {
                received: round_id,
                current,
            }),
            _ => Ok(()),
        }
    }

    fn open_round(&self, action: &'static str) -> Result<&Round, EngineError> {
        let round = self.current.as_ref().ok_or_else(|| {
            EngineError::phase_violation(action, Phase::Open, "no round is loaded")
        })?;
        if round.phase() != Phase::Open {
            return Err(EngineError::phase_violation(
                action,
                round.phase(),
                "round is no longer open",
            ));
        }
        Ok(round)
    }

    fn adopt(&mut self, round: Round) {
        let round_id = round.round_id();
        if self.high_water.map_or(true, |hw| round_id > hw) {
            self.high_water = Some(round_id);
        }
        if self.current_id() != Some(round_id) {
            self.selection = None;
            self.drop_superseded_pending(round_id);
            if self.commitment.as_ref().is_some_and(|c| c.round_id != round_id) {
                self.commitment = None;
            }
        }
        debug!(round = %round_id, phase = %round.phase(), "Round loaded");
        self.current = Some(round);
    }

    fn merge(current: &mut Round, incoming: &Round) -> ApplyOutcome {
        if incoming.deadline() != current.deadline() {
            warn!(
                round = %current.round_id(),
                kept = current.deadline(),
                received = incoming.deadline(),
                "Ignoring deadline change for loaded round"
            );
        }
        if incoming.options() != current.options() {
            warn!(round = %current.round_id(), "Ignoring option change for loaded round");
        }

        let before = current.clone();
        if incoming.self_committed() {
            current.mark_self_committed();
        }
        if incoming.phase() == Phase::Revealed {
            // Locate the answer by text: the kept options are authoritative.
            let correct = incoming
                .correct_option()
                .and_then(|text| current.options().iter().position(|o| o == text));
            current.reveal(correct);
        }

        if *current == before {
            ApplyOutcome::Unchanged
        } else {
            ApplyOutcome::Advanced
        }
    }

    fn clear_view(&mut self) {
        self.current = None;
        self.selection = None;
        self.commitment = None;
        if let Some(high_water) = self.high_water {
            self.drop_superseded_pending(high_water);
        }
    }

    /// Forget a submission for a round older than `round_id`. Its callback,
    /// if it ever arrives, is rejected as stale.
    fn drop_superseded_pending(&mut self, round_id: RoundId) {
        if let Some((pending, _)) = self.pending.filter(|(id, _)| *id < round_id) {
            trace!(round = %pending, "Dropping submission for superseded round");
            self.pending = None;
        }
    }

    fn clear_pending(&mut self, round_id: RoundId) -> bool {
        if self.pending.is_some_and(|(id, _)| id == round_id) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trivia_types::test_utils::{test_content, test_observation, test_round};
    use trivia_types::RoundContent;

    const DEADLINE: u64 = 1_700_000_030;

    fn state() -> RoundState {
        RoundState::new(ParticipantId::new("0x1234567890abcdef"))
    }

    fn loaded(round_id: u64) -> RoundState {
        let mut state = state();
        state.apply_query(test_round(round_id, DEADLINE)).unwrap();
        state
    }

    fn revealed_round(round_id: u64, correct: &str) -> Round {
        let mut obs = test_observation(round_id, DEADLINE);
        obs.revealed = true;
        obs.correct_digest = Some(commitment_digest(correct));
        Round::assemble(obs, test_content()).unwrap()
    }

    #[test]
    fn test_submit_then_commit() {
        let mut state = loaded(7);
        state.select_option(1).unwrap();

        let (round_id, digest) = state.prepare_submission(false).unwrap();
        assert_eq!(round_id, RoundId(7));
        assert_eq!(digest, commitment_digest("Paris"));
        assert!(state.is_submitting());

        let commitment = state.confirm_submission(round_id, digest).unwrap();
        assert_eq!(commitment.digest, commitment_digest("Paris"));
        assert_eq!(state.phase(), Some(Phase::Committed));
        assert!(!state.is_submitting());

        // Second submit: the round is no longer open.
        let err = state.prepare_submission(false).unwrap_err();
        assert!(matches!(
            err,
            EngineError::PhaseViolation {
                phase: Phase::Committed,
                ..
            }
        ));
    }

    #[test]
    fn test_submission_guards_in_order() {
        let mut state = state();
        assert!(matches!(
            state.prepare_submission(false),
            Err(EngineError::PhaseViolation { .. })
        ));

        state.apply_query(test_round(7, DEADLINE)).unwrap();
        assert!(matches!(
            state.prepare_submission(true),
            Err(EngineError::PhaseViolation { .. })
        ));
        assert!(matches!(
            state.prepare_submission(false),
            Err(EngineError::InvalidOption { .. })
        ));

        state.select_option(0).unwrap();
        state.prepare_submission(false).unwrap();
        assert!(matches!(
            state.prepare_submission(false),
            Err(EngineError::SubmissionFailed { .. })
        ));
    }

    #[test]
    fn test_failed_submission_allows_retry() {
        let mut state = loaded(7);
        state.select_option(2).unwrap();
        let (round_id, _) = state.prepare_submission(false).unwrap();

        assert!(state.fail_submission(round_id));
        assert_eq!(state.phase(), Some(Phase::Open));
        assert!(state.prepare_submission(false).is_ok());
    }

    #[test]
    fn test_select_out_of_range() {
        let mut state = loaded(7);
        assert!(matches!(
            state.select_option(4),
            Err(EngineError::InvalidOption { .. })
        ));
        assert_eq!(state.selection(), None);
    }

    #[test]
    fn test_duplicate_acceptance_rejected() {
        let mut state = loaded(7);
        let digest = commitment_digest("Paris");
        state.confirm_submission(RoundId(7), digest).unwrap();

        let err = state
            .confirm_submission(RoundId(7), commitment_digest("Berlin"))
            .unwrap_err();
        assert!(matches!(err, EngineError::PhaseViolation { .. }));
        assert_eq!(state.commitment().unwrap().digest, digest);
    }

    #[test]
    fn test_stale_response_ignored() {
        let mut state = loaded(7);
        let err = state.apply_query(test_round(6, DEADLINE)).unwrap_err();
        assert_eq!(
            err,
            EngineError::StaleResponse {
                received: RoundId(6),
                current: RoundId(7)
            }
        );
        assert_eq!(state.current_id(), Some(RoundId(7)));
    }

    #[test]
    fn test_announcement_supersedes_displayed_round() {
        let mut state = loaded(7);
        state.select_option(1).unwrap();

        assert_eq!(
            state.announce(RoundId(8)),
            Announcement::New {
                previous: Some(RoundId(7))
            }
        );
        assert!(state.current().is_none());
        assert_eq!(state.selection(), None);
        assert!(state.awaiting_content());

        // Late response for the superseded round.
        assert!(state.apply_query(test_round(7, DEADLINE)).is_err());

        assert_eq!(
            state.apply_query(test_round(8, DEADLINE + 60)).unwrap(),
            ApplyOutcome::Adopted
        );
        assert_eq!(state.phase(), Some(Phase::Open));
        assert!(!state.awaiting_content());

        assert_eq!(state.announce(RoundId(8)), Announcement::Current);
        assert_eq!(
            state.announce(RoundId(3)),
            Announcement::Stale {
                current: RoundId(8)
            }
        );
    }

    #[test]
    fn test_late_submission_callback_after_supersede() {
        let mut state = loaded(7);
        state.select_option(1).unwrap();
        let (round_id, digest) = state.prepare_submission(false).unwrap();

        state.announce(RoundId(8));
        assert!(matches!(
            state.confirm_submission(round_id, digest),
            Err(EngineError::StaleResponse { .. })
        ));
        assert!(!state.is_submitting());
        assert!(state.commitment().is_none());
    }

    #[test]
    fn test_superseded_submission_does_not_block_new_round() {
        let mut state = loaded(7);
        state.select_option(1).unwrap();
        state.prepare_submission(false).unwrap();

        state.announce(RoundId(8));
        assert!(!state.is_submitting());
        state.apply_query(test_round(8, DEADLINE + 60)).unwrap();
        state.select_option(0).unwrap();

        let (round_id, digest) = state.prepare_submission(false).unwrap();
        assert_eq!(round_id, RoundId(8));
        assert_eq!(digest, commitment_digest("London"));

        // The round 7 failure arrives late and is not ours any more.
        assert!(!state.fail_submission(RoundId(7)));
        assert!(state.is_submitting());
    }

    #[test]
    fn test_newer_query_response_drops_old_submission() {
        let mut state = loaded(7);
        state.select_option(1).unwrap();
        state.prepare_submission(false).unwrap();

        // Round 8 loads without a prior announcement.
        state.apply_query(test_round(8, DEADLINE + 60)).unwrap();
        assert!(!state.is_submitting());
        state.select_option(2).unwrap();
        assert_eq!(state.prepare_submission(false).unwrap().0, RoundId(8));
    }

    #[test]
    fn test_reveal_by_digest() {
        let mut state = loaded(7);
        let outcome = state
            .apply_reveal(RoundId(7), &commitment_digest("Paris"))
            .unwrap();
        assert_eq!(outcome, RevealOutcome::Revealed { correct: 1 });
        assert_eq!(state.current().unwrap().correct_option(), Some("Paris"));

        assert_eq!(
            state
                .apply_reveal(RoundId(7), &commitment_digest("Paris"))
                .unwrap(),
            RevealOutcome::AlreadyRevealed
        );
    }

    #[test]
    fn test_unmatched_reveal_does_not_advance() {
        let mut state = loaded(7);
        let outcome = state
            .apply_reveal(RoundId(7), &commitment_digest("Rome"))
            .unwrap();
        assert_eq!(outcome, RevealOutcome::Unmatched);
        assert_eq!(state.phase(), Some(Phase::Open));
    }

    #[test]
    fn test_reveal_for_unloaded_round_raises_high_water() {
        let mut state = loaded(7);
        let outcome = state
            .apply_reveal(RoundId(9), &commitment_digest("Paris"))
            .unwrap();
        assert_eq!(outcome, RevealOutcome::NotLoaded);
        assert_eq!(state.high_water(), Some(RoundId(9)));
        assert!(state.current().is_none());
    }

    #[test]
    fn test_merge_never_regresses() {
        let mut state = state();
        state.apply_query(revealed_round(7, "Paris")).unwrap();
        assert_eq!(state.phase(), Some(Phase::Revealed));

        // An older view of the same round arrives late.
        assert_eq!(
            state.apply_query(test_round(7, DEADLINE)).unwrap(),
            ApplyOutcome::Unchanged
        );
        assert_eq!(state.phase(), Some(Phase::Revealed));
        assert_eq!(state.current().unwrap().correct_option(), Some("Paris"));
    }

    #[test]
    fn test_merge_advances_and_keeps_fixed_fields() {
        let mut state = loaded(7);

        let mut obs = test_observation(7, DEADLINE + 500);
        obs.revealed = true;
        obs.correct_digest = Some(commitment_digest("Paris"));
        let changed = Round::assemble(obs, test_content()).unwrap();

        assert_eq!(state.apply_query(changed).unwrap(), ApplyOutcome::Advanced);
        let round = state.current().unwrap();
        assert_eq!(round.deadline(), DEADLINE);
        assert_eq!(round.phase(), Phase::Revealed);
        assert_eq!(round.correct_option(), Some("Paris"));
    }

    #[test]
    fn test_merge_ignores_option_change() {
        let mut state = loaded(7);
        let other = Round::assemble(
            test_observation(7, DEADLINE),
            RoundContent::new("Different?", ["a", "b"]),
        )
        .unwrap();
        assert_eq!(state.apply_query(other).unwrap(), ApplyOutcome::Unchanged);
        assert_eq!(state.current().unwrap().options().len(), 4);
    }

    #[test]
    fn test_select_rejected_outside_open() {
        let mut state = state();
        state.apply_query(revealed_round(7, "Paris")).unwrap();
        assert!(matches!(
            state.select_option(0),
            Err(EngineError::PhaseViolation {
                phase: Phase::Revealed,
                ..
            })
        ));
    }
}
