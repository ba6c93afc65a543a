//! Error taxonomy shared by every engine component.

use crate::{Phase, RoundId};
use thiserror::Error;

/// Errors surfaced by the engine.
///
/// All failures of external calls are converted into one of these kinds at
/// the engine boundary. None of them is fatal: the engine stays in its last
/// known-good phase and a later trigger can always retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// An external query failed. Transient; retried on the next trigger.
    #[error("source unavailable: {reason}")]
    Unavailable { reason: String },

    /// The external submission failed. The phase is unchanged and the
    /// participant may retry.
    #[error("submission failed: {reason}")]
    SubmissionFailed { reason: String },

    /// An action was attempted outside the phase that permits it.
    #[error("{action} not allowed in phase {phase}: {reason}")]
    PhaseViolation {
        action: &'static str,
        phase: Phase,
        reason: String,
    },

    /// Identity verification failed or has not happened this session.
    #[error("identity verification failed: {reason}")]
    VerificationFailed { reason: String },

    /// A query response for a round that has been superseded.
    /// Internal only, never surfaced to the presentation layer.
    #[error("stale response for round {received} (tracking {current})")]
    StaleResponse { received: RoundId, current: RoundId },

    /// The selected option does not exist or nothing is selected.
    #[error("invalid option: {reason}")]
    InvalidOption { reason: String },
}

impl EngineError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn submission_failed(reason: impl Into<String>) -> Self {
        Self::SubmissionFailed {
            reason: reason.into(),
        }
    }

    pub fn verification_failed(reason: impl Into<String>) -> Self {
        Self::VerificationFailed {
            reason: reason.into(),
        }
    }

    pub fn phase_violation(action: &'static str, phase: Phase, reason: impl Into<String>) -> Self {
        Self::PhaseViolation {
            action,
            phase,
            reason: reason.into(),
        }
    }

    pub fn invalid_option(reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            reason: reason.into(),
        }
    }

    /// Whether a later trigger may succeed without user involvement.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Whether this error may be shown to the participant.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::StaleResponse { .. })
    }

    /// Returns a string representation for metrics/logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "unavailable",
            Self::SubmissionFailed { .. } => "submission_failed",
            Self::PhaseViolation { .. } => "phase_violation",
            Self::VerificationFailed { .. } => "verification_failed",
            Self::StaleResponse { .. } => "stale_response",
            Self::InvalidOption { .. } => "invalid_option",
        }
    }
}
