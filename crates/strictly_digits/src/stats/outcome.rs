//! Outcome records and the recorder contract.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{GameError, SessionId, UserId};

/// Terminal classification of a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Outcome {
    /// The player found the target.
    Win,
    /// The player started a new game after at least one guess.
    Reset,
}

impl Outcome {
    /// Converts outcome to the string stored by persistent backends.
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Reset => "reset",
        }
    }

    /// Parses outcome from its stored string.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the string is not a known outcome.
    #[instrument]
    pub fn from_db_string(s: &str) -> Result<Self, GameError> {
        match s {
            "win" => Ok(Self::Win),
            "reset" => Ok(Self::Reset),
            _ => Err(GameError::storage(format!("Invalid outcome: '{}'", s))),
        }
    }

    /// Correct-guess count attached to a record with this outcome.
    pub fn correct_guesses(&self) -> u32 {
        match self {
            Self::Win => 1,
            Self::Reset => 0,
        }
    }
}

/// What the session state machine hands to a recorder when a session ends.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct OutcomeReport {
    session_id: SessionId,
    user_id: UserId,
    total_moves: u32,
    outcome: Outcome,
    correct_guesses: u32,
}

impl OutcomeReport {
    /// Builds a report; the correct-guess count follows from the outcome.
    pub fn new(session_id: SessionId, user_id: UserId, total_moves: u32, outcome: Outcome) -> Self {
        Self {
            session_id,
            user_id,
            total_moves,
            outcome,
            correct_guesses: outcome.correct_guesses(),
        }
    }
}

/// One append-only statistics row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct OutcomeRecord {
    session_id: SessionId,
    user_id: UserId,
    total_moves: u32,
    outcome: Outcome,
    correct_guesses: u32,
    recorded_at: NaiveDateTime,
}

impl OutcomeRecord {
    /// Creates a record from its stored fields.
    pub fn new(
        session_id: SessionId,
        user_id: UserId,
        total_moves: u32,
        outcome: Outcome,
        correct_guesses: u32,
        recorded_at: NaiveDateTime,
    ) -> Self {
        Self {
            session_id,
            user_id,
            total_moves,
            outcome,
            correct_guesses,
            recorded_at,
        }
    }

    /// Stamps a report with the time it was persisted.
    pub fn from_report(report: &OutcomeReport, recorded_at: NaiveDateTime) -> Self {
        Self::new(
            report.session_id,
            report.user_id,
            report.total_moves,
            report.outcome,
            report.correct_guesses,
            recorded_at,
        )
    }
}

/// Sink for finished sessions.
///
/// The state machine calls [`record`](Self::record) at most once per session.
/// Implementations still key on the session id so that a repeated call for the
/// same session returns the existing record instead of appending a second one.
pub trait OutcomeRecorder {
    /// Appends the outcome of a finished session.
    ///
    /// # Errors
    ///
    /// Returns [`GameErrorKind::StorageFailure`](crate::GameErrorKind::StorageFailure)
    /// if the backend could not persist the record. Callers must propagate it.
    fn record(&self, report: &OutcomeReport) -> Result<OutcomeRecord, GameError>;
}

impl<T: OutcomeRecorder + ?Sized> OutcomeRecorder for &T {
    fn record(&self, report: &OutcomeReport) -> Result<OutcomeRecord, GameError> {
        (**self).record(report)
    }
}

impl<T: OutcomeRecorder + ?Sized> OutcomeRecorder for std::sync::Arc<T> {
    fn record(&self, report: &OutcomeReport) -> Result<OutcomeRecord, GameError> {
        (**self).record(report)
    }
}
