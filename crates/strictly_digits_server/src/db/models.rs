//! Database models and their conversions to game types.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use serde::Serialize;
use strictly_digits::{
    Feedback, GameSession, GuessAttempt, Outcome, OutcomeRecord, OutcomeReport, SessionId, UserId,
};
use tracing::instrument;

use crate::db::{DbError, schema};

/// User profile database model.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters, Serialize)]
#[diesel(table_name = schema::users)]
pub struct User {
    id: i32,
    display_name: String,
    created_at: NaiveDateTime,
}

impl User {
    /// The game-level identity of this user.
    pub fn user_id(&self) -> UserId {
        UserId::new(self.id)
    }
}

/// Insertable user model for creating new users.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::users)]
pub struct NewUser {
    display_name: String,
}

/// Outcome record database model.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters)]
#[diesel(table_name = schema::outcome_records)]
#[diesel(belongs_to(User))]
pub struct OutcomeRow {
    id: i32,
    session_id: String,
    user_id: i32,
    total_moves: i32,
    outcome: String,
    total_correct_guesses: i32,
    recorded_at: NaiveDateTime,
}

impl OutcomeRow {
    /// Converts the stored row into an [`OutcomeRecord`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a stored column holds a value the game cannot represent.
    #[instrument(skip(self), fields(row_id = self.id))]
    pub fn to_record(&self) -> Result<OutcomeRecord, DbError> {
        let session_id = self
            .session_id
            .parse::<u64>()
            .map_err(|e| DbError::new(format!("Invalid session id '{}': {}", self.session_id, e)))?;
        let outcome = Outcome::from_db_string(&self.outcome)
            .map_err(|_| DbError::new(format!("Invalid outcome: '{}'", self.outcome)))?;

        Ok(OutcomeRecord::new(
            SessionId::new(session_id),
            UserId::new(self.user_id),
            non_negative(self.total_moves, "total_moves")?,
            outcome,
            non_negative(self.total_correct_guesses, "total_correct_guesses")?,
            self.recorded_at,
        ))
    }
}

fn non_negative(value: i32, column: &str) -> Result<u32, DbError> {
    u32::try_from(value).map_err(|_| DbError::new(format!("Negative {}: {}", column, value)))
}

/// Insertable outcome record.
#[derive(Debug, Clone, Insertable, Getters)]
#[diesel(table_name = schema::outcome_records)]
pub struct NewOutcomeRow {
    session_id: String,
    user_id: i32,
    total_moves: i32,
    outcome: String,
    total_correct_guesses: i32,
}

impl NewOutcomeRow {
    /// Builds the insertable row for a finished session.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the move count does not fit the column.
    pub fn from_report(report: &OutcomeReport) -> Result<Self, DbError> {
        let total_moves = i32::try_from(*report.total_moves())
            .map_err(|_| DbError::new(format!("Move count too large: {}", report.total_moves())))?;
        Ok(Self {
            session_id: report.session_id().to_string(),
            user_id: report.user_id().get(),
            total_moves,
            outcome: report.outcome().to_db_string().to_string(),
            total_correct_guesses: *report.correct_guesses() as i32,
        })
    }
}

/// Logged guess database model.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters)]
#[diesel(table_name = schema::guesses)]
#[diesel(belongs_to(User))]
pub struct GuessRow {
    id: i32,
    session_id: String,
    user_id: i32,
    guess: String,
    feedback: String,
    created_at: NaiveDateTime,
}

impl GuessRow {
    /// Decodes the stored JSON feedback.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the column is not a valid feedback array.
    #[instrument(skip(self), fields(row_id = self.id))]
    pub fn parse_feedback(&self) -> Result<Feedback, DbError> {
        Ok(serde_json::from_str(&self.feedback)?)
    }
}

/// Insertable guess log entry.
#[derive(Debug, Clone, Insertable, Getters)]
#[diesel(table_name = schema::guesses)]
pub struct NewGuessRow {
    session_id: String,
    user_id: i32,
    guess: String,
    feedback: String,
}

impl NewGuessRow {
    /// Builds the log entry for an attempt made in `session`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the feedback cannot be encoded.
    pub fn from_attempt(session: &GameSession, attempt: &GuessAttempt) -> Result<Self, DbError> {
        Ok(Self {
            session_id: session.id().to_string(),
            user_id: session.owner().get(),
            guess: attempt.guess().to_string(),
            feedback: serde_json::to_string(attempt.feedback())?,
        })
    }
}
