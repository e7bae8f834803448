//! Request and response bodies.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strictly_digits::{Code, Feedback, GameSession, GuessAttempt, SessionStatus};

use crate::db::User;

/// Request for registering a player profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    /// Unique display name.
    pub display_name: String,
}

/// A player profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    /// Id to send in the `x-user-id` header.
    pub id: i32,
    /// Display name.
    pub display_name: String,
    /// Registration time.
    pub created_at: NaiveDateTime,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: *user.id(),
            display_name: user.display_name().clone(),
            created_at: *user.created_at(),
        }
    }
}

/// Request for submitting a guess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuessRequest {
    /// Five ASCII digits.
    pub guess: String,
}

/// Client view of a session. The target is only revealed once the game ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    /// Session id, as a string because it may exceed 2^53.
    pub session_id: String,
    /// Lifecycle state.
    pub status: SessionStatus,
    /// Guesses submitted so far.
    pub moves: u32,
    /// Guess history with feedback.
    pub attempts: Vec<GuessAttempt>,
    /// The secret code, present only for finished sessions.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target: Option<Code>,
    /// When the session started.
    pub started_at: NaiveDateTime,
}

impl From<&GameSession> for SessionView {
    fn from(session: &GameSession) -> Self {
        Self {
            session_id: session.id().to_string(),
            status: *session.status(),
            moves: session.moves(),
            attempts: session.attempts().clone(),
            target: session.status().is_terminal().then(|| *session.target()),
            started_at: *session.started_at(),
        }
    }
}

/// Response to a guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessResponse {
    /// Marks for the submitted guess.
    pub feedback: Feedback,
    /// Session after the guess.
    pub session: SessionView,
}
