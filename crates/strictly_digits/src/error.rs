//! Game error types.

use derive_more::{Display, Error};
use tracing::instrument;

use crate::{SessionStatus, UserId};

/// What went wrong while handling a player's request.
///
/// Every kind is local to one user's request; none of them is fatal to the
/// process.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum GameErrorKind {
    /// The guess was not exactly five ASCII digits.
    #[display("Invalid guess '{}': expected exactly 5 digits", _0)]
    InvalidFormat(String),

    /// A guess or abandon was attempted on a session that already ended.
    #[display("Session already ended with status '{}'", _0)]
    SessionTerminated(SessionStatus),

    /// The user has no live session.
    #[display("No active session for user {}", _0)]
    NoActiveSession(UserId),

    /// A session or statistics backend failed.
    #[display("Storage failure: {}", _0)]
    StorageFailure(String),
}

/// Game error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("{} at {}:{}", kind, file, line)]
pub struct GameError {
    /// The error category.
    pub kind: GameErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl GameError {
    /// Creates a new game error with caller location tracking.
    #[track_caller]
    #[instrument]
    pub fn new(kind: GameErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Shorthand for a [`GameErrorKind::StorageFailure`].
    #[track_caller]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(GameErrorKind::StorageFailure(message.into()))
    }

    /// Returns the error category.
    pub fn kind(&self) -> &GameErrorKind {
        &self.kind
    }

    /// Whether the player can keep going after this error.
    ///
    /// Always true today; storage failures leave the session as it was before
    /// the request so the same request can be retried.
    pub fn is_recoverable(&self) -> bool {
        match self.kind {
            GameErrorKind::InvalidFormat(_)
            | GameErrorKind::SessionTerminated(_)
            | GameErrorKind::NoActiveSession(_)
            | GameErrorKind::StorageFailure(_) => true,
        }
    }
}

impl From<GameErrorKind> for GameError {
    #[track_caller]
    fn from(kind: GameErrorKind) -> Self {
        Self::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_records_caller_location() {
        let err = GameError::new(GameErrorKind::InvalidFormat("12a45".into()));
        assert!(err.file.ends_with("error.rs"));
        assert!(err.line > 0);
        assert!(err.to_string().contains("12a45"));
    }

    #[test]
    fn test_storage_shorthand() {
        let err = GameError::storage("disk full");
        assert_eq!(
            err.kind(),
            &GameErrorKind::StorageFailure("disk full".to_string())
        );
        assert!(err.is_recoverable());
    }
}
