//! Strictly Digits - five-digit code-breaking game core
//!
//! Pure game logic with no I/O beyond tracing: the player tries to find a
//! secret five-digit code and gets per-digit feedback after every guess.
//!
//! # Architecture
//!
//! - **Feedback**: [`Code`] parsing and the three-pass [`evaluate`] function
//! - **Session**: [`GameSession`] state machine (in progress, won, reset)
//! - **Stats**: [`OutcomeRecorder`] and [`StatisticsSource`] contracts
//! - **Store**: [`SessionStore`] contract, one live session per user
//!
//! # Example
//!
//! ```
//! use strictly_digits::{Code, GameSession, MemoryRecorder, SessionStatus, UserId};
//!
//! # fn example() -> Result<(), strictly_digits::GameError> {
//! let recorder = MemoryRecorder::new();
//! let session = GameSession::with_target(UserId::new(1), Code::parse("04321")?);
//!
//! let (session, feedback) = session.submit_guess("01234", &recorder)?;
//! assert_eq!(feedback.to_string(), "correct, misplaced, misplaced, misplaced, misplaced");
//!
//! let (session, _) = session.submit_guess("04321", &recorder)?;
//! assert_eq!(*session.status(), SessionStatus::Won);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod error;
mod feedback;
mod session;
mod stats;
mod store;

// Crate-level exports - Errors
pub use error::{GameError, GameErrorKind};

// Crate-level exports - Evaluator
pub use feedback::{CODE_LENGTH, CODE_SPACE, Code, Feedback, Mark, evaluate};

// Crate-level exports - Session state machine
pub use session::{GameSession, GuessAttempt, SessionId, SessionStatus, UserId};

// Crate-level exports - Statistics
pub use stats::{
    AggregateStatistics, MemoryRecorder, Outcome, OutcomeRecord, OutcomeRecorder, OutcomeReport,
    StatisticsSource, UserStatistics,
};

// Crate-level exports - Session storage
pub use store::{MemorySessionStore, SessionStore};
