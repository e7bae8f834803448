//! Game sessions and their state transitions.
//!
//! A [`GameSession`] is a plain value: every operation takes the current
//! session by reference and returns the next one, leaving persistence to a
//! [`SessionStore`](crate::SessionStore). The only places that hand a session
//! to an [`OutcomeRecorder`] are the `Won` transition in
//! [`GameSession::submit_guess`] and the `Reset` transition in
//! [`GameSession::abandon`]; both leave the session terminal, so no session can
//! be recorded twice.

use chrono::{NaiveDateTime, Utc};
use derive_getters::Getters;
use derive_more::{Display, From};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{
    Code, Feedback, GameError, GameErrorKind, Outcome, OutcomeRecorder, OutcomeReport, evaluate,
};

/// Opaque identifier of an authenticated player.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct UserId(i32);

impl UserId {
    /// Wraps a raw user id.
    pub fn new(id: i32) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    pub fn get(self) -> i32 {
        self.0
    }
}

/// Identifier of one game session, unique per started game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    /// Wraps a raw session id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    /// Accepting guesses.
    InProgress,
    /// The target was guessed. Terminal.
    Won,
    /// Abandoned after at least one guess. Terminal.
    Reset,
}

impl SessionStatus {
    /// True for `Won` and `Reset`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// One submitted guess and its feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct GuessAttempt {
    guess: Code,
    feedback: Feedback,
}

impl GuessAttempt {
    /// Pairs a guess with its feedback.
    pub fn new(guess: Code, feedback: Feedback) -> Self {
        Self { guess, feedback }
    }
}

/// A single player's game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct GameSession {
    id: SessionId,
    owner: UserId,
    target: Code,
    attempts: Vec<GuessAttempt>,
    status: SessionStatus,
    started_at: NaiveDateTime,
}

impl GameSession {
    /// Starts a fresh game with a uniformly random target.
    ///
    /// Never records statistics. An in-progress session with guesses must be
    /// passed through [`abandon`](Self::abandon) before it is replaced.
    #[instrument]
    pub fn start(owner: UserId) -> Self {
        Self::start_with_rng(owner, &mut rand::thread_rng())
    }

    /// Starts a fresh game drawing the target and id from `rng`.
    pub fn start_with_rng<R: Rng>(owner: UserId, rng: &mut R) -> Self {
        let target = Code::random(rng);
        let id = SessionId::new(rng.next_u64());
        Self::build(id, owner, target)
    }

    /// Starts a game with a known target.
    #[instrument(skip(target))]
    pub fn with_target(owner: UserId, target: Code) -> Self {
        let id = SessionId::new(rand::thread_rng().next_u64());
        Self::build(id, owner, target)
    }

    fn build(id: SessionId, owner: UserId, target: Code) -> Self {
        info!(session_id = %id, %owner, "Starting new game session");
        Self {
            id,
            owner,
            target,
            attempts: Vec::new(),
            status: SessionStatus::InProgress,
            started_at: Utc::now().naive_utc(),
        }
    }

    /// Number of guesses submitted so far.
    pub fn moves(&self) -> u32 {
        self.attempts.len() as u32
    }

    /// Scores a raw guess and returns the next session with the attempt appended.
    ///
    /// On an exact match the returned session is `Won` and the outcome has
    /// already been recorded with `recorder`.
    ///
    /// # Errors
    ///
    /// - [`GameErrorKind::SessionTerminated`] if the session is `Won` or `Reset`.
    /// - [`GameErrorKind::InvalidFormat`] if `raw` is not exactly five ASCII digits.
    /// - [`GameErrorKind::StorageFailure`] if recording the win failed; the
    ///   winning guess is then not applied and may be resubmitted.
    ///
    /// `self` is never modified.
    #[instrument(skip(self, recorder), fields(session_id = %self.id, owner = %self.owner, moves = self.attempts.len()))]
    pub fn submit_guess<R>(&self, raw: &str, recorder: &R) -> Result<(GameSession, Feedback), GameError>
    where
        R: OutcomeRecorder + ?Sized,
    {
        if self.status.is_terminal() {
            warn!(status = %self.status, "Guess submitted to finished session");
            return Err(GameError::new(GameErrorKind::SessionTerminated(self.status)));
        }

        let guess = Code::parse(raw).inspect_err(|_| debug!("Guess rejected: bad format"))?;
        let feedback = evaluate(&self.target, &guess);

        let mut next = self.clone();
        next.attempts.push(GuessAttempt::new(guess, feedback));

        if guess == self.target {
            next.status = SessionStatus::Won;
            let report = OutcomeReport::new(next.id, next.owner, next.moves(), Outcome::Win);
            recorder.record(&report)?;
            info!(moves = next.moves(), "Target guessed, session won");
        } else {
            debug!(%feedback, "Guess evaluated");
        }

        Ok((next, feedback))
    }

    /// Gives up on an in-progress game.
    ///
    /// With no guesses yet, returns a brand new in-progress session with a
    /// freshly drawn target and records nothing. Otherwise records a `Reset`
    /// outcome and returns this session in the `Reset` state; the caller is
    /// expected to [`start`](Self::start) a replacement.
    ///
    /// # Errors
    ///
    /// - [`GameErrorKind::SessionTerminated`] if the session already ended.
    /// - [`GameErrorKind::StorageFailure`] if recording the reset failed.
    #[instrument(skip(self, recorder), fields(session_id = %self.id, owner = %self.owner, moves = self.attempts.len()))]
    pub fn abandon<R>(&self, recorder: &R) -> Result<GameSession, GameError>
    where
        R: OutcomeRecorder + ?Sized,
    {
        if self.status.is_terminal() {
            warn!(status = %self.status, "Abandon requested for finished session");
            return Err(GameError::new(GameErrorKind::SessionTerminated(self.status)));
        }

        if self.attempts.is_empty() {
            debug!("No guesses yet, drawing a new target without recording");
            return Ok(Self::start(self.owner));
        }

        let report = OutcomeReport::new(self.id, self.owner, self.moves(), Outcome::Reset);
        recorder.record(&report)?;

        let mut closed = self.clone();
        closed.status = SessionStatus::Reset;
        info!(moves = closed.moves(), "Session reset");
        Ok(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Mark, MemoryRecorder};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn session(target: &str) -> GameSession {
        GameSession::with_target(UserId::new(1), Code::parse(target).expect("valid target"))
    }

    #[test]
    fn test_start_is_in_progress_and_empty() {
        let s = GameSession::start(UserId::new(3));
        assert_eq!(*s.status(), SessionStatus::InProgress);
        assert!(s.attempts().is_empty());
        assert_eq!(*s.owner(), UserId::new(3));
        assert_eq!(s.target().to_string().len(), 5);
    }

    #[test]
    fn test_seeded_start_is_deterministic() {
        let a = GameSession::start_with_rng(UserId::new(1), &mut StdRng::seed_from_u64(42));
        let b = GameSession::start_with_rng(UserId::new(1), &mut StdRng::seed_from_u64(42));
        assert_eq!(a.target(), b.target());
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_guess_leaves_previous_session_untouched() {
        let recorder = MemoryRecorder::new();
        let s = session("12345");
        let (next, feedback) = s.submit_guess("12399", &recorder).expect("valid guess");

        assert!(s.attempts().is_empty());
        assert_eq!(next.attempts().len(), 1);
        assert_eq!(next.attempts()[0].guess().to_string(), "12399");
        assert_eq!(feedback.count(Mark::Correct), 3);
        assert_eq!(*next.status(), SessionStatus::InProgress);
        assert!(recorder.records().expect("records").is_empty());
    }

    #[test]
    fn test_invalid_guess_rejected() {
        let recorder = MemoryRecorder::new();
        let err = session("12345")
            .submit_guess("12 45", &recorder)
            .expect_err("bad format");
        assert!(matches!(err.kind(), GameErrorKind::InvalidFormat(_)));
    }

    #[test]
    fn test_terminal_status_checked_before_format() {
        let recorder = MemoryRecorder::new();
        let (won, _) = session("12345").submit_guess("12345", &recorder).expect("win");
        let err = won.submit_guess("oops", &recorder).expect_err("terminated");
        assert!(matches!(
            err.kind(),
            GameErrorKind::SessionTerminated(SessionStatus::Won)
        ));
    }

    #[test]
    fn test_abandon_reset_session_fails() {
        let recorder = MemoryRecorder::new();
        let (s, _) = session("12345").submit_guess("00000", &recorder).expect("guess");
        let reset = s.abandon(&recorder).expect("abandon");
        assert_eq!(*reset.status(), SessionStatus::Reset);

        let err = reset.abandon(&recorder).expect_err("already reset");
        assert!(matches!(
            err.kind(),
            GameErrorKind::SessionTerminated(SessionStatus::Reset)
        ));
        assert_eq!(recorder.records().expect("records").len(), 1);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(SessionStatus::InProgress.to_string(), "in_progress");
        assert!(SessionStatus::Won.is_terminal());
        assert!(!SessionStatus::InProgress.is_terminal());
    }
}
