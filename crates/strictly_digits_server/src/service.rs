//! Game service: sessions, guesses, and statistics for many players.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use strictly_digits::{
    AggregateStatistics, Feedback, GameError, GameErrorKind, GameSession, GuessAttempt,
    OutcomeRecord, OutcomeRecorder, SessionStatus, SessionStore, StatisticsSource, UserId,
    UserStatistics,
};
use tracing::{debug, info, instrument, warn};

use crate::db::GameRepository;

/// Sink for every evaluated guess.
pub trait GuessLog: Send + Sync {
    /// Persists `attempt`, the newest attempt of `session`.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the log cannot be written.
    fn log_guess(&self, session: &GameSession, attempt: &GuessAttempt) -> Result<(), GameError>;
}

impl GuessLog for GameRepository {
    fn log_guess(&self, session: &GameSession, attempt: &GuessAttempt) -> Result<(), GameError> {
        self.record_guess(session, attempt)?;
        Ok(())
    }
}

/// Result of a guess: the updated session and the marks for the guess.
#[derive(Debug, Clone)]
pub struct GuessResult {
    /// Session after the guess was applied.
    pub session: GameSession,
    /// Per-digit marks for the guess.
    pub feedback: Feedback,
}

/// Runs games for many players over a session store and an outcome recorder.
///
/// Every mutating call for a user holds that user's lock from reading the
/// session until the new session is stored, so concurrent requests for the
/// same user are applied one after the other. Statistics queries take no lock.
/// A user's lock entry is dropped again when their session ends.
#[derive(Clone)]
pub struct GameService<S, R> {
    sessions: S,
    recorder: R,
    guess_log: Option<Arc<dyn GuessLog>>,
    user_locks: Arc<Mutex<HashMap<UserId, Arc<Mutex<()>>>>>,
}

impl<S, R> GameService<S, R>
where
    S: SessionStore,
    R: OutcomeRecorder + StatisticsSource,
{
    /// Creates a service over the given store and recorder.
    #[instrument(skip_all)]
    pub fn new(sessions: S, recorder: R) -> Self {
        info!("Creating GameService");
        Self {
            sessions,
            recorder,
            guess_log: None,
            user_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Logs every evaluated guess to `log`.
    pub fn with_guess_log(mut self, log: Arc<dyn GuessLog>) -> Self {
        self.guess_log = Some(log);
        self
    }

    /// Returns the outcome recorder.
    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    fn user_lock(&self, user: UserId) -> Result<Arc<Mutex<()>>, GameError> {
        let mut locks = self
            .user_locks
            .lock()
            .map_err(|_| GameError::storage("user lock table poisoned"))?;
        Ok(locks.entry(user).or_default().clone())
    }

    /// Runs `f` while holding the user's lock.
    fn exclusive<T>(
        &self,
        user: UserId,
        f: impl FnOnce() -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let lock = self.user_lock(user)?;
        let _guard = lock
            .lock()
            .map_err(|_| GameError::storage(format!("session lock for user {} poisoned", user)))?;
        f()
    }

    /// Returns the user's live session.
    ///
    /// # Errors
    ///
    /// Returns [`GameErrorKind::NoActiveSession`] if the user has none.
    #[instrument(skip(self))]
    pub fn current_game(&self, user: UserId) -> Result<GameSession, GameError> {
        self.sessions
            .get(user)?
            .ok_or_else(|| GameError::new(GameErrorKind::NoActiveSession(user)))
    }

    /// Starts a new game for the user, closing out the current one.
    ///
    /// An in-progress game goes through [`GameSession::abandon`], which records
    /// a reset if any guess was made. Finished games are simply replaced.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if recording or storing fails; the previous
    /// session then stays in place.
    #[instrument(skip(self))]
    pub fn new_game(&self, user: UserId) -> Result<GameSession, GameError> {
        self.exclusive(user, || {
            let next = match self.sessions.get(user)? {
                Some(current) if *current.status() == SessionStatus::InProgress => {
                    let abandoned = current.abandon(&self.recorder)?;
                    if abandoned.status().is_terminal() {
                        GameSession::start(user)
                    } else {
                        abandoned
                    }
                }
                Some(finished) => {
                    debug!(status = %finished.status(), "Replacing finished session");
                    GameSession::start(user)
                }
                None => GameSession::start(user),
            };

            self.sessions.put(next.clone())?;
            info!(session_id = %next.id(), "New game ready");
            Ok(next)
        })
    }

    /// Submits a guess for the user's live session.
    ///
    /// Surrounding whitespace is trimmed before validation.
    ///
    /// # Errors
    ///
    /// - [`GameErrorKind::NoActiveSession`] if the user has no session.
    /// - [`GameErrorKind::InvalidFormat`] or [`GameErrorKind::SessionTerminated`]
    ///   from the state machine, with the session left unchanged.
    /// - A storage failure from recording, logging, or storing.
    ///
    /// The new session is stored before the guess is logged, so a failed log
    /// write is reported after the guess has already been applied.
    #[instrument(skip(self, raw))]
    pub fn guess(&self, user: UserId, raw: &str) -> Result<GuessResult, GameError> {
        self.exclusive(user, || {
            let current = self.current_game(user)?;
            let (next, feedback) = current.submit_guess(raw.trim(), &self.recorder)?;

            self.sessions.put(next.clone())?;

            if let (Some(log), Some(attempt)) = (&self.guess_log, next.attempts().last()) {
                log.log_guess(&next, attempt).inspect_err(|e| {
                    warn!(error = %e, status = %next.status(), "Guess applied but not logged")
                })?;
            }

            debug!(moves = next.moves(), status = %next.status(), "Guess applied");
            Ok(GuessResult {
                session: next,
                feedback,
            })
        })
    }

    /// Discards the user's live session without recording anything.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the store cannot be written.
    #[instrument(skip(self))]
    pub fn end_session(&self, user: UserId) -> Result<Option<GameSession>, GameError> {
        let removed = self.exclusive(user, || {
            let removed = self.sessions.remove(user)?;
            info!(had_session = removed.is_some(), "Session ended");
            Ok(removed)
        })?;
        self.release_lock(user)?;
        Ok(removed)
    }

    /// Drops the user's lock entry unless another request holds or awaits it.
    ///
    /// Lock handles are only cloned under the table lock, so a count of one
    /// means the table holds the sole reference.
    fn release_lock(&self, user: UserId) -> Result<(), GameError> {
        let mut locks = self
            .user_locks
            .lock()
            .map_err(|_| GameError::storage("user lock table poisoned"))?;
        if locks.get(&user).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&user);
            debug!(%user, "User lock released");
        }
        Ok(())
    }

    /// Totals over all users.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if statistics cannot be read.
    pub fn aggregate_statistics(&self) -> Result<AggregateStatistics, GameError> {
        self.recorder.aggregate_statistics()
    }

    /// Totals for one user.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if statistics cannot be read.
    pub fn user_statistics(&self, user: UserId) -> Result<UserStatistics, GameError> {
        self.recorder.user_statistics(user)
    }

    /// A user's finished games, most recent first.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if statistics cannot be read.
    pub fn user_history(&self, user: UserId) -> Result<Vec<OutcomeRecord>, GameError> {
        self.recorder.user_history(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strictly_digits::{Code, MemoryRecorder, MemorySessionStore, Outcome};

    fn service() -> GameService<MemorySessionStore, MemoryRecorder> {
        GameService::new(MemorySessionStore::new(), MemoryRecorder::new())
    }

    fn with_target(
        service: &GameService<MemorySessionStore, MemoryRecorder>,
        user: UserId,
        target: &str,
    ) {
        let session = GameSession::with_target(user, Code::parse(target).expect("valid"));
        service.sessions.put(session).expect("put");
    }

    #[test]
    fn test_guess_without_session_fails() {
        let err = service().guess(UserId::new(1), "12345").expect_err("no session");
        assert!(matches!(err.kind(), GameErrorKind::NoActiveSession(_)));
    }

    #[test]
    fn test_guess_is_trimmed() {
        let svc = service();
        let user = UserId::new(1);
        with_target(&svc, user, "12345");
        let result = svc.guess(user, "  12345\n").expect("guess");
        assert!(result.feedback.is_solved());
        assert_eq!(*result.session.status(), SessionStatus::Won);
    }

    #[test]
    fn test_new_game_after_guess_records_reset() {
        let svc = service();
        let user = UserId::new(1);
        with_target(&svc, user, "12345");
        svc.guess(user, "00000").expect("guess");

        let fresh = svc.new_game(user).expect("new game");
        assert_eq!(*fresh.status(), SessionStatus::InProgress);
        assert!(fresh.attempts().is_empty());

        let records = svc.recorder().records().expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(*records[0].outcome(), Outcome::Reset);
    }

    #[test]
    fn test_new_game_after_win_records_nothing_more() {
        let svc = service();
        let user = UserId::new(1);
        with_target(&svc, user, "12345");
        svc.guess(user, "12345").expect("win");
        svc.new_game(user).expect("new game");
        svc.new_game(user).expect("new game again");

        let records = svc.recorder().records().expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(*records[0].outcome(), Outcome::Win);
    }

    #[test]
    fn test_end_session_records_nothing() {
        let svc = service();
        let user = UserId::new(1);
        with_target(&svc, user, "12345");
        svc.guess(user, "11111").expect("guess");

        assert!(svc.end_session(user).expect("end").is_some());
        assert!(svc.recorder().records().expect("records").is_empty());
        assert!(matches!(
            svc.current_game(user).expect_err("gone").kind(),
            GameErrorKind::NoActiveSession(_)
        ));
    }

    struct BrokenLog;

    impl GuessLog for BrokenLog {
        fn log_guess(&self, _: &GameSession, _: &GuessAttempt) -> Result<(), GameError> {
            Err(GameError::storage("log down"))
        }
    }

    #[test]
    fn test_failed_log_still_stores_winning_session() {
        let svc = service().with_guess_log(Arc::new(BrokenLog));
        let user = UserId::new(1);
        with_target(&svc, user, "12345");

        let err = svc.guess(user, "12345").expect_err("log failure surfaces");
        assert!(matches!(err.kind(), GameErrorKind::StorageFailure(_)));

        let stored = svc.current_game(user).expect("session kept");
        assert_eq!(*stored.status(), SessionStatus::Won);
        assert_eq!(stored.moves(), 1);

        let again = svc.guess(user, "12345").expect_err("already won");
        assert!(matches!(again.kind(), GameErrorKind::SessionTerminated(_)));

        svc.new_game(user).expect("new game");
        let records = svc.recorder().records().expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(*records[0].outcome(), Outcome::Win);
        assert_eq!(*records[0].total_moves(), 1);
    }

    #[test]
    fn test_concurrent_winning_guesses_apply_once() {
        let svc = Arc::new(service());
        let user = UserId::new(7);
        with_target(&svc, user, "24680");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let svc = Arc::clone(&svc);
                std::thread::spawn(move || svc.guess(user, "24680"))
            })
            .collect();
        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread panicked"))
            .collect();

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let session = svc.current_game(user).expect("session");
        assert_eq!(ok, 1);
        assert_eq!(session.moves() as usize, ok);
        assert_eq!(*session.status(), SessionStatus::Won);
        assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|e| matches!(
            e.kind(),
            GameErrorKind::SessionTerminated(SessionStatus::Won)
        )));
        assert_eq!(svc.recorder().records().expect("records").len(), 1);
    }

    #[test]
    fn test_concurrent_guesses_are_serialized() {
        let svc = Arc::new(service());
        let user = UserId::new(8);
        with_target(&svc, user, "24680");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let svc = Arc::clone(&svc);
                std::thread::spawn(move || svc.guess(user, "11111"))
            })
            .collect();
        let ok = handles
            .into_iter()
            .map(|h| h.join().expect("thread panicked"))
            .filter(Result::is_ok)
            .count();

        let session = svc.current_game(user).expect("session");
        assert_eq!(ok, 16);
        assert_eq!(session.moves() as usize, ok);
        assert!(svc.recorder().records().expect("records").is_empty());
    }

    #[test]
    fn test_end_session_releases_user_lock() {
        let svc = service();
        let user = UserId::new(1);
        with_target(&svc, user, "12345");
        svc.guess(user, "11111").expect("guess");
        assert_eq!(svc.user_locks.lock().expect("locks").len(), 1);

        svc.end_session(user).expect("end");
        assert!(svc.user_locks.lock().expect("locks").is_empty());
    }
}
