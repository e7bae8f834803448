//! Session storage contract and an in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, instrument};

use crate::{GameError, GameSession, UserId};

/// One live session slot per user.
///
/// The store does not reconcile concurrent writers for the same user; callers
/// that allow concurrent requests must serialize them per user around the
/// whole get/transition/put sequence.
pub trait SessionStore {
    /// Loads the user's live session, if any.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the backend cannot be read.
    fn get(&self, user: UserId) -> Result<Option<GameSession>, GameError>;

    /// Stores `session` in its owner's slot, replacing whatever was there.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the backend cannot be written.
    fn put(&self, session: GameSession) -> Result<(), GameError>;

    /// Clears the user's slot and returns what it held.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the backend cannot be written.
    fn remove(&self, user: UserId) -> Result<Option<GameSession>, GameError>;
}

/// Session store backed by a shared map. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<Mutex<HashMap<UserId, GameSession>>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating in-memory session store");
        Self::default()
    }

    fn sessions(&self) -> Result<MutexGuard<'_, HashMap<UserId, GameSession>>, GameError> {
        self.sessions
            .lock()
            .map_err(|_| GameError::storage("session map lock poisoned"))
    }

    /// Number of users with a live session.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the map lock is poisoned.
    pub fn len(&self) -> Result<usize, GameError> {
        Ok(self.sessions()?.len())
    }

    /// True when no user has a live session.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the map lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, GameError> {
        Ok(self.sessions()?.is_empty())
    }
}

impl SessionStore for MemorySessionStore {
    #[instrument(skip(self))]
    fn get(&self, user: UserId) -> Result<Option<GameSession>, GameError> {
        let session = self.sessions()?.get(&user).cloned();
        if session.is_none() {
            debug!(%user, "Session not found");
        }
        Ok(session)
    }

    #[instrument(skip(self, session), fields(session_id = %session.id(), owner = %session.owner()))]
    fn put(&self, session: GameSession) -> Result<(), GameError> {
        self.sessions()?.insert(*session.owner(), session);
        debug!("Session stored");
        Ok(())
    }

    #[instrument(skip(self))]
    fn remove(&self, user: UserId) -> Result<Option<GameSession>, GameError> {
        let removed = self.sessions()?.remove(&user);
        debug!(%user, removed = removed.is_some(), "Session slot cleared");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_replaces_previous_session() {
        let store = MemorySessionStore::new();
        let user = UserId::new(1);
        let first = GameSession::start(user);
        let second = GameSession::start(user);

        store.put(first).expect("put");
        store.put(second.clone()).expect("put");

        assert_eq!(store.len().expect("len"), 1);
        assert_eq!(store.get(user).expect("get"), Some(second));
    }

    #[test]
    fn test_remove_clears_slot() {
        let store = MemorySessionStore::new();
        let user = UserId::new(2);
        store.put(GameSession::start(user)).expect("put");

        assert!(store.remove(user).expect("remove").is_some());
        assert!(store.get(user).expect("get").is_none());
        assert!(store.is_empty().expect("is_empty"));
    }

    #[test]
    fn test_clones_share_state() {
        let store = MemorySessionStore::new();
        let other = store.clone();
        store.put(GameSession::start(UserId::new(5))).expect("put");
        assert!(other.get(UserId::new(5)).expect("get").is_some());
    }
}
