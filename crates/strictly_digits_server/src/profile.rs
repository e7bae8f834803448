//! Player profile management on top of the repository.

use tracing::{debug, info, instrument, warn};

use crate::db::{DbError, GameRepository, User};

/// Outcome of a registration attempt.
#[derive(Debug, Clone)]
pub enum Registration {
    /// A new profile was created.
    Created(User),
    /// The display name is already taken by this profile.
    Taken(User),
}

/// Service layer for user profile operations.
///
/// Wraps [`GameRepository`] with get-or-create and registration semantics.
#[derive(Debug, Clone)]
pub struct ProfileService {
    repository: GameRepository,
}

impl ProfileService {
    /// Creates a new profile service backed by the given repository.
    #[instrument(skip(repository))]
    pub fn new(repository: GameRepository) -> Self {
        info!("Creating ProfileService");
        Self { repository }
    }

    /// Returns the underlying repository.
    pub fn repository(&self) -> &GameRepository {
        &self.repository
    }

    /// Returns an existing user by name or creates one if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the name is blank or a database error occurs.
    #[instrument(skip(self))]
    pub fn get_or_create_user(&self, display_name: &str) -> Result<User, DbError> {
        match self.register(display_name)? {
            Registration::Created(user) | Registration::Taken(user) => Ok(user),
        }
    }

    /// Creates a profile unless the name is already taken.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the name is blank or a database error occurs.
    #[instrument(skip(self))]
    pub fn register(&self, display_name: &str) -> Result<Registration, DbError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            warn!("Rejected blank display name");
            return Err(DbError::new("Display name must not be blank"));
        }

        if let Some(user) = self.repository.get_user_by_name(display_name)? {
            debug!(user_id = user.id(), "Existing user found");
            return Ok(Registration::Taken(user));
        }

        info!(display_name = %display_name, "Creating new user");
        Ok(Registration::Created(
            self.repository.create_user(display_name.to_string())?,
        ))
    }

    /// Looks up a profile by name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    pub fn find(&self, display_name: &str) -> Result<Option<User>, DbError> {
        self.repository.get_user_by_name(display_name.trim())
    }

    /// Lists every profile.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    pub fn list(&self) -> Result<Vec<User>, DbError> {
        self.repository.list_users()
    }
}
