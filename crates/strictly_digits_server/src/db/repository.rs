//! Database repository for users, outcome records, and logged guesses.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use strictly_digits::{
    AggregateStatistics, GameError, GameSession, GuessAttempt, OutcomeRecord, OutcomeRecorder,
    OutcomeReport, SessionId, StatisticsSource, UserId, UserStatistics,
};
use tracing::{debug, info, instrument, warn};

use crate::db::{DbError, GuessRow, NewGuessRow, NewOutcomeRow, NewUser, OutcomeRow, User, schema};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Database repository for user and game operations.
#[derive(Debug, Clone)]
pub struct GameRepository {
    db_path: String,
}

impl GameRepository {
    /// Creates a repository for the database at the given path.
    ///
    /// Each operation opens its own connection, so an in-memory path would
    /// lose its contents between calls; tests use a temporary file instead.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is empty.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        if db_path.trim().is_empty() {
            return Err(DbError::new("Database path is empty"));
        }
        info!(path = %db_path, "Creating GameRepository");
        Ok(Self { db_path })
    }

    /// Creates a repository and brings its schema up to date.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be opened or migrated.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn open(db_path: String) -> Result<Self, DbError> {
        let repository = Self::new(db_path)?;
        repository.run_migrations()?;
        Ok(repository)
    }

    /// Applies any pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a migration fails.
    #[instrument(skip(self))]
    pub fn run_migrations(&self) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(format!("Migrations failed: {}", e)))?;
        info!(count = applied.len(), "Migrations applied");
        Ok(())
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        let mut conn = SqliteConnection::establish(&self.db_path)
            .map_err(|e| DbError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))?;
        conn.batch_execute("PRAGMA busy_timeout = 5000;")?;
        Ok(conn)
    }

    /// Creates a new user profile.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the display name is already taken or a database error occurs.
    #[instrument(skip(self))]
    pub fn create_user(&self, display_name: String) -> Result<User, DbError> {
        debug!(display_name = %display_name, "Creating user");
        let mut conn = self.connection()?;

        let user = diesel::insert_into(schema::users::table)
            .values(&NewUser::new(display_name))
            .returning(User::as_returning())
            .get_result(&mut conn)?;

        info!(user_id = user.id(), display_name = %user.display_name(), "User created");
        Ok(user)
    }

    /// Gets a user by id. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_user(&self, user: UserId) -> Result<Option<User>, DbError> {
        let mut conn = self.connection()?;
        let found = schema::users::table
            .find(user.get())
            .first::<User>(&mut conn)
            .optional()?;
        debug!(found = found.is_some(), "User lookup by id");
        Ok(found)
    }

    /// Gets a user by display name. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_user_by_name(&self, display_name: &str) -> Result<Option<User>, DbError> {
        debug!(display_name = %display_name, "Looking up user by name");
        let mut conn = self.connection()?;

        let user = schema::users::table
            .filter(schema::users::display_name.eq(display_name))
            .first::<User>(&mut conn)
            .optional()?;

        if let Some(ref u) = user {
            debug!(user_id = u.id(), "User found");
        } else {
            debug!("User not found");
        }

        Ok(user)
    }

    /// Lists all user profiles, ordered by creation.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_users(&self) -> Result<Vec<User>, DbError> {
        let mut conn = self.connection()?;

        let users = schema::users::table
            .order(schema::users::id.asc())
            .load::<User>(&mut conn)?;

        info!(count = users.len(), "Users loaded");
        Ok(users)
    }

    /// Counts registered users.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn count_users(&self) -> Result<u64, DbError> {
        let mut conn = self.connection()?;
        let count: i64 = schema::users::table.count().get_result(&mut conn)?;
        Ok(count as u64)
    }

    /// Appends an outcome record unless the session already has one.
    ///
    /// A repeated report for the same session returns the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, report), fields(session_id = %report.session_id(), user_id = %report.user_id(), outcome = %report.outcome()))]
    pub fn record_outcome(&self, report: &OutcomeReport) -> Result<OutcomeRecord, DbError> {
        let row = NewOutcomeRow::from_report(report)?;
        let mut conn = self.connection()?;

        let stored = conn.immediate_transaction::<_, DbError, _>(|conn| {
            let existing = schema::outcome_records::table
                .filter(schema::outcome_records::session_id.eq(row.session_id()))
                .select(OutcomeRow::as_select())
                .first(conn)
                .optional()?;

            if let Some(existing) = existing {
                warn!(row_id = existing.id(), "Outcome already recorded for session, keeping the existing record");
                return Ok(existing);
            }

            Ok(diesel::insert_into(schema::outcome_records::table)
                .values(&row)
                .returning(OutcomeRow::as_returning())
                .get_result(conn)?)
        })?;

        info!(row_id = stored.id(), total_moves = stored.total_moves(), "Outcome recorded");
        stored.to_record()
    }

    /// Loads every outcome record, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs or a row is malformed.
    #[instrument(skip(self))]
    pub fn all_outcomes(&self) -> Result<Vec<OutcomeRecord>, DbError> {
        let mut conn = self.connection()?;
        let rows = schema::outcome_records::table
            .order(schema::outcome_records::id.asc())
            .select(OutcomeRow::as_select())
            .load(&mut conn)?;
        debug!(count = rows.len(), "Outcome records loaded");
        rows.iter().map(OutcomeRow::to_record).collect()
    }

    /// Loads a user's outcome records, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs or a row is malformed.
    #[instrument(skip(self))]
    pub fn user_outcomes(&self, user: UserId) -> Result<Vec<OutcomeRecord>, DbError> {
        let mut conn = self.connection()?;
        let rows = schema::outcome_records::table
            .filter(schema::outcome_records::user_id.eq(user.get()))
            .order(schema::outcome_records::id.desc())
            .select(OutcomeRow::as_select())
            .load(&mut conn)?;
        info!(%user, count = rows.len(), "User outcomes loaded");
        rows.iter().map(OutcomeRow::to_record).collect()
    }

    /// Logs one evaluated guess.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, session, attempt), fields(session_id = %session.id(), guess = %attempt.guess()))]
    pub fn record_guess(&self, session: &GameSession, attempt: &GuessAttempt) -> Result<GuessRow, DbError> {
        let row = NewGuessRow::from_attempt(session, attempt)?;
        let mut conn = self.connection()?;

        let stored = diesel::insert_into(schema::guesses::table)
            .values(&row)
            .returning(GuessRow::as_returning())
            .get_result(&mut conn)?;

        debug!(row_id = stored.id(), "Guess logged");
        Ok(stored)
    }

    /// Loads the logged guesses of one session in submission order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn session_guesses(&self, session: SessionId) -> Result<Vec<GuessRow>, DbError> {
        let mut conn = self.connection()?;
        let rows = schema::guesses::table
            .filter(schema::guesses::session_id.eq(session.to_string()))
            .order(schema::guesses::id.asc())
            .load::<GuessRow>(&mut conn)?;
        Ok(rows)
    }
}

impl OutcomeRecorder for GameRepository {
    fn record(&self, report: &OutcomeReport) -> Result<OutcomeRecord, GameError> {
        Ok(self.record_outcome(report)?)
    }
}

impl StatisticsSource for GameRepository {
    #[instrument(skip(self))]
    fn aggregate_statistics(&self) -> Result<AggregateStatistics, GameError> {
        let total_users = self.count_users()?;
        let records = self.all_outcomes()?;
        Ok(AggregateStatistics::from_records(total_users, &records))
    }

    #[instrument(skip(self))]
    fn user_statistics(&self, user: UserId) -> Result<UserStatistics, GameError> {
        let records = self.user_outcomes(user)?;
        let stats = UserStatistics::from_records(&records);
        info!(
            %user,
            total = stats.total_games(),
            wins = stats.total_wins(),
            win_ratio = %format!("{:.2}%", stats.win_ratio_percent()),
            "User statistics computed"
        );
        Ok(stats)
    }

    fn user_history(&self, user: UserId) -> Result<Vec<OutcomeRecord>, GameError> {
        Ok(self.user_outcomes(user)?)
    }
}
