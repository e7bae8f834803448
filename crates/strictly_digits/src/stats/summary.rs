//! Aggregate and per-user statistics.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{GameError, Outcome, OutcomeRecord, UserId};

/// Statistics over every recorded game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct AggregateStatistics {
    total_users: u64,
    total_games_played: u64,
    average_moves_per_game: f64,
    total_correct_guesses: u64,
}

impl AggregateStatistics {
    /// Summarizes `records`; `total_users` comes from the separate users collection.
    ///
    /// The average covers all records regardless of outcome and is rounded to
    /// one decimal place.
    #[instrument(skip(records), fields(records = records.len()))]
    pub fn from_records(total_users: u64, records: &[OutcomeRecord]) -> Self {
        let total_games_played = records.len() as u64;
        let total_moves: u64 = records.iter().map(|r| u64::from(*r.total_moves())).sum();
        let total_correct_guesses = records.iter().map(|r| u64::from(*r.correct_guesses())).sum();

        let stats = Self {
            total_users,
            total_games_played,
            average_moves_per_game: round_to(average(total_moves, total_games_played), 1),
            total_correct_guesses,
        };
        debug!(?stats, "Aggregate statistics computed");
        stats
    }
}

/// Statistics scoped to one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct UserStatistics {
    total_games: u64,
    total_wins: u64,
    average_moves: f64,
    win_ratio_percent: f64,
}

impl UserStatistics {
    /// Summarizes one user's records.
    ///
    /// A user with no games gets zeros everywhere, including the win ratio.
    #[instrument(skip(records), fields(records = records.len()))]
    pub fn from_records(records: &[OutcomeRecord]) -> Self {
        let total_games = records.len() as u64;
        let total_wins = records
            .iter()
            .filter(|r| *r.outcome() == Outcome::Win)
            .count() as u64;
        let total_moves: u64 = records.iter().map(|r| u64::from(*r.total_moves())).sum();

        Self {
            total_games,
            total_wins,
            average_moves: round_to(average(total_moves, total_games), 2),
            win_ratio_percent: round_to(average(total_wins * 100, total_games), 2),
        }
    }
}

/// Read-only statistics queries.
///
/// Results may lag concurrent recording slightly; no linearizability is promised.
pub trait StatisticsSource {
    /// Totals over all users and games.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the backend cannot be read.
    fn aggregate_statistics(&self) -> Result<AggregateStatistics, GameError>;

    /// Totals for one user.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the backend cannot be read.
    fn user_statistics(&self, user: UserId) -> Result<UserStatistics, GameError>;

    /// A user's records, most recent first.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the backend cannot be read.
    fn user_history(&self, user: UserId) -> Result<Vec<OutcomeRecord>, GameError>;
}

fn average(total: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
