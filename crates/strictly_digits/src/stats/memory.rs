//! In-process statistics backend.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::{
    AggregateStatistics, GameError, OutcomeRecord, OutcomeRecorder, OutcomeReport,
    StatisticsSource, UserId, UserStatistics,
};

#[derive(Debug, Default)]
struct Ledger {
    users: BTreeSet<UserId>,
    records: Vec<OutcomeRecord>,
}

/// Outcome recorder and statistics source that keeps everything in memory.
///
/// Clones share the same ledger.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecorder {
    ledger: Arc<Mutex<Ledger>>,
}

impl MemoryRecorder {
    /// Creates an empty recorder.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating in-memory outcome recorder");
        Self::default()
    }

    fn ledger(&self) -> Result<MutexGuard<'_, Ledger>, GameError> {
        self.ledger
            .lock()
            .map_err(|_| GameError::storage("outcome ledger lock poisoned"))
    }

    /// Adds a user to the users collection counted by aggregate statistics.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the ledger lock is poisoned.
    #[instrument(skip(self))]
    pub fn register_user(&self, user: UserId) -> Result<(), GameError> {
        let inserted = self.ledger()?.users.insert(user);
        debug!(%user, inserted, "User registered");
        Ok(())
    }

    /// Returns a snapshot of every record in insertion order.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the ledger lock is poisoned.
    pub fn records(&self) -> Result<Vec<OutcomeRecord>, GameError> {
        Ok(self.ledger()?.records.clone())
    }
}

impl OutcomeRecorder for MemoryRecorder {
    #[instrument(skip(self, report), fields(session_id = %report.session_id(), user_id = %report.user_id(), outcome = %report.outcome()))]
    fn record(&self, report: &OutcomeReport) -> Result<OutcomeRecord, GameError> {
        let mut ledger = self.ledger()?;

        if let Some(existing) = ledger
            .records
            .iter()
            .find(|r| r.session_id() == report.session_id())
        {
            warn!("Outcome already recorded for session, keeping the existing record");
            return Ok(existing.clone());
        }

        let record = OutcomeRecord::from_report(report, Utc::now().naive_utc());
        ledger.users.insert(*report.user_id());
        ledger.records.push(record.clone());

        info!(total_moves = report.total_moves(), "Outcome recorded");
        Ok(record)
    }
}

impl StatisticsSource for MemoryRecorder {
    #[instrument(skip(self))]
    fn aggregate_statistics(&self) -> Result<AggregateStatistics, GameError> {
        let ledger = self.ledger()?;
        Ok(AggregateStatistics::from_records(
            ledger.users.len() as u64,
            &ledger.records,
        ))
    }

    #[instrument(skip(self))]
    fn user_statistics(&self, user: UserId) -> Result<UserStatistics, GameError> {
        let records = self.user_history(user)?;
        Ok(UserStatistics::from_records(&records))
    }

    #[instrument(skip(self))]
    fn user_history(&self, user: UserId) -> Result<Vec<OutcomeRecord>, GameError> {
        let ledger = self.ledger()?;
        let history: Vec<_> = ledger
            .records
            .iter()
            .rev()
            .filter(|r| *r.user_id() == user)
            .cloned()
            .collect();
        debug!(%user, count = history.len(), "User history loaded");
        Ok(history)
    }
}
