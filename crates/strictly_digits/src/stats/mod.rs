//! Outcome recording and statistics queries.

mod memory;
mod outcome;
mod summary;

pub use memory::MemoryRecorder;
pub use outcome::{Outcome, OutcomeRecord, OutcomeRecorder, OutcomeReport};
pub use summary::{AggregateStatistics, StatisticsSource, UserStatistics};
