//! SQLite persistence for users, outcome records, and the guess log.

mod error;
mod models;
mod repository;
mod schema; // Diesel generated schema - internal use only

pub use error::DbError;
pub use models::{GuessRow, NewGuessRow, NewOutcomeRow, NewUser, OutcomeRow, User};
pub use repository::GameRepository;
