//! Strictly Digits server - persistence, HTTP API, and terminal play
//!
//! Wires the [`strictly_digits`] game core to SQLite and serves it to many
//! players at once.
//!
//! # Architecture
//!
//! - **Database**: [`GameRepository`] stores users, outcome records, and the guess log
//! - **Service**: [`GameService`] runs one live session per user under a per-user lock
//! - **Profiles**: [`ProfileService`] registers and looks up players
//! - **HTTP**: [`router`] exposes the service as a JSON API
//! - **Play**: [`run_play`] drives a game over any line-based reader and writer

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod cli;
mod config;
mod db;
mod http;
mod play;
mod profile;
mod service;

// Crate-level exports - Command line
pub use cli::{Cli, Command, UserAction};

// Crate-level exports - Configuration
pub use config::{
    ConfigError, DEFAULT_CONFIG_PATH, ENV_DB_PATH, ENV_HOST, ENV_LOG, ENV_PORT, ServerConfig,
};

// Crate-level exports - Database
pub use db::{DbError, GameRepository, GuessRow, NewGuessRow, NewOutcomeRow, NewUser, OutcomeRow, User};

// Crate-level exports - HTTP API
pub use http::{
    ApiError, AppState, ErrorResponse, GuessRequest, GuessResponse, Player, RegisterUserRequest,
    SessionView, SharedGameService, USER_HEADER, UserView, router, serve,
};

// Crate-level exports - Services
pub use play::run_play;
pub use profile::{ProfileService, Registration};
pub use service::{GameService, GuessLog, GuessResult};
