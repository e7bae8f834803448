//! JSON HTTP API over the game service.

mod error;
mod handlers;
mod types;

pub use error::{ApiError, ErrorResponse};
pub use handlers::{Player, USER_HEADER};
pub use types::{GuessRequest, GuessResponse, RegisterUserRequest, SessionView, UserView};

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use strictly_digits::MemorySessionStore;
use tracing::{info, instrument};

use crate::db::GameRepository;
use crate::profile::ProfileService;
use crate::service::GameService;

/// Game service as wired for the HTTP server.
pub type SharedGameService = GameService<MemorySessionStore, GameRepository>;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Sessions, guesses, and statistics.
    pub service: Arc<SharedGameService>,
    /// Player profiles.
    pub profiles: ProfileService,
    /// Direct repository access for identity checks.
    pub repository: GameRepository,
}

impl AppState {
    /// Wires a fresh session store to `repository`.
    pub fn new(repository: GameRepository) -> Self {
        Self::with_sessions(repository, MemorySessionStore::new())
    }

    /// Wires the given session store to `repository`.
    #[instrument(skip_all)]
    pub fn with_sessions(repository: GameRepository, sessions: MemorySessionStore) -> Self {
        let service = GameService::new(sessions, repository.clone())
            .with_guess_log(Arc::new(repository.clone()));
        Self {
            service: Arc::new(service),
            profiles: ProfileService::new(repository.clone()),
            repository,
        }
    }
}

/// Builds the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users", post(handlers::register_user).get(handlers::list_users))
        .route("/game", get(handlers::current_game).delete(handlers::end_game))
        .route("/game/new", post(handlers::new_game))
        .route("/game/guess", post(handlers::submit_guess))
        .route("/stats", get(handlers::aggregate_stats))
        .route("/stats/me", get(handlers::my_stats))
        .route("/stats/me/history", get(handlers::my_history))
        .with_state(state)
}

/// Serves the API until the process is stopped.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
#[instrument(skip(state))]
pub async fn serve(host: &str, port: u16, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!(%host, port, "Server ready at http://{}:{}/", host, port);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
