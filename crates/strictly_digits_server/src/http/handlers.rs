//! Route handlers.

use axum::{
    Json,
    extract::{FromRequestParts, State, rejection::JsonRejection},
    http::{StatusCode, request::Parts},
};
use strictly_digits::{AggregateStatistics, OutcomeRecord, UserId, UserStatistics};
use tracing::{debug, info, instrument};

use crate::http::{
    ApiError, AppState, GuessRequest, GuessResponse, RegisterUserRequest, SessionView, UserView,
};
use crate::profile::Registration;

/// Header carrying the caller's user id. Authentication happens upstream.
pub const USER_HEADER: &str = "x-user-id";

/// The caller's identity, taken from [`USER_HEADER`] and checked against the
/// users table.
#[derive(Debug, Clone, Copy)]
pub struct Player(pub UserId);

impl FromRequestParts<AppState> for Player {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", USER_HEADER)))?;

        let id = header
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<i32>().ok())
            .ok_or_else(|| ApiError::Unauthorized(format!("malformed {} header", USER_HEADER)))?;
        let user = UserId::new(id);

        let repository = state.repository.clone();
        let known = blocking(move || Ok(repository.get_user(user)?.is_some())).await?;
        if !known {
            return Err(ApiError::Unauthorized(format!("unknown user {}", user)));
        }

        debug!(%user, "Player identified");
        Ok(Player(user))
    }
}

/// Runs blocking storage work off the async executor.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("worker task failed: {}", e)))?
}

#[instrument(skip(state, payload))]
pub(crate) async fn register_user(
    State(state): State<AppState>,
    payload: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    let Json(req) = payload?;
    if req.display_name.trim().is_empty() {
        return Err(ApiError::BadRequest("display_name must not be blank".to_string()));
    }

    let profiles = state.profiles.clone();
    match blocking(move || Ok(profiles.register(&req.display_name)?)).await? {
        Registration::Created(user) => {
            info!(user_id = user.id(), "User registered");
            Ok((StatusCode::CREATED, Json(UserView::from(&user))))
        }
        Registration::Taken(user) => Err(ApiError::Conflict(format!(
            "display name '{}' is taken",
            user.display_name()
        ))),
    }
}

#[instrument(skip(state))]
pub(crate) async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserView>>, ApiError> {
    let profiles = state.profiles.clone();
    let users = blocking(move || Ok(profiles.list()?)).await?;
    Ok(Json(users.iter().map(UserView::from).collect()))
}

#[instrument(skip(state))]
pub(crate) async fn current_game(
    State(state): State<AppState>,
    Player(user): Player,
) -> Result<Json<SessionView>, ApiError> {
    let service = state.service.clone();
    let session = blocking(move || Ok(service.current_game(user)?)).await?;
    Ok(Json(SessionView::from(&session)))
}

#[instrument(skip(state))]
pub(crate) async fn new_game(
    State(state): State<AppState>,
    Player(user): Player,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let service = state.service.clone();
    let session = blocking(move || Ok(service.new_game(user)?)).await?;
    Ok((StatusCode::CREATED, Json(SessionView::from(&session))))
}

#[instrument(skip(state, payload))]
pub(crate) async fn submit_guess(
    State(state): State<AppState>,
    Player(user): Player,
    payload: Result<Json<GuessRequest>, JsonRejection>,
) -> Result<Json<GuessResponse>, ApiError> {
    let Json(req) = payload?;
    let service = state.service.clone();
    let result = blocking(move || Ok(service.guess(user, &req.guess)?)).await?;
    Ok(Json(GuessResponse {
        feedback: result.feedback,
        session: SessionView::from(&result.session),
    }))
}

#[instrument(skip(state))]
pub(crate) async fn end_game(
    State(state): State<AppState>,
    Player(user): Player,
) -> Result<StatusCode, ApiError> {
    let service = state.service.clone();
    blocking(move || Ok(service.end_session(user)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub(crate) async fn aggregate_stats(
    State(state): State<AppState>,
) -> Result<Json<AggregateStatistics>, ApiError> {
    let service = state.service.clone();
    Ok(Json(blocking(move || Ok(service.aggregate_statistics()?)).await?))
}

#[instrument(skip(state))]
pub(crate) async fn my_stats(
    State(state): State<AppState>,
    Player(user): Player,
) -> Result<Json<UserStatistics>, ApiError> {
    let service = state.service.clone();
    Ok(Json(blocking(move || Ok(service.user_statistics(user)?)).await?))
}

#[instrument(skip(state))]
pub(crate) async fn my_history(
    State(state): State<AppState>,
    Player(user): Player,
) -> Result<Json<Vec<OutcomeRecord>>, ApiError> {
    let service = state.service.clone();
    Ok(Json(blocking(move || Ok(service.user_history(user)?)).await?))
}
