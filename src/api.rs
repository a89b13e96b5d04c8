//! HTTP API endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{resolve_user_middleware, CurrentUser};
use crate::ranking::{
    leaderboard_rows, profile_view, record_win, LeaderboardRow, ProfileView, RecordWinOutcome,
    StoreError, LEADERBOARD_LIMIT,
};
use crate::session::SessionError;
use crate::state::AppState;
use crate::types::{GameView, GENERATIONS};

/// Error body returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid game token")]
    InvalidToken,

    #[error("Unsupported game token version")]
    UnsupportedVersion,

    #[error("Pokemon service unavailable")]
    Upstream,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error("Storage error")]
    Store,

    #[error("Internal error")]
    Internal,
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidToken => ApiError::InvalidToken,
            SessionError::UnsupportedVersion(_) => ApiError::UnsupportedVersion,
            SessionError::Upstream(_) => ApiError::Upstream,
            SessionError::Encoding(e) => {
                tracing::error!("Failed to encode game token: {}", e);
                ApiError::Internal
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Ranking store failed: {}", err);
        ApiError::Store
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match self {
            ApiError::InvalidToken => (StatusCode::BAD_REQUEST, "INVALID_TOKEN"),
            ApiError::UnsupportedVersion => (StatusCode::BAD_REQUEST, "UNSUPPORTED_VERSION"),
            ApiError::Upstream => (StatusCode::BAD_GATEWAY, "UPSTREAM_UNAVAILABLE"),
            ApiError::NotAuthenticated => (StatusCode::UNAUTHORIZED, "NOT_AUTHENTICATED"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Store => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        };
        let body = ErrorBody {
            code: code.to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationInfo {
    pub index: usize,
    pub label: String,
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGameRequest {
    #[serde(default)]
    pub generation_index: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessRequest {
    pub game_token: String,
    #[serde(default)]
    pub letter: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordWinRequest {
    #[serde(default)]
    pub streak: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecordWinResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_wins: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_streak: Option<u32>,
}

/// GET /api/generations
pub async fn list_generations() -> Json<Vec<GenerationInfo>> {
    Json(
        GENERATIONS
            .iter()
            .enumerate()
            .map(|(index, g)| GenerationInfo {
                index,
                label: g.label.to_string(),
                min: g.min,
                max: g.max,
            })
            .collect(),
    )
}

/// POST /api/game/start
///
/// A missing or unreadable body starts a game over all generations.
pub async fn start_game(
    State(state): State<AppState>,
    body: Result<Json<StartGameRequest>, JsonRejection>,
) -> ApiResult<GameView> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let view = state.games.start_game(request.generation_index).await?;
    Ok(Json(view))
}

/// POST /api/game/guess
pub async fn guess_letter(
    State(state): State<AppState>,
    body: Result<Json<GuessRequest>, JsonRejection>,
) -> ApiResult<GameView> {
    let Json(request) = body?;
    let view = state
        .games
        .guess_letter(&request.game_token, &request.letter)
        .await?;
    Ok(Json(view))
}

/// POST /api/wins
///
/// Anonymous callers get `ok: false` rather than an error status.
pub async fn record_win_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    body: Result<Json<RecordWinRequest>, JsonRejection>,
) -> ApiResult<RecordWinResponse> {
    let Json(request) = body?;
    let streak = if request.streak.is_finite() {
        request.streak.trunc() as i64
    } else {
        0
    };

    let response = match record_win(state.ranking.as_ref(), user.as_ref(), streak).await? {
        RecordWinOutcome::Recorded {
            total_wins,
            best_streak,
        } => RecordWinResponse {
            ok: true,
            reason: None,
            total_wins: Some(total_wins),
            best_streak: Some(best_streak),
        },
        RecordWinOutcome::NotAuthenticated => RecordWinResponse {
            ok: false,
            reason: Some("not_authenticated".to_string()),
            total_wins: None,
            best_streak: None,
        },
    };
    Ok(Json(response))
}

/// GET /api/ranking
pub async fn leaderboard(State(state): State<AppState>) -> ApiResult<Vec<LeaderboardRow>> {
    let entries = state.ranking.leaderboard(LEADERBOARD_LIMIT).await?;
    Ok(Json(leaderboard_rows(entries)))
}

/// GET /api/profile
pub async fn profile(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<ProfileView> {
    let user = user.ok_or(ApiError::NotAuthenticated)?;
    let stored = state.ranking.find_profile(&user).await?;
    let entry = state.ranking.find_entry(&user).await?;
    Ok(Json(profile_view(&user, stored, entry)))
}

/// Build the full application router
pub fn router(state: AppState) -> Router {
    let account_routes = Router::new()
        .route("/api/wins", post(record_win_handler))
        .route("/api/profile", get(profile))
        .layer(middleware::from_fn_with_state(
            state.identity.clone(),
            resolve_user_middleware,
        ));

    Router::new()
        .route("/api/generations", get(list_generations))
        .route("/api/game/start", post(start_game))
        .route("/api/game/guess", post(guess_letter))
        .route("/api/ranking", get(leaderboard))
        .merge(account_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
