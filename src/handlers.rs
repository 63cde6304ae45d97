//! HTTP handlers for the mood playlist API.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        OriginalUri, Query, State,
    },
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::config::Environment;
use crate::error::{AppError, Result};
use crate::mood::{self, Mood};
use crate::services::{AuthFlow, PlaylistFlow, StatusNote};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthFlow>,
    pub playlists: Arc<PlaylistFlow>,
    pub environment: Environment,
    pub started_at: Instant,
}

/// Success envelope wrapped around every response payload.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub message: String,
}

fn ok<T: Serialize>(data: T, message: impl Into<String>) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
        message: message.into(),
    })
}

/// Query parameters for the OAuth callback. Spotify sends `error` instead of
/// `code` when the user denies access.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Query parameters identifying a session.
#[derive(Debug, Deserialize)]
pub struct StateQuery {
    pub state: Option<String>,
}

impl StateQuery {
    fn state(&self) -> &str {
        self.state.as_deref().unwrap_or_default()
    }
}

/// Body of POST /playlist/create. The mood stays a string so unknown labels
/// surface as `InvalidMood` rather than a body rejection.
#[derive(Debug, Deserialize)]
pub struct CreatePlaylistRequest {
    pub mood: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime: f64,
    pub environment: &'static str,
    pub version: &'static str,
}

/// GET /health - Health check.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    ok(
        HealthResponse {
            status: "OK",
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime: state.started_at.elapsed().as_secs_f64(),
            environment: state.environment.as_str(),
            version: env!("CARGO_PKG_VERSION"),
        },
        "API is running",
    )
}

/// GET /moods - Supported moods with their audio targets and queries.
pub async fn moods() -> impl IntoResponse {
    ok(mood::catalog(), "Supported moods")
}

/// GET /auth/login - Start the OAuth flow with a fresh state.
pub async fn login(State(state): State<AppState>) -> impl IntoResponse {
    let request = state.auth.issue_authorization_url(None);
    ok(request, "Open the authorization URL to log in to Spotify")
}

/// GET /auth/callback - Exchange the authorization code for a session token.
pub async fn callback(
    State(state): State<AppState>,
    params: std::result::Result<Query<CallbackQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let Query(params) = params?;
    if let Some(error) = params.error {
        return Err(AppError::BadRequest(format!(
            "Spotify authorization denied: {error}"
        )));
    }
    let code = params.code.unwrap_or_default();
    let session = params.state.unwrap_or_default();
    let status = state.auth.exchange_code(&code, &session).await?;
    Ok(ok(status, "Authentication successful"))
}

/// GET /auth/status - Report whether a session is still usable.
pub async fn auth_status(
    State(state): State<AppState>,
    params: std::result::Result<Query<StateQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let Query(params) = params?;
    let status = state.auth.check_status(params.state()).await;
    let message = match status.note {
        StatusNote::Active => "User authenticated",
        StatusNote::Refreshed => "User authenticated (token refreshed)",
        StatusNote::Anonymous => "User not authenticated",
        StatusNote::Expired => "Session expired, log in again",
    };
    Ok(ok(status, message))
}

/// POST /auth/logout - Drop the session token.
pub async fn logout(
    State(state): State<AppState>,
    params: std::result::Result<Query<StateQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let Query(params) = params?;
    state.auth.logout(params.state()).await;
    Ok(ok(serde_json::json!({}), "Logged out"))
}

/// POST /playlist/create - Build a playlist for a mood on the user's account.
/// A missing `state` is treated like an unknown session.
pub async fn create_playlist(
    State(state): State<AppState>,
    params: std::result::Result<Query<StateQuery>, QueryRejection>,
    body: std::result::Result<Json<CreatePlaylistRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Query(params) = params?;
    let Json(body) = body?;
    let mood: Mood = body.mood.parse()?;
    let result = state.playlists.create_playlist(mood, params.state()).await?;
    Ok(ok(result, format!("Playlist created on Spotify for mood: {}", mood)))
}

/// Fallback for unmatched routes.
pub async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    let path = uri.path();
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "success": false,
            "error": format!("Cannot {method} {path}"),
            "path": path,
            "method": method.as_str(),
        })),
    )
}

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/moods", get(moods))
        .route("/auth/login", get(login))
        .route("/auth/callback", get(callback))
        .route("/auth/status", get(auth_status))
        .route("/auth/logout", post(logout))
        .route("/playlist/create", post(create_playlist))
        .fallback(not_found)
}
