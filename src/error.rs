use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::spotify::SpotifyError;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid mood: {0}")]
    InvalidMood(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("User not authenticated")]
    Unauthenticated { auth_url: String, state: String },

    #[error("OAuth code exchange failed{}", fmt_status(.status))]
    AuthExchangeFailed { status: Option<u16> },

    #[error("Token refresh failed{}", fmt_status(.status))]
    RefreshFailed { status: Option<u16> },

    #[error("No tracks found for mood: {0}")]
    NoTracksFound(String),

    #[error("Spotify API error while {context}{}", fmt_status(.status))]
    Upstream {
        status: Option<u16>,
        context: &'static str,
    },

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(": {code}"),
        None => String::new(),
    }
}

impl AppError {
    /// Wraps a failed Spotify call made while doing `context`.
    pub fn upstream(context: &'static str, err: &SpotifyError) -> Self {
        AppError::Upstream {
            status: err.status(),
            context,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidMood(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated { .. } | AppError::RefreshFailed { .. } => {
                StatusCode::UNAUTHORIZED
            }
            AppError::NoTracksFound(_) => StatusCode::NOT_FOUND,
            AppError::AuthExchangeFailed { .. } => StatusCode::BAD_GATEWAY,
            AppError::Upstream { status: Some(_), .. } => StatusCode::BAD_GATEWAY,
            AppError::Upstream { status: None, .. } | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AppError::Unauthenticated { auth_url, state } => json!({
                "success": false,
                "error": self.to_string(),
                "details": { "auth_url": auth_url, "state": state },
            }),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                json!({ "success": false, "error": self.to_string() })
            }
            _ => {
                if status.is_server_error() {
                    tracing::error!(status = status.as_u16(), "{}", self);
                } else {
                    tracing::warn!(status = status.as_u16(), "{}", self);
                }
                json!({ "success": false, "error": self.to_string() })
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
