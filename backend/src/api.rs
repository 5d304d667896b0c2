use std::sync::Arc;

use axum::response::IntoResponse;

use crate::gateway::{Gateway, GatewayError};
use crate::storage::VideoStorage;
use crate::worker::Queue;

pub mod dashboard;
pub mod games;

pub const ALLOWED_VIDEO_TYPES: [&str; 4] =
    ["video/mp4", "video/avi", "video/quicktime", "video/x-msvideo"];

#[derive(Debug, Clone)]
pub struct UploadLimits {
    pub max_upload_bytes: u64,
    /// Used when the game info carries no duration.
    pub default_duration: u32,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: 2 * 1024 * 1024 * 1024,
            default_duration: 5400,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn Gateway>,
    pub storage: Arc<dyn VideoStorage>,
    pub queue: Queue,
    pub limits: UploadLimits,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error(transparent)]
    Invalid(#[from] games::UploadError),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Internal(String),
}

impl From<GatewayError> for ApiError {
    fn from(value: GatewayError) -> Self {
        match value {
            GatewayError::NotFound("game") => Self::NotFound("Game not found"),
            GatewayError::NotFound("job") => Self::NotFound("Processing job not found"),
            GatewayError::NotFound(_) => Self::NotFound("Not found"),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            Self::Unauthorized => axum::http::StatusCode::UNAUTHORIZED,
            Self::Invalid(_) => axum::http::StatusCode::BAD_REQUEST,
            Self::NotFound(_) => axum::http::StatusCode::NOT_FOUND,
            Self::Internal(reason) => {
                tracing::error!("Handling request: {}", reason);
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let error = match &self {
            Self::Internal(_) => "Internal server error".to_owned(),
            other => other.to_string(),
        };

        (status, axum::Json(common::ErrorBody { error })).into_response()
    }
}

pub fn router(state: AppState) -> axum::Router {
    axum::Router::new()
        .nest("/games/", games::router(&state.limits))
        .route("/dashboard", axum::routing::get(dashboard::stats))
        .with_state(state)
}
