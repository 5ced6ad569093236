use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy from spec.md §7. The HTTP boundary is the sole translator
/// to status codes; everything upstream of a route handler only ever
/// produces/propagates an `AppError`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ValidationFailed(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Busy(String),

    #[error("{0}")]
    UpstreamUnavailable(String),

    #[error("{0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::ValidationFailed(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::PermissionDenied(_) => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::Busy(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::UpstreamUnavailable(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            // Never leak internal error detail to the client.
            AppError::Internal(_) | AppError::Io(_) | AppError::Serde(_) | AppError::Other(_) => {
                tracing::error!(error = %self, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        let body = json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn space_not_found(id_or_name: impl Into<String>) -> Self {
        AppError::NotFound(format!("space not found: {}", id_or_name.into()))
    }

    pub fn document_not_found(doc_key: impl Into<String>) -> Self {
        AppError::NotFound(format!("document not found: {}", doc_key.into()))
    }

    pub fn path_invalid(reason: impl Into<String>) -> Self {
        AppError::ValidationFailed(format!("invalid path: {}", reason.into()))
    }

    pub fn name_conflict(name: impl Into<String>) -> Self {
        AppError::Conflict(format!("name already in use: {}", name.into()))
    }
}
