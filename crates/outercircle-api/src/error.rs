use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use outercircle_db::StoreError;
use outercircle_types::api::ErrorResponse;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid code. Please try again or get a new one.")]
    InvalidCode,

    #[error("Message cannot be empty.")]
    EmptyMessage,

    #[error("Message is longer than {max} characters.")]
    MessageTooLong { max: usize },

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Admin access is not enabled")]
    AdminDisabled,

    #[error("Storage error: {0}")]
    Store(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnknownCode(_) => Self::InvalidCode,
            other => Self::Store(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::MalformedBody(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCode
            | Self::EmptyMessage
            | Self::MessageTooLong { .. }
            | Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::AdminDisabled => StatusCode::NOT_FOUND,
            // a duplicate code the caller did not retry
            Self::Store(e) if !e.is_unavailable() => StatusCode::CONFLICT,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!("{}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
