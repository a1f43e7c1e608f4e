use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use outercircle_types::api::{SubmitMessageRequest, SubmitMessageResponse};

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// POST /messages — record an anonymous message against an issued code.
pub async fn submit_message(
    State(state): State<AppState>,
    payload: Result<Json<SubmitMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let raw_code = req.code.unwrap_or_default();
    let message = req.message.unwrap_or_default();

    let (code, stored) = run_blocking(move || {
        state
            .service
            .submit_message(&raw_code, message, req.sensitivity, req.delivery)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitMessageResponse {
            code,
            timestamp_utc: stored.timestamp_utc,
        }),
    ))
}
