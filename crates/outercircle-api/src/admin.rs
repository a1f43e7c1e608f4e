use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use outercircle_types::api::{AdminListingResponse, AdminLoginRequest, AdminLoginResponse};

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

const SESSION_HOURS: i64 = 12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String,
    pub exp: usize,
}

/// Shared-secret gate in front of the admin listing.
///
/// With no password configured the listing is public. The password is
/// compared as plain text; there are no accounts and no lockout.
pub struct AdminGate {
    password: Option<String>,
    session_key: Vec<u8>,
}

impl AdminGate {
    pub fn new(password: Option<String>, session_key: Vec<u8>) -> Self {
        Self {
            password,
            session_key,
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, Vec::new())
    }

    pub fn is_enabled(&self) -> bool {
        self.password.is_some()
    }

    pub fn login(&self, password: &str) -> Result<String, ApiError> {
        let expected = self.password.as_deref().ok_or(ApiError::AdminDisabled)?;
        if password != expected {
            warn!("Rejected admin login");
            return Err(ApiError::Unauthorized);
        }

        let claims = AdminClaims {
            sub: "admin".to_string(),
            exp: (chrono::Utc::now() + chrono::Duration::hours(SESSION_HOURS)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(&self.session_key),
        )
        .map_err(|e| ApiError::Internal(format!("session signing failed: {e}")))?;

        info!("Admin session started");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<AdminClaims, ApiError> {
        let data = decode::<AdminClaims>(
            token,
            &DecodingKey::from_secret(&self.session_key),
            &Validation::default(),
        )
        .map_err(|_| ApiError::Unauthorized)?;
        Ok(data.claims)
    }
}

/// POST /admin/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<AdminLoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let token = state.admin.login(&req.password)?;
    Ok(Json(AdminLoginResponse { token }))
}

/// GET /admin/messages — every message grouped by code.
pub async fn list_messages(
    State(state): State<AppState>,
) -> Result<Json<AdminListingResponse>, ApiError> {
    let groups = run_blocking(move || state.service.list_messages_for_admin()).await?;
    Ok(Json(groups))
}
