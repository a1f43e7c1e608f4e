use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Code, CodeGroup};

// -- Codes --

#[derive(Debug, Serialize, Deserialize)]
pub struct IssueCodeResponse {
    pub code: Code,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyCodeRequest {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyCodeResponse {
    pub code: String,
    pub valid: bool,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitMessageRequest {
    // Missing fields reach validation and are reported as an invalid code
    // or an empty message, not as a malformed body.
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub sensitivity: Option<String>,
    #[serde(default)]
    pub delivery: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitMessageResponse {
    pub code: Code,
    #[serde(with = "crate::models::timestamp")]
    pub timestamp_utc: DateTime<Utc>,
}

// -- Admin --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminLoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminLoginResponse {
    pub token: String,
}

pub type AdminListingResponse = Vec<CodeGroup>;

/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
