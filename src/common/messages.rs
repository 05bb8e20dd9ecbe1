//! # Wire Messages
//!
//! JSON bodies exchanged with the remote API:
//! - `POST /auth` request and response
//! - the error body returned with non-success statuses
//!
//! The upload body is raw binary and the logout call has no body, so neither appears here.

use serde::{Deserialize, Serialize};

/// Body of `POST /auth`.
///
/// Only the fields of the active identity mode are serialized:
/// `{email, password}` for root users, `{password, operatorId, userName}` for SAM users.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<&'a str>,
}

/// Successful `POST /auth` body.
///
/// Fields are optional so a malformed answer becomes a typed error instead of a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub api_key: Option<String>,
    pub token: Option<String>,
    #[serde(default)]
    pub operator_id: Option<String>,
}

/// Error body sent with non-success statuses, e.g. `{"code":"AUM0001","message":"..."}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    /// Extracts a user-facing message from a raw error body.
    ///
    /// JSON bodies yield their `message` field; other non-empty bodies are used verbatim.
    pub fn message_from(body: &str) -> Option<String> {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return None;
        }
        match serde_json::from_str::<ApiErrorBody>(trimmed) {
            Ok(parsed) => parsed.message.filter(|m| !m.is_empty()),
            Err(_) => Some(trimmed.to_string()),
        }
    }
}
