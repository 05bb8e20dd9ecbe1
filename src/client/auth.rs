//! # Authenticator
//!
//! Exchanges user-supplied identity fields for a [`Credential`].
//!
//! Two identity modes exist and exactly one is used per sign-in:
//! - **Root**: the account owner, identified by email and password
//! - **SAM**: a sub-user, identified by operator ID, user name and password
//!
//! The authenticator performs a single request per call and never touches the credential store;
//! the orchestrator decides what to do with the result.

use clap::ValueEnum;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::client::api::ApiClient;
use crate::client::credentials::Credential;
use crate::common::error::{ApiError, ClientError, Result};
use crate::common::messages::AuthRequest;

const ROOT_FIELDS_REQUIRED: &str = "Email and Password are required";
const SAM_FIELDS_REQUIRED: &str = "Password, Operator ID and User Name are required for SAM user";

/// Which login variant is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IdentityMode {
    Root,
    Sam,
}

impl fmt::Display for IdentityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityMode::Root => write!(f, "root"),
            IdentityMode::Sam => write!(f, "sam"),
        }
    }
}

/// Identity submitted at sign-in.
///
/// Only built through [`IdentityInput::root`], [`IdentityInput::sam`] or
/// [`IdentityInput::from_form`], so every value holds exactly one mode with all of its fields
/// non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityInput(Identity);

#[derive(Clone, PartialEq, Eq)]
enum Identity {
    Root {
        email: String,
        password: String,
    },
    Sam {
        operator_id: String,
        user_name: String,
        password: String,
    },
}

impl IdentityInput {
    /// Root identity; fails if either field is empty.
    pub fn root(email: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let identity = IdentityInput(Identity::Root {
            email: email.into(),
            password: password.into(),
        });
        identity.validate()?;
        Ok(identity)
    }

    /// SAM identity; fails if any field is empty.
    pub fn sam(
        operator_id: impl Into<String>,
        user_name: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let identity = IdentityInput(Identity::Sam {
            operator_id: operator_id.into(),
            user_name: user_name.into(),
            password: password.into(),
        });
        identity.validate()?;
        Ok(identity)
    }

    /// Builds the variant selected by `mode` from a flat set of form fields.
    ///
    /// Fields belonging to the other mode are ignored.
    pub fn from_form(
        mode: IdentityMode,
        email: &str,
        operator_id: &str,
        user_name: &str,
        password: &str,
    ) -> Result<Self> {
        match mode {
            IdentityMode::Root => Self::root(email, password),
            IdentityMode::Sam => Self::sam(operator_id, user_name, password),
        }
    }

    pub fn mode(&self) -> IdentityMode {
        match &self.0 {
            Identity::Root { .. } => IdentityMode::Root,
            Identity::Sam { .. } => IdentityMode::Sam,
        }
    }

    /// Checks that every field of the active variant is non-empty.
    pub(crate) fn validate(&self) -> Result<()> {
        match &self.0 {
            Identity::Root { email, password } => {
                if email.is_empty() || password.is_empty() {
                    return Err(ClientError::validation(ROOT_FIELDS_REQUIRED));
                }
            }
            Identity::Sam {
                operator_id,
                user_name,
                password,
            } => {
                if password.is_empty() || operator_id.is_empty() || user_name.is_empty() {
                    return Err(ClientError::validation(SAM_FIELDS_REQUIRED));
                }
            }
        }
        Ok(())
    }

    fn to_request(&self) -> AuthRequest<'_> {
        match &self.0 {
            Identity::Root { email, password } => AuthRequest {
                email: Some(email.as_str()),
                password: password.as_str(),
                operator_id: None,
                user_name: None,
            },
            Identity::Sam {
                operator_id,
                user_name,
                password,
            } => AuthRequest {
                email: None,
                password: password.as_str(),
                operator_id: Some(operator_id.as_str()),
                user_name: Some(user_name.as_str()),
            },
        }
    }

    /// Who is signing in, for log lines.
    fn principal(&self) -> String {
        match &self.0 {
            Identity::Root { email, .. } => email.clone(),
            Identity::Sam {
                operator_id,
                user_name,
                ..
            } => format!("{}/{}", operator_id, user_name),
        }
    }
}

impl fmt::Debug for IdentityInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Identity::Root { email, .. } => f
                .debug_struct("Root")
                .field("email", email)
                .field("password", &"<redacted>")
                .finish(),
            Identity::Sam {
                operator_id,
                user_name,
                ..
            } => f
                .debug_struct("Sam")
                .field("operator_id", operator_id)
                .field("user_name", user_name)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Performs the `POST /auth` exchange.
#[derive(Debug, Clone)]
pub struct Authenticator {
    api: ApiClient,
}

impl Authenticator {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Signs in with the given identity.
    ///
    /// # Returns
    ///
    /// * `Ok(Credential)` - The server accepted the identity and returned both halves
    /// * `Err(ClientError::Validation)` - A required field is empty; nothing was sent
    /// * `Err(ClientError::Auth)` - Transport failure, rejection, or a response missing a half
    pub async fn authenticate(&self, identity: &IdentityInput) -> Result<Credential> {
        identity.validate()?;

        info!(
            "🔑 Signing in as {} user {}",
            identity.mode(),
            identity.principal()
        );

        let response = self
            .api
            .post_auth(&identity.to_request())
            .await
            .map_err(|e| {
                warn!("Authentication request failed: {}", e.user_message());
                ClientError::Auth(e)
            })?;

        let credential = match (response.api_key, response.token) {
            (Some(api_key), Some(token)) => Credential::new(api_key, token),
            _ => None,
        };

        credential.ok_or_else(|| {
            ClientError::Auth(ApiError::InvalidResponse(
                "missing apiKey or token".to_string(),
            ))
        })
    }
}
