//! # Error Types
//!
//! Two layers of errors are used by the library:
//!
//! - [`ApiError`]: what went wrong on the wire (transport failure or a non-success response).
//! - [`ClientError`]: what the triggering user action reports. Every variant renders a short,
//!   user-facing message through `Display`, preferring the server's own message when one was sent.
//!
//! Binaries wrap these in `anyhow` at the boundary.

use thiserror::Error;

/// Failure of a single request against the remote API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Connectivity, TLS, or body decoding failure inside the HTTP client.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("request rejected with status {status}")]
    Status {
        status: u16,
        /// The `message` field of the error body, or the raw body text when it was not JSON.
        message: Option<String>,
    },

    /// The server answered with success but the body did not carry what we need.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The configured base URL cannot be used to build request URLs.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// Message to show the user: the server's message when present, else a description of the failure.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status {
                message: Some(message),
                ..
            } => message.clone(),
            other => other.to_string(),
        }
    }

    /// HTTP status of the rejection, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            ApiError::InvalidResponse(_) | ApiError::InvalidBaseUrl(_) => None,
        }
    }
}

/// Coarse error classes surfaced by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid local input; nothing was sent.
    Validation,
    /// Authentication request failed or was rejected.
    Auth,
    /// Capture permission denied.
    Permission,
    /// Upload failed or was rejected.
    Upload,
    /// Generic network failure outside of auth and upload (e.g. the logout call).
    Transport,
}

/// Error returned by every orchestrator operation.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Permission(String),

    #[error("Authentication failed: {}", .0.user_message())]
    Auth(#[source] ApiError),

    #[error("Logout failed: {}", .0.user_message())]
    Logout(#[source] ApiError),

    #[error("Image upload failed: {}", .0.user_message())]
    Upload(#[source] ApiError),

    #[error("File reading failed: {0}")]
    ImageRead(#[source] std::io::Error),

    #[error("An upload is already in progress")]
    UploadInFlight,
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation(message.into())
    }

    /// Maps the variant onto its error class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Validation(_) | ClientError::UploadInFlight => ErrorKind::Validation,
            ClientError::Permission(_) => ErrorKind::Permission,
            ClientError::Auth(_) => ErrorKind::Auth,
            ClientError::Logout(_) => ErrorKind::Transport,
            ClientError::Upload(_) | ClientError::ImageRead(_) => ErrorKind::Upload,
        }
    }

    /// True when the error came from a local check and no request was issued.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
