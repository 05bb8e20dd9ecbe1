//! # Credential Store
//!
//! The api-key/session-token pair and the single slot that holds it for the lifetime of the
//! process. Nothing is written to disk.

use std::fmt;

/// The api-key/session-token pair authorizing calls after sign-in.
///
/// Both halves always travel together: a `Credential` only exists once the server returned both,
/// and "not authenticated" is represented by the absence of the whole value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    api_key: String,
    token: String,
}

impl Credential {
    /// Builds a credential; returns `None` unless both halves are non-empty.
    pub fn new(api_key: impl Into<String>, token: impl Into<String>) -> Option<Self> {
        let api_key = api_key.into();
        let token = token.into();
        if api_key.is_empty() || token.is_empty() {
            return None;
        }
        Some(Self { api_key, token })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

// The token is a bearer secret; keep it out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("api_key", &self.api_key)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// In-memory holder for the current credential.
#[derive(Debug, Default)]
pub struct CredentialStore {
    slot: Option<Credential>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, credential: Credential) {
        self.slot = Some(credential);
    }

    /// Empties the slot, returning what was there.
    pub fn clear(&mut self) -> Option<Credential> {
        self.slot.take()
    }

    pub fn current(&self) -> Option<&Credential> {
        self.slot.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.slot.is_some()
    }
}
