//! # Session & Upload Orchestrator
//!
//! Top-level controller composing the authenticator, credential store, image acquirer and
//! upload pipeline. It owns every piece of mutable session state:
//! - the current [`Credential`] (through the [`CredentialStore`])
//! - the currently selected [`LocalImageHandle`]
//! - the upload in-flight flag (inside the [`UploadPipeline`])
//!
//! ## State Machine
//!
//! ```text
//! Unauthenticated --authenticate--> (authenticating) --ok--> Authenticated
//!                                   (authenticating) --err-> Unauthenticated
//! Authenticated   --sign_out-----> Unauthenticated   (credential always cleared)
//! Authenticated   --select_image-> Authenticated     (handle replaced or unchanged)
//! Authenticated   --upload-------> Uploading --done--> Authenticated
//! ```
//!
//! Preconditions are checked when an operation is invoked, never cached. Every failure is
//! terminal for the triggering action only; nothing is retried automatically.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let acquirer = FileAcquirer::new(config.images.clone());
//! let mut session = SessionOrchestrator::new(config.api.clone(), acquirer)?;
//!
//! session.authenticate(IdentityInput::root("me@example.com", "secret")?).await?;
//! session.select_image(ImageSource::Camera).await?;
//! session.upload("photos").await?;
//! session.sign_out().await?;
//! ```

use log::{info, warn};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::client::acquire::{ImageAcquirer, ImageSource, LocalImageHandle, DEFAULT_FILE_NAME};
use crate::client::api::ApiClient;
use crate::client::auth::{Authenticator, IdentityInput, IdentityMode};
use crate::client::credentials::{Credential, CredentialStore};
use crate::client::metrics::{Operation, SessionMetrics};
use crate::client::upload::{UploadPipeline, UploadReceipt, UploadTarget, AUTHENTICATE_FIRST};
use crate::common::config::ApiConfig;
use crate::common::error::{ApiError, ClientError, Result};

const CAMERA_PERMISSION_REQUIRED: &str = "Camera permission is required to take photos";
const ALREADY_SIGNED_IN: &str = "Already signed in; sign out first";

/// Label of the transient phase inside `authenticate`. `authenticate` holds `&mut self`, so no
/// caller can observe it through [`SessionOrchestrator::state`]; it only shows in transition logs.
const AUTHENTICATING: &str = "Authenticating";

/// Where the session currently stands, as seen between operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    /// Sub-state of `Authenticated` while an upload is outstanding.
    Uploading,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unauthenticated => "Unauthenticated",
            SessionState::Authenticated => "Authenticated",
            SessionState::Uploading => "Uploading",
        };
        write!(f, "{}", name)
    }
}

/// Successful result of a user action.
#[derive(Debug, Clone)]
pub enum Outcome {
    Authenticated { mode: IdentityMode },
    SignedOut,
    /// Sign-out requested with no credential present; nothing was done.
    AlreadySignedOut,
    ImageSelected(LocalImageHandle),
    /// The picker was dismissed or failed; the previous selection (if any) is kept.
    SelectionCancelled,
    Uploaded(UploadReceipt),
}

impl Outcome {
    /// Short message for the user.
    pub fn message(&self) -> String {
        match self {
            Outcome::Authenticated { .. } => "Authentication successful".to_string(),
            Outcome::SignedOut => "Logged out successfully".to_string(),
            Outcome::AlreadySignedOut => "Not signed in".to_string(),
            Outcome::ImageSelected(handle) => {
                format!("Selected {}", handle.file_name_or_default())
            }
            Outcome::SelectionCancelled => "No image selected".to_string(),
            Outcome::Uploaded(_) => "Image uploaded successfully".to_string(),
        }
    }
}

/// Owns the session and drives every user-triggered flow.
pub struct SessionOrchestrator<A: ImageAcquirer> {
    api: ApiClient,
    authenticator: Authenticator,
    credentials: CredentialStore,
    acquirer: A,
    pipeline: UploadPipeline,
    /// The most recent successful selection
    image: Option<LocalImageHandle>,
    metrics: Option<Arc<Mutex<SessionMetrics>>>,
}

impl<A: ImageAcquirer> SessionOrchestrator<A> {
    /// Creates an unauthenticated session talking to the API described by `api_config`.
    pub fn new(api_config: ApiConfig, acquirer: A) -> std::result::Result<Self, ApiError> {
        let api = ApiClient::new(api_config)?;
        Ok(Self {
            authenticator: Authenticator::new(api.clone()),
            pipeline: UploadPipeline::new(api.clone()),
            api,
            credentials: CredentialStore::new(),
            acquirer,
            image: None,
            metrics: None,
        })
    }

    /// Records per-operation latency and outcome into `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<Mutex<SessionMetrics>>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> SessionState {
        match (self.credentials.is_authenticated(), self.pipeline.is_in_flight()) {
            (false, _) => SessionState::Unauthenticated,
            (true, false) => SessionState::Authenticated,
            (true, true) => SessionState::Uploading,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_authenticated()
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credentials.current()
    }

    pub fn current_image(&self) -> Option<&LocalImageHandle> {
        self.image.as_ref()
    }

    pub fn acquirer(&self) -> &A {
        &self.acquirer
    }

    /// Whether the upload action is currently available for `destination_path`.
    pub fn can_upload(&self, destination_path: &str) -> bool {
        self.state() == SessionState::Authenticated
            && self.image.is_some()
            && !UploadTarget::new(destination_path, DEFAULT_FILE_NAME)
                .destination_path()
                .is_empty()
    }

    /// Signs in and stores the returned credential.
    ///
    /// On failure the session stays `Unauthenticated`.
    pub async fn authenticate(&mut self, identity: IdentityInput) -> Result<Outcome> {
        if self.credentials.is_authenticated() {
            return Err(ClientError::validation(ALREADY_SIGNED_IN));
        }
        identity.validate()?;

        transition(SessionState::Unauthenticated, AUTHENTICATING);
        let started = Instant::now();
        let result = self.authenticator.authenticate(&identity).await;
        self.record(Operation::Auth, started, result.as_ref().err(), None);

        match result {
            Ok(credential) => {
                self.credentials.set(credential);
                transition(AUTHENTICATING, SessionState::Authenticated);
                Ok(Outcome::Authenticated {
                    mode: identity.mode(),
                })
            }
            Err(e) => {
                transition(AUTHENTICATING, SessionState::Unauthenticated);
                Err(e)
            }
        }
    }

    /// Signs out, always ending `Unauthenticated`.
    ///
    /// The logout call's failure is reported, but the local credential is dropped regardless.
    /// A token the server never revoked may then stay valid until it expires server-side.
    pub async fn sign_out(&mut self) -> Result<Outcome> {
        let Some(credential) = self.credentials.current().cloned() else {
            info!("Sign-out requested while not signed in");
            return Ok(Outcome::AlreadySignedOut);
        };

        let started = Instant::now();
        let result = self.api.post_logout(&credential).await;

        self.credentials.clear();
        transition(SessionState::Authenticated, SessionState::Unauthenticated);

        let result = result.map_err(|e| {
            warn!(
                "Logout call failed ({}); local credential cleared anyway",
                e.user_message()
            );
            ClientError::Logout(e)
        });
        self.record(Operation::Logout, started, result.as_ref().err(), None);

        result.map(|()| Outcome::SignedOut)
    }

    /// Asks the acquirer for an image from `source`.
    ///
    /// Requires an authenticated session and granted permission; the acquirer is not invoked
    /// otherwise. A dismissed picker leaves the previous selection untouched.
    pub async fn select_image(&mut self, source: ImageSource) -> Result<Outcome> {
        if !self.credentials.is_authenticated() {
            return Err(ClientError::validation(AUTHENTICATE_FIRST));
        }
        if !self.acquirer.request_permission().await {
            return Err(ClientError::Permission(
                CAMERA_PERMISSION_REQUIRED.to_string(),
            ));
        }

        match self.acquirer.acquire(source).await {
            Some(handle) => {
                info!("🖼️  Selected {} ({})", handle.uri(), handle.content_type());
                self.image = Some(handle.clone());
                Ok(Outcome::ImageSelected(handle))
            }
            None => {
                info!("Image selection from {:?} cancelled", source);
                Ok(Outcome::SelectionCancelled)
            }
        }
    }

    /// Uploads the selected image under `destination_path`.
    ///
    /// Takes `&self` so overlapping calls meet at the pipeline's in-flight flag: the second one is
    /// rejected with [`ClientError::UploadInFlight`] and sends nothing.
    pub async fn upload(&self, destination_path: &str) -> Result<Outcome> {
        if !self.credentials.is_authenticated() {
            return Err(ClientError::validation(AUTHENTICATE_FIRST));
        }

        let file_name = self
            .image
            .as_ref()
            .map_or_else(
                || DEFAULT_FILE_NAME.to_string(),
                LocalImageHandle::file_name_or_default,
            );
        let target = UploadTarget::new(destination_path, &file_name);

        let started = Instant::now();
        let result = self
            .pipeline
            .upload(self.image.as_ref(), &target, self.credentials.current())
            .await;
        let bytes = result.as_ref().ok().map(|receipt| receipt.bytes as u64);
        self.record(Operation::Upload, started, result.as_ref().err(), bytes);

        result.map(Outcome::Uploaded)
    }

    /// Adds a metric entry for an operation that reached the network.
    fn record(
        &self,
        operation: Operation,
        started: Instant,
        failure: Option<&ClientError>,
        bytes: Option<u64>,
    ) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        let failure_reason = match failure {
            None => None,
            Some(e) if e.is_validation() => return,
            Some(e) => Some(e.to_string()),
        };
        let mut metrics = metrics.lock().unwrap_or_else(|e| e.into_inner());
        metrics.record(
            operation,
            started.elapsed(),
            failure_reason.is_none(),
            failure_reason,
            bytes,
        );
    }
}

fn transition(from: impl fmt::Display, to: impl fmt::Display) {
    info!("Session: {} -> {}", from, to);
}
