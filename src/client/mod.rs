//! # Client Components
//!
//! The client is split into a set of single-purpose parts and one controller on top of them:
//!
//! ## Parts
//! - [`credentials`]: the api-key/token pair and the slot holding it
//! - [`auth`]: identity input and the sign-in exchange
//! - [`acquire`]: the image acquisition contract and its filesystem implementation
//! - [`upload`]: the single-flight binary upload pipeline
//! - [`api`]: the HTTP transport the above share
//! - [`metrics`]: per-operation latency and outcome tracking
//!
//! ## Controller ([`orchestrator`])
//! Owns the session state and drives authenticate -> select image -> upload -> sign out,
//! enforcing preconditions and mapping failures to user-facing messages.

pub mod acquire;
pub mod api;
pub mod auth;
pub mod credentials;
pub mod metrics;
pub mod orchestrator;
pub mod upload;

// Re-export for convenience
pub use acquire::{FileAcquirer, ImageAcquirer, ImageSource, LocalImageHandle};
pub use auth::{IdentityInput, IdentityMode};
pub use credentials::Credential;
pub use metrics::SessionMetrics;
pub use orchestrator::{Outcome, SessionOrchestrator, SessionState};
pub use upload::{UploadReceipt, UploadTarget};
