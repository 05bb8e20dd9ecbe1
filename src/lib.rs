//! # Cloud Uploader
//!
//! Signs a user in to the cloud platform API, lets them pick or capture an image, and uploads it
//! to a path of their choosing under the account's private file storage.
//!
//! - [`client`]: session orchestration, authentication, image acquisition and upload
//! - [`common`]: configuration, wire messages and error types
//! - [`utils`]: logging setup and the upload spool used by the binaries

pub mod client;
pub mod common;
pub mod utils;

pub use client::{SessionOrchestrator, SessionState};
pub use common::config::ClientConfig;
pub use common::error::{ClientError, ErrorKind};
