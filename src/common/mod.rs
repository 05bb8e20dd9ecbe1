//! # Common Components
//!
//! Shared utilities and data structures used by the client library and its binaries.
//!
//! ## Modules
//!
//! - [`messages`]: JSON bodies of the remote API
//! - [`error`]: wire-level and user-facing error types
//! - [`config`]: Configuration parsing utilities

pub mod config;
pub mod error;
pub mod messages;
