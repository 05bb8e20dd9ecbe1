//! # Configuration Utilities
//!
//! TOML-backed configuration for the client binaries, plus the generic loader they share.
//!
//! # Example TOML
//!
//! ```toml
//! [api]
//! base_url = "https://api.soracom.io/v1"
//!
//! [identity]
//! mode = "sam"
//! operator_id = "OP0012345678"
//! user_name = "uploader"
//!
//! [images]
//! capture_dir = "user-data/camera"
//! library_dir = "user-data/library"
//! allow_camera = true
//!
//! [upload]
//! destination_path = "photos"
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::client::auth::IdentityMode;

pub const DEFAULT_BASE_URL: &str = "https://api.soracom.io/v1";
pub const DEFAULT_API_KEY_HEADER: &str = "X-Soracom-API-Key";
pub const DEFAULT_TOKEN_HEADER: &str = "X-Soracom-Token";

/// Load a TOML configuration file and deserialize it into the specified type.
///
/// # Arguments
/// - `path`: Path to the TOML configuration file
///
/// # Returns
/// - `Ok(T)`: Successfully loaded and parsed configuration
/// - `Err`: File I/O or parsing error
///
/// # Example
/// ```ignore
/// let config: ClientConfig = load_config("config/client.toml")?;
/// ```
pub fn load_config<T>(path: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)?;
    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Complete client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Remote API location and header names
    #[serde(default)]
    pub api: ApiConfig,
    /// Which identity mode to sign in with and its non-secret fields
    pub identity: IdentityConfig,
    /// Where the camera and library sources read images from
    #[serde(default)]
    pub images: ImagesConfig,
    /// Upload defaults
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API base, without trailing slash (e.g. "https://api.soracom.io/v1")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Header carrying the api-key on authenticated calls
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
    /// Header carrying the session token on authenticated calls
    #[serde(default = "default_token_header")]
    pub token_header: String,
    /// Request timeout; the transport default applies when absent
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_header: default_api_key_header(),
            token_header: default_token_header(),
            timeout_secs: None,
        }
    }
}

impl ApiConfig {
    /// Settings pointing at another base URL, keeping the default header names.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_key_header() -> String {
    DEFAULT_API_KEY_HEADER.to_string()
}

fn default_token_header() -> String {
    DEFAULT_TOKEN_HEADER.to_string()
}

/// Identity fields. The password is normally supplied on the command line or at a prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub mode: IdentityMode,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub operator_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// Image source locations for the filesystem acquirer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Directory the camera writes captures to; the newest image is taken
    #[serde(default = "default_capture_dir")]
    pub capture_dir: PathBuf,
    /// Directory relative library picks are resolved against
    #[serde(default = "default_library_dir")]
    pub library_dir: PathBuf,
    /// Answer of the permission gate
    #[serde(default = "default_allow_camera")]
    pub allow_camera: bool,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            capture_dir: default_capture_dir(),
            library_dir: default_library_dir(),
            allow_camera: default_allow_camera(),
        }
    }
}

fn default_capture_dir() -> PathBuf {
    PathBuf::from("user-data/camera")
}

fn default_library_dir() -> PathBuf {
    PathBuf::from("user-data/library")
}

fn default_allow_camera() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Destination used when none is given on the command line
    #[serde(default)]
    pub destination_path: Option<String>,
}
