//! # Image Acquisition
//!
//! The orchestrator does not know how an image is captured or picked. It talks to an
//! [`ImageAcquirer`], which answers two questions:
//!
//! 1. Is capture permitted? ([`ImageAcquirer::request_permission`])
//! 2. Which image did the user choose? ([`ImageAcquirer::acquire`]), resolving to `None` when the
//!    user dismissed the picker or the source failed. `None` is never an error.
//!
//! [`FileAcquirer`] is the filesystem-backed implementation used by the binaries:
//! - **Camera**: the most recently modified image in the capture directory
//! - **Library**: a pick queued by the front-end, resolved against the library directory

use async_trait::async_trait;
use clap::ValueEnum;
use image::ImageFormat;
use log::{debug, info, warn};
use reqwest::Url;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use crate::common::config::ImagesConfig;

/// File name used when the handle's URI has no final segment.
pub const DEFAULT_FILE_NAME: &str = "default.jpg";

/// Content type used when a source does not declare one.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";
const FILE_SCHEME: &str = "file:";

/// Where an image comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImageSource {
    Camera,
    Library,
}

/// Reference to a locally available image: where its bytes live and what they are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalImageHandle {
    uri: String,
    content_type: String,
}

impl LocalImageHandle {
    pub fn new(uri: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            content_type: content_type.into(),
        }
    }

    /// Handle for a file on disk, with the content type taken from its extension.
    ///
    /// The URI is a percent-encoded `file:` URL of the absolute path.
    pub fn from_path(path: &Path) -> Self {
        let uri = std::path::absolute(path)
            .ok()
            .and_then(|absolute| Url::from_file_path(absolute).ok())
            .map(String::from)
            .unwrap_or_else(|| path.display().to_string());
        Self::new(uri, content_type_for(path))
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Final path segment of the URI, if there is one. `file:` URIs are percent-decoded.
    pub fn file_name(&self) -> Option<String> {
        let segment = self
            .uri
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())?;

        if self.is_file_uri() {
            if let Ok(path) = self.local_path() {
                return path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(str::to_string);
            }
        }
        Some(segment.to_string())
    }

    /// Final path segment of the URI, or [`DEFAULT_FILE_NAME`].
    pub fn file_name_or_default(&self) -> String {
        self.file_name()
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
    }

    /// Filesystem location of the bytes.
    ///
    /// `file:` URIs are decoded into a path; anything else is taken as a plain path.
    pub fn local_path(&self) -> io::Result<PathBuf> {
        if !self.is_file_uri() {
            return Ok(PathBuf::from(&self.uri));
        }
        Url::parse(&self.uri)
            .ok()
            .and_then(|url| url.to_file_path().ok())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("not a local file URI: {}", self.uri),
                )
            })
    }

    /// Reads the whole image into memory.
    pub async fn read(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.local_path()?).await
    }

    fn is_file_uri(&self) -> bool {
        self.uri.starts_with(FILE_SCHEME)
    }
}

/// MIME type for an image path, based on its extension.
pub fn content_type_for(path: &Path) -> String {
    ImageFormat::from_path(path)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| FALLBACK_CONTENT_TYPE.to_string())
}

fn is_image_path(path: &Path) -> bool {
    ImageFormat::from_path(path).is_ok()
}

/// Producer of local image handles, gated by a permission check.
#[async_trait]
pub trait ImageAcquirer: Send + Sync {
    /// Asks for capture permission. `false` means the user (or platform) refused.
    async fn request_permission(&self) -> bool;

    /// Lets the user choose an image from `source`.
    ///
    /// Resolves exactly once: `Some` with the chosen image, or `None` on dismissal or failure.
    async fn acquire(&self, source: ImageSource) -> Option<LocalImageHandle>;
}

/// Filesystem-backed acquirer.
pub struct FileAcquirer {
    images: ImagesConfig,
    /// Library pick waiting for the next `acquire(Library)`
    pending: Mutex<Option<PathBuf>>,
}

impl FileAcquirer {
    pub fn new(images: ImagesConfig) -> Self {
        Self {
            images,
            pending: Mutex::new(None),
        }
    }

    /// Queues the file the next library acquisition will return.
    ///
    /// Relative paths are resolved against the library directory.
    pub fn queue_pick(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let resolved = if path.is_absolute() {
            path
        } else {
            self.images.library_dir.join(path)
        };
        debug!("Queued library pick {}", resolved.display());
        *self.pending.lock().unwrap_or_else(|e| e.into_inner()) = Some(resolved);
    }

    fn take_pick(&self) -> Option<PathBuf> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    async fn pick_from_library(&self) -> Option<LocalImageHandle> {
        let Some(path) = self.take_pick() else {
            info!("No library image chosen");
            return None;
        };

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(LocalImageHandle::from_path(&path)),
            Ok(_) => {
                warn!("Library pick {} is not a file", path.display());
                None
            }
            Err(e) => {
                warn!("Library pick {} unavailable: {}", path.display(), e);
                None
            }
        }
    }

    async fn latest_capture(&self) -> Option<LocalImageHandle> {
        let dir = &self.images.capture_dir;
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Camera directory {} unavailable: {}", dir.display(), e);
                return None;
            }
        };

        let mut newest: Option<(SystemTime, PathBuf)> = None;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if !is_image_path(&path) {
                continue;
            }
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            if newest.as_ref().map_or(true, |(best, _)| modified > *best) {
                newest = Some((modified, path));
            }
        }

        match newest {
            Some((_, path)) => Some(LocalImageHandle::from_path(&path)),
            None => {
                info!("No captures found in {}", dir.display());
                None
            }
        }
    }
}

#[async_trait]
impl ImageAcquirer for FileAcquirer {
    async fn request_permission(&self) -> bool {
        self.images.allow_camera
    }

    async fn acquire(&self, source: ImageSource) -> Option<LocalImageHandle> {
        match source {
            ImageSource::Camera => self.latest_capture().await,
            ImageSource::Library => self.pick_from_library().await,
        }
    }
}
