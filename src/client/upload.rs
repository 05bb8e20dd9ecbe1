//! # Upload Pipeline
//!
//! Places the bytes of a [`LocalImageHandle`] at `files/private/{destination}/{file name}` under
//! the signed-in account.
//!
//! ## Workflow
//!
//! 1. Check preconditions (image chosen, destination given, credential present); nothing is sent
//!    when one is missing
//! 2. Claim the in-flight flag, rejecting the call if another upload holds it
//! 3. Read the image fully into memory
//! 4. `PUT` the bytes with the credential headers and the image's content type
//!
//! The upload is all-or-nothing: there is no byte-range retry and no resume. The in-flight flag is
//! released when the call returns, whatever the outcome.

use log::{error, info};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::client::acquire::{LocalImageHandle, FALLBACK_CONTENT_TYPE};
use crate::client::api::ApiClient;
use crate::client::credentials::Credential;
use crate::common::error::{ClientError, Result};

pub(crate) const SELECT_IMAGE_FIRST: &str = "Please select an image first";
pub(crate) const PROVIDE_FILE_PATH: &str = "Please provide a file path";
pub(crate) const AUTHENTICATE_FIRST: &str = "Please authenticate first";
pub(crate) const NO_RELATIVE_SEGMENTS: &str = "File path cannot contain '.' or '..' segments";

/// Where an upload lands: `{destination_path}/{file_name}` under private storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    destination_path: String,
    file_name: String,
}

impl UploadTarget {
    /// Surrounding slashes of the destination are dropped so joining never doubles them.
    pub fn new(destination_path: &str, file_name: &str) -> Self {
        Self {
            destination_path: destination_path.trim().trim_matches('/').to_string(),
            file_name: file_name.to_string(),
        }
    }

    /// Target named after the handle's file.
    pub fn for_handle(destination_path: &str, handle: &LocalImageHandle) -> Self {
        Self::new(destination_path, &handle.file_name_or_default())
    }

    pub fn destination_path(&self) -> &str {
        &self.destination_path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// True if any destination piece or the file name is `.` or `..`.
    fn has_relative_segment(&self) -> bool {
        self.destination_path
            .split('/')
            .chain(std::iter::once(self.file_name.as_str()))
            .any(|piece| matches!(piece.trim(), "." | ".."))
    }
}

/// What a completed upload reports back.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    pub upload_id: Uuid,
    pub remote_url: String,
    pub bytes: usize,
    pub content_type: String,
}

/// Holds the in-flight flag for the duration of one upload.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    /// Claims the flag, or returns `None` if it is already held.
    fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Runs one upload at a time against the remote private file storage.
#[derive(Debug)]
pub struct UploadPipeline {
    api: ApiClient,
    in_flight: AtomicBool,
}

impl UploadPipeline {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            in_flight: AtomicBool::new(false),
        }
    }

    /// True while an upload is outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Full URL the target resolves to.
    pub fn remote_url(&self, target: &UploadTarget) -> String {
        self.api
            .private_object_url(target.destination_path(), target.file_name())
    }

    /// Uploads the image behind `handle` to `target`.
    ///
    /// # Arguments
    ///
    /// * `handle` - The chosen image, if any
    /// * `target` - Destination path and file name
    /// * `credential` - The current credential, if signed in
    ///
    /// # Returns
    ///
    /// * `Ok(UploadReceipt)` - The server accepted the object
    /// * `Err(ClientError::Validation)` - A precondition is missing or the target contains a
    ///   `.`/`..` segment; nothing was sent
    /// * `Err(ClientError::UploadInFlight)` - Another upload is outstanding; nothing was sent
    /// * `Err(ClientError::ImageRead)` - The image could not be read
    /// * `Err(ClientError::Upload)` - The `PUT` failed or was rejected
    pub async fn upload(
        &self,
        handle: Option<&LocalImageHandle>,
        target: &UploadTarget,
        credential: Option<&Credential>,
    ) -> Result<UploadReceipt> {
        let handle = handle.ok_or_else(|| ClientError::validation(SELECT_IMAGE_FIRST))?;
        if target.destination_path().is_empty() || target.file_name().is_empty() {
            return Err(ClientError::validation(PROVIDE_FILE_PATH));
        }
        if target.has_relative_segment() {
            return Err(ClientError::validation(NO_RELATIVE_SEGMENTS));
        }
        let credential = credential.ok_or_else(|| ClientError::validation(AUTHENTICATE_FIRST))?;

        let _guard = InFlightGuard::claim(&self.in_flight).ok_or(ClientError::UploadInFlight)?;

        let upload_id = Uuid::new_v4();
        let remote_url = self.remote_url(target);
        info!(
            "📤 Upload {} of {} to {}",
            upload_id,
            handle.uri(),
            remote_url
        );

        let data = handle.read().await.map_err(|e| {
            error!("❌ Upload {}: reading {} failed: {}", upload_id, handle.uri(), e);
            ClientError::ImageRead(e)
        })?;

        let content_type = match handle.content_type() {
            "" => FALLBACK_CONTENT_TYPE,
            declared => declared,
        };
        let bytes = data.len();

        self.api
            .put_object(&remote_url, credential, content_type, data)
            .await
            .map_err(|e| {
                error!("❌ Upload {} failed: {}", upload_id, e.user_message());
                ClientError::Upload(e)
            })?;

        info!("✅ Upload {} stored {} bytes", upload_id, bytes);

        Ok(UploadReceipt {
            upload_id,
            remote_url,
            bytes,
            content_type: content_type.to_string(),
        })
    }
}
