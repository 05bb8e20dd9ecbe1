//! # Remote API Transport
//!
//! Thin wrapper around a `reqwest` client that knows the three endpoints the orchestrator uses:
//!
//! ```text
//! POST {base}/auth                         JSON identity    -> {apiKey, token}
//! POST {base}/auth/logout                  credential hdrs  -> (no body)
//! PUT  {base}/files/private/{path}/{name}  credential hdrs  -> (no body), raw binary request body
//! ```
//!
//! Every call is a single attempt. Non-success statuses become [`ApiError::Status`] carrying the
//! server's message when it sent one.

use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as HttpClient, RequestBuilder, Response, Url};
use std::time::Duration;

use crate::client::credentials::Credential;
use crate::common::config::ApiConfig;
use crate::common::error::ApiError;
use crate::common::messages::{ApiErrorBody, AuthRequest, AuthResponse};

/// Literal path segment of the private file storage.
pub const PRIVATE_FILES_SEGMENT: &str = "files/private";

/// HTTP client bound to one API base and one pair of credential header names.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    config: ApiConfig,
    /// Parsed `base_url`; always usable as a base for path segments
    base: Url,
}

impl ApiClient {
    /// Builds the underlying HTTP client.
    ///
    /// # Errors
    ///
    /// Fails if the base URL is not an absolute `http(s)`-style URL, or if the TLS backend cannot
    /// be initialized.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{}: {}", config.base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(config.base_url.clone()));
        }

        let mut builder = HttpClient::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            http: builder.build()?,
            config,
            base,
        })
    }

    /// API base without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Full URL of the private object `{destination_path}/{file_name}`.
    ///
    /// Every `/`-separated piece of the destination and the file name become one percent-encoded
    /// path segment each, so `#`, `?` and `%` stay part of the object key. Empty pieces are
    /// skipped.
    pub fn private_object_url(&self, destination_path: &str, file_name: &str) -> String {
        let mut url = self.base.clone();
        // `new` rejected bases that cannot take path segments.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(PRIVATE_FILES_SEGMENT.split('/'))
                .extend(destination_path.split('/').filter(|piece| !piece.is_empty()))
                .push(file_name);
        }
        url.into()
    }

    /// `POST /auth`
    pub async fn post_auth(&self, body: &AuthRequest<'_>) -> Result<AuthResponse, ApiError> {
        let url = format!("{}/auth", self.base_url());
        debug!("POST {}", url);

        let response = Self::check(self.http.post(url).json(body).send().await?).await?;
        let auth: AuthResponse = response.json().await?;
        Ok(auth)
    }

    /// `POST /auth/logout`
    pub async fn post_logout(&self, credential: &Credential) -> Result<(), ApiError> {
        let url = format!("{}/auth/logout", self.base_url());
        debug!("POST {}", url);

        let request = self.authorized(self.http.post(url), credential);
        Self::check(request.send().await?).await?;
        Ok(())
    }

    /// `PUT` of a raw binary body to an already computed object URL.
    pub async fn put_object(
        &self,
        url: &str,
        credential: &Credential,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), ApiError> {
        debug!("PUT {} ({} bytes, {})", url, body.len(), content_type);

        let request = self
            .authorized(self.http.put(url), credential)
            .header(CONTENT_TYPE, content_type)
            .body(body);
        Self::check(request.send().await?).await?;
        Ok(())
    }

    fn authorized(&self, request: RequestBuilder, credential: &Credential) -> RequestBuilder {
        request
            .header(self.config.api_key_header.as_str(), credential.api_key())
            .header(self.config.token_header.as_str(), credential.token())
    }

    /// Passes success responses through; turns anything else into [`ApiError::Status`].
    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            message: ApiErrorBody::message_from(&text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_object_url() {
        let api = ApiClient::new(ApiConfig::with_base_url("https://api.soracom.io/v1/")).unwrap();
        assert_eq!(api.base_url(), "https://api.soracom.io/v1");
        assert_eq!(
            api.private_object_url("photos", "cat.jpg"),
            "https://api.soracom.io/v1/files/private/photos/cat.jpg"
        );
        assert_eq!(
            api.private_object_url("photos/2024", "cat.jpg"),
            "https://api.soracom.io/v1/files/private/photos/2024/cat.jpg"
        );
    }

    #[test]
    fn test_object_url_encodes_segments() {
        let api = ApiClient::new(ApiConfig::default()).unwrap();
        assert_eq!(
            api.private_object_url("photos#1/a?b", "my cat.jpg"),
            "https://api.soracom.io/v1/files/private/photos%231/a%3Fb/my%20cat.jpg"
        );
        assert_eq!(
            api.private_object_url("photos//2024", "100%.jpg"),
            "https://api.soracom.io/v1/files/private/photos/2024/100%25.jpg"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        for base in ["not a url", "mailto:someone@example.com"] {
            let err = ApiClient::new(ApiConfig::with_base_url(base)).unwrap_err();
            assert!(matches!(err, ApiError::InvalidBaseUrl(_)), "{}", base);
        }
    }
}
