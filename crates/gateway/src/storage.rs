//! Object storage client for event images.
//!
//! Talks to an S3-compatible object store over its REST surface: one PUT
//! per object, bearer-token auth, and public reads served from a separate
//! CDN base URL.

use axum::body::Bytes;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::instrument;

use crate::config::StorageConfig;

/// Errors that can occur when writing to the object store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store rejected the write.
    #[error("object store returned {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The configured public URL cannot be joined with an object name.
    #[error("invalid public URL: {0}")]
    PublicUrl(#[from] url::ParseError),
}

/// Client for the object store holding uploaded event images.
#[derive(Clone)]
pub struct ObjectStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    access_token: SecretString,
    public_url: String,
}

impl ObjectStore {
    /// Create a new object store client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            access_token: config.access_token.clone(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
        })
    }

    /// Write an object and return nothing; the name is the caller's.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the store answers non-2xx.
    #[instrument(skip(self, bytes), fields(object = %object_name, size = bytes.len()))]
    pub async fn put(
        &self,
        object_name: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let url = format!("{}/{}/{object_name}", self.endpoint, self.bucket);

        let response = self
            .client
            .put(url)
            .bearer_auth(self.access_token.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    /// Public URL an uploaded object is served from.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured base URL does not parse.
    pub fn public_url(&self, object_name: &str) -> Result<String, StorageError> {
        let base = url::Url::parse(&format!("{}/", self.public_url))?;
        Ok(base.join(object_name)?.to_string())
    }
}
