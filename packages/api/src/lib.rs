#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Client for the sequencing results REST API.
//!
//! A run starts by exchanging client credentials for a bearer token
//! ([`auth::acquire_token`]), then talks to the item endpoints through
//! [`ApiClient`]. Everything downstream of the token depends only on the
//! [`ItemApi`] trait so the sync logic can be driven by a fake in tests.
//!
//! # Environment Variables
//!
//! | Variable | Required | Description |
//! |---|---|---|
//! | `PLASMIDSAURUS_CLIENT_ID` | Yes | OAuth2 client ID |
//! | `PLASMIDSAURUS_CLIENT_SECRET` | Yes | OAuth2 client secret |
//! | `PLASMIDSAURUS_API_URL` | No | API base URL (default `https://plasmidsaurus.com`) |

pub mod auth;
pub mod client;
pub mod download;
pub mod progress;

use std::path::Path;

use async_trait::async_trait;
use seqfetch_api_models::{Artifact, Item, ItemCode, Sample};

pub use client::{ApiClient, ApiConfig, DEFAULT_API_URL};

use crate::progress::ProgressCallback;

/// Errors that can occur while talking to the API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing required environment variable.
    #[error("Missing environment variable: {name}")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: String,
    },

    /// Credentials were rejected or the token endpoint was unreachable.
    #[error("Authentication failed: {message}")]
    Auth {
        /// Description of what went wrong.
        message: String,
    },

    /// The item listing could not be fetched.
    #[error("Failed to list items: {message}")]
    Catalog {
        /// Description of what went wrong.
        message: String,
    },

    /// Non-success HTTP status.
    #[error("HTTP {status} for {url}")]
    HttpStatus {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error writing a download to disk.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Item endpoints of the API, as seen by an authenticated caller.
///
/// [`ApiClient`] is the HTTP implementation.
#[async_trait]
pub trait ItemApi: Send + Sync {
    /// Lists the caller's own items followed by the items shared with
    /// them. Duplicates across the two lists are kept.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Catalog`] if either listing fails.
    async fn list_items(&self) -> Result<Vec<Item>, ApiError>;

    /// Fetches a single item.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails or the item does not exist.
    async fn get_item(&self, code: &ItemCode) -> Result<Item, ApiError>;

    /// Lists the samples of an item.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails.
    async fn samples(&self, code: &ItemCode) -> Result<Vec<Sample>, ApiError>;

    /// Looks up the download link for one of an item's archives.
    ///
    /// Returns `Ok(None)` when the server reports the archive as
    /// unavailable (any non-success status).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a malformed body.
    async fn artifact_link(
        &self,
        code: &ItemCode,
        artifact: Artifact,
    ) -> Result<Option<String>, ApiError>;

    /// Streams `url` to `dest`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the transfer or the local write fails.
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: &dyn ProgressCallback,
    ) -> Result<u64, ApiError>;
}

/// Reads a required environment variable.
pub(crate) fn require_env(name: &str) -> Result<String, ApiError> {
    std::env::var(name).map_err(|_| ApiError::MissingEnv {
        name: name.to_string(),
    })
}
