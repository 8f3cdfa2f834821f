//! HTTP implementation of [`ItemApi`].

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use seqfetch_api_models::{AccessToken, Artifact, DownloadLink, Item, ItemCode, Sample};

use crate::progress::ProgressCallback;
use crate::{ApiError, ItemApi, auth, download, require_env};

/// Production API endpoint.
pub const DEFAULT_API_URL: &str = "https://plasmidsaurus.com";

const USER_AGENT: &str = "seqfetch/0.1";

/// Maximum length of an error body included in log messages.
const BODY_PREVIEW_LEN: usize = 200;

/// Where to reach the API and which credentials to use.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL without a trailing slash.
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: &str, client_id: String, client_secret: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
        }
    }

    /// Reads credentials from `PLASMIDSAURUS_CLIENT_ID` and
    /// `PLASMIDSAURUS_CLIENT_SECRET`, and the endpoint from
    /// `PLASMIDSAURUS_API_URL` (falling back to [`DEFAULT_API_URL`]).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MissingEnv`] if a credential is unset.
    pub fn from_env() -> Result<Self, ApiError> {
        let client_id = require_env("PLASMIDSAURUS_CLIENT_ID")?;
        let client_secret = require_env("PLASMIDSAURUS_CLIENT_SECRET")?;
        let base_url = std::env::var("PLASMIDSAURUS_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        Ok(Self::new(&base_url, client_id, client_secret))
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

/// Authenticated API client.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: AccessToken,
}

impl ApiClient {
    /// Builds an HTTP client and acquires a token for this run.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Auth`] if the token exchange fails.
    pub async fn connect(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let token = auth::acquire_token(
            &http,
            &config.base_url,
            &config.client_id,
            &config.client_secret,
        )
        .await?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            token,
        })
    }

    /// Creates a client around an already-acquired token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the HTTP client cannot be built.
    pub fn with_token(base_url: &str, token: AccessToken) -> Result<Self, ApiError> {
        Ok(Self {
            http: reqwest::Client::builder().user_agent(USER_AGENT).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the reads lookup endpoint for an item.
    #[must_use]
    pub fn reads_url(&self, code: &ItemCode) -> String {
        reads_url(&self.base_url, code)
    }

    /// Lists only the caller's own items, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails.
    pub async fn list_owned_items(&self) -> Result<Vec<Item>, ApiError> {
        self.get_json("items").await
    }

    /// Lists only the items shared with the caller, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails.
    pub async fn list_shared_items(&self) -> Result<Vec<Item>, ApiError> {
        self.get_json("items?shared=true").await
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.api_url(path);
        log::debug!("GET {url}");

        let resp = self
            .http
            .get(&url)
            .bearer_auth(self.token.secret())
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ApiError::HttpStatus {
                url,
                status: resp.status().as_u16(),
            });
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl ItemApi for ApiClient {
    async fn list_items(&self) -> Result<Vec<Item>, ApiError> {
        let catalog_err = |e: ApiError| ApiError::Catalog {
            message: e.to_string(),
        };

        let owned = self.list_owned_items().await.map_err(catalog_err)?;
        let shared = self.list_shared_items().await.map_err(catalog_err)?;

        Ok(merge_listings(owned, shared))
    }

    async fn get_item(&self, code: &ItemCode) -> Result<Item, ApiError> {
        self.get_json(&format!("item/{code}")).await
    }

    async fn samples(&self, code: &ItemCode) -> Result<Vec<Sample>, ApiError> {
        self.get_json(&format!("item/{code}/samples")).await
    }

    async fn artifact_link(
        &self,
        code: &ItemCode,
        artifact: Artifact,
    ) -> Result<Option<String>, ApiError> {
        let url = self.api_url(&format!("item/{code}/{artifact}"));
        log::debug!("GET {url}");

        let resp = self
            .http
            .get(&url)
            .bearer_auth(self.token.secret())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            log::warn!(
                "No {artifact} found for {code}: HTTP {status} {}",
                preview(&body)
            );
            return Ok(None);
        }

        let body: serde_json::Value = resp.json().await?;
        parse_link_response(body).map(Some)
    }

    async fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: &dyn ProgressCallback,
    ) -> Result<u64, ApiError> {
        download::download_file(&self.http, url, dest, progress).await
    }
}

/// Owned items followed by shared items, in listing order.
///
/// An item that appears in both listings is kept twice.
#[must_use]
pub fn merge_listings(mut owned: Vec<Item>, shared: Vec<Item>) -> Vec<Item> {
    log::info!(
        "Found {} item(s): {} owned, {} shared",
        owned.len() + shared.len(),
        owned.len(),
        shared.len()
    );

    owned.extend(shared);
    owned
}

/// URL of the reads lookup endpoint for an item under `base_url`.
#[must_use]
pub fn reads_url(base_url: &str, code: &ItemCode) -> String {
    format!(
        "{}/api/item/{code}/{}",
        base_url.trim_end_matches('/'),
        Artifact::Reads
    )
}

/// Parses the `{"link": url}` body of a results/reads lookup.
fn parse_link_response(body: serde_json::Value) -> Result<String, ApiError> {
    let DownloadLink { link } = serde_json::from_value(body)?;
    Ok(link)
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(BODY_PREVIEW_LEN) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use seqfetch_api_models::{ItemStatus, ProductName};

    use super::*;

    fn code(s: &str) -> ItemCode {
        s.parse().unwrap()
    }

    fn item(c: &str) -> Item {
        Item {
            code: code(c),
            done_date: Some("2024-09-02T00:00:00+00:00".to_string()),
            gross: 15.0,
            product_name: ProductName::PlasmidHighCopy,
            quantity: 1,
            status: ItemStatus::Complete,
        }
    }

    #[test]
    fn merged_listing_puts_owned_before_shared_and_keeps_repeats() {
        let owned = vec![item("AAA111"), item("BBB222")];
        let shared = vec![item("CCC333"), item("AAA111")];

        let merged = merge_listings(owned, shared);

        let codes: Vec<&str> = merged.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, ["AAA111", "BBB222", "CCC333", "AAA111"]);
    }

    #[test]
    fn merged_listing_handles_empty_sides() {
        assert!(merge_listings(Vec::new(), Vec::new()).is_empty());

        let merged = merge_listings(Vec::new(), vec![item("CCC333")]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].code, code("CCC333"));
    }

    #[test]
    fn parses_link_response() {
        let body = serde_json::json!({"link": "https://files.example.com/ABC123.zip?sig=1"});
        assert_eq!(
            parse_link_response(body).unwrap(),
            "https://files.example.com/ABC123.zip?sig=1"
        );
    }

    #[test]
    fn rejects_link_response_without_link() {
        let body = serde_json::json!({"detail": "not found"});
        assert!(matches!(
            parse_link_response(body),
            Err(ApiError::Json(_))
        ));
    }

    #[test]
    fn builds_reads_url() {
        assert_eq!(
            reads_url("https://plasmidsaurus.com/", &code("ABC123")),
            "https://plasmidsaurus.com/api/item/ABC123/reads"
        );
    }

    #[test]
    fn client_urls_use_api_prefix() {
        let client =
            ApiClient::with_token("https://example.com/", AccessToken::new("t".to_string()))
                .unwrap();
        assert_eq!(client.base_url(), "https://example.com");
        assert_eq!(
            client.api_url("items?shared=true"),
            "https://example.com/api/items?shared=true"
        );
        assert_eq!(
            client.reads_url(&code("Z9SVSX")),
            "https://example.com/api/item/Z9SVSX/reads"
        );
    }

    #[test]
    fn config_debug_hides_secret() {
        let config = ApiConfig::new("https://example.com/", "id".to_string(), "hunter2".to_string());
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert_eq!(config.base_url, "https://example.com");
    }

    #[test]
    fn preview_truncates_long_bodies() {
        let body = "x".repeat(1000);
        assert_eq!(preview(&body).len(), BODY_PREVIEW_LEN);
        assert_eq!(preview("short"), "short");
    }
}
