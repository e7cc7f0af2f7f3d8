//! HTTP client for the blogging data store
//!
//! Reads the full `users` and `posts` collections in one request each. The
//! client never writes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{Error, Result};

use super::DataSource;
use super::types::{PostRecord, UserRecord};

/// Default base URL of the mock REST backend
const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Default request timeout (in seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Data store client
#[derive(Clone)]
pub struct ApiClient {
    http_client: HttpClient,
    base_url: String,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Builder for creating an ApiClient
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl ApiClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Take base URL and timeout from configuration
    pub fn config(mut self, config: &ApiConfig) -> Self {
        self.base_url = Some(config.resolved_base_url());
        self.timeout_secs = Some(config.timeout_secs);
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Build the ApiClient
    pub fn build(self) -> Result<ApiClient> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        if base_url.is_empty() {
            return Err(Error::InvalidInput("Base URL must not be empty".to_string()));
        }

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(
                self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()
            .map_err(Error::NetworkError)?;

        Ok(ApiClient {
            http_client,
            base_url,
        })
    }
}

impl ApiClient {
    /// Create a client from configuration
    pub fn new(config: &ApiConfig) -> Result<Self> {
        ApiClientBuilder::new().config(config).build()
    }

    /// Create a new builder for ApiClient
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.base_url, collection)
    }

    async fn get_collection<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let url = self.collection_url(collection);
        debug!(url = %url, "Fetching collection");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(Error::NetworkError)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::DataStoreStatus {
                status: status.as_u16(),
                url,
            });
        }

        let records: Vec<T> = response.json().await.map_err(Error::NetworkError)?;
        debug!(collection, count = records.len(), "Fetched collection");
        Ok(records)
    }
}

#[async_trait]
impl DataSource for ApiClient {
    async fn fetch_users(&self) -> Result<Vec<UserRecord>> {
        self.get_collection("users").await
    }

    async fn fetch_posts(&self) -> Result<Vec<PostRecord>> {
        self.get_collection("posts").await
    }
}
