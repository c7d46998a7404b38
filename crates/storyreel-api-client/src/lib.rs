//! HTTP client for the trailer generation backend.
//!
//! Provides a small client with generic GET/POST/DELETE helpers, domain
//! methods for projects, scenes, assets and generation, and the decoder of the
//! server-sent image event stream. The workflow and CLI crates use this client
//! directly.

pub mod api;
pub mod events;
pub mod sse;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use storyreel_core::config::API_PREFIX;
use storyreel_core::models::ErrorPayload;
use storyreel_core::ClientConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Typed failure carried inside `anyhow::Error` so callers can tell a
/// remote rejection from a transport failure with `downcast_ref`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },
}

impl ApiError {
    pub fn status(&self) -> u16 {
        let ApiError::Status { status, .. } = self;
        *status
    }

    /// The `detail` field of a JSON body, and nothing else.
    pub fn structured_detail(&self) -> Option<String> {
        let ApiError::Status { body, .. } = self;
        ErrorPayload::extract_detail(body)
    }

    /// The `detail` field of a JSON body. A body that is not JSON is
    /// returned as is when non-blank.
    pub fn detail(&self) -> Option<String> {
        let ApiError::Status { body, .. } = self;
        if serde_json::from_str::<serde_json::Value>(body).is_ok() {
            return self.structured_detail();
        }
        let body = body.trim();
        (!body.is_empty()).then(|| body.to_string())
    }
}

/// HTTP client for the backend API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    /// No overall timeout: image streams stay open for minutes, and the
    /// analysis and animation requests block until the providers answer.
    untimed_client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        let untimed_client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to create untimed HTTP client")?;

        Ok(Self {
            client,
            untimed_client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create client from environment: STORYREEL_API_URL (or API_URL).
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env()?;
        Self::new(&config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of a route below the API prefix, e.g. `/projects/`.
    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    /// Turns a non-success response into [`ApiError::Status`].
    async fn ensure_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        }
        .into())
    }

    async fn send(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.context("Failed to send request")?;
        Self::ensure_success(response).await
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        let response = Self::send(request).await?;
        let body: T = response
            .json()
            .await
            .context("Failed to parse response as JSON")?;
        Ok(body)
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut request = self.client.get(self.build_url(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        Self::send_json(request).await
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.client.post(self.build_url(path)).json(body);
        Self::send_json(request).await
    }

    /// DELETE request. Returns Ok(()) on success.
    pub async fn delete(&self, path: &str) -> Result<()> {
        Self::send(self.client.delete(self.build_url(path))).await?;
        Ok(())
    }

    /// POST JSON without the request timeout, for calls that last as long as
    /// a generation provider does.
    pub(crate) async fn post_json_untimed<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.untimed_client.post(self.build_url(path)).json(body);
        Self::send_json(request).await
    }

    /// POST with query parameters and no request timeout.
    pub(crate) async fn post_query_untimed<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let request = self.untimed_client.post(self.build_url(path)).query(query);
        Self::send_json(request).await
    }

    /// GET a long-lived response without the request timeout.
    pub(crate) async fn get_stream(&self, url: &str, query: &[(&str, String)]) -> Result<Response> {
        let mut request = self.untimed_client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        Self::send(request).await
    }
}

// Re-export domain types for convenience.
pub use events::{ImageEvent, ImageEventStream};
pub use storyreel_core::models::{
    AnalyzeScriptResponse, AnimateScenesResponse, Asset, Project, Scene, VideoProviderInfo,
};
