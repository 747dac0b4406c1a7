use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use super::{Upstream, UpstreamPayload, UpstreamReply};
use crate::consts::{DEFAULT_API_BASE, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// e.g. `https://generativelanguage.googleapis.com/v1beta`
    pub api_base: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Calls the Gemini `generateContent` endpoint.
///
/// One `reqwest::Client` is built up front and shared by every call; it
/// holds no per-conversion state.
pub struct GeminiUpstream {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiUpstream {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    /// The key travels in the query string, as the API expects.
    fn endpoint(&self, api_key: &str) -> Result<Url> {
        let base = self.config.api_base.trim_end_matches('/');
        let url = format!("{}/models/{}:generateContent", base, self.config.model);
        Url::parse_with_params(&url, &[("key", api_key)])
            .with_context(|| format!("invalid Gemini endpoint: {}", url))
    }
}

#[async_trait]
impl Upstream for GeminiUpstream {
    async fn send(&self, api_key: &str, payload: &UpstreamPayload) -> Result<UpstreamReply> {
        let url = self.endpoint(api_key)?;

        // without_url: reqwest errors print the URL, and the URL carries the key
        let resp = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("request to Gemini failed")?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .context("failed to read Gemini response body")?;

        debug!(status, bytes = body.len(), model = %self.config.model, "gemini replied");

        Ok(UpstreamReply { status, body })
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
