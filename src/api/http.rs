//! Implements the `Backend` trait over HTTP with reqwest.

use crate::api::{ApiRequest, Backend, RawResponse};
use crate::error::ApiError;
use crate::Result;
use anyhow::Context;
use tracing::trace;
use url::Url;

/// Talks to a BudgetZen server rooted at `base_url`, e.g. `http://localhost:8000/api`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    http: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url).with_context(|| format!("Invalid API URL '{base_url}'"))?;
        anyhow::ensure!(
            matches!(parsed.scheme(), "http" | "https"),
            "The API URL must use http or https, got '{}'",
            parsed.scheme()
        );
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The absolute URL of an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn exchange(&self, request: ApiRequest) -> std::result::Result<RawResponse, ApiError> {
        let url = self.url(&request.path);
        trace!("exchange {} {url}", request.method);
        let mut builder = self
            .http
            .request(request.method, &url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(RawResponse { status, text })
    }
}
