//! HTTP-backed completion engine.
//!
//! Posts one JSON request per generation to a completion service and
//! maps its reply onto [`Completion`]. The base URL is injectable for
//! testing against wiremock.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Completion, CompletionEngine};
use crate::types::{CallerId, Usage};
use crate::{HeimdallrError, Result};

/// Default request timeout for the underlying HTTP client.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct GenerateRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
    user: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    text: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    tokens_in: u32,
    #[serde(default)]
    tokens_out: u32,
}

/// Completion engine speaking a minimal JSON-over-HTTP protocol.
///
/// `POST {base_url}/v1/generate` with bearer auth; the service replies
/// with `{ text, model?, tokens_in, tokens_out }`.
#[derive(Clone)]
pub struct HttpCompletionEngine {
    api_key: String,
    http: Client,
    base_url: String,
}

impl HttpCompletionEngine {
    /// Create an engine pointed at `base_url` with the given API key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| HeimdallrError::Configuration(e.to_string()))?;

        Ok(Self {
            api_key: api_key.into(),
            http,
            base_url: base_url.into(),
        })
    }

    fn map_status(status: reqwest::StatusCode, body: String) -> HeimdallrError {
        match status.as_u16() {
            401 | 403 => HeimdallrError::AuthenticationRequired,
            429 => HeimdallrError::RateLimited,
            s if s >= 500 => HeimdallrError::Upstream(format!("server error ({s}): {body}")),
            s => HeimdallrError::Api {
                status: s,
                message: body,
            },
        }
    }
}

#[async_trait]
impl CompletionEngine for HttpCompletionEngine {
    fn name(&self) -> &str {
        "http"
    }

    async fn generate(
        &self,
        message: &str,
        context: Option<&str>,
        caller: &CallerId,
    ) -> Result<Completion> {
        let url = format!("{}/v1/generate", self.base_url);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&GenerateRequest {
                message,
                context,
                user: caller.as_str(),
            })
            .send()
            .await
            .map_err(|e| HeimdallrError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status(status, body));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| HeimdallrError::Http(e.to_string()))?;

        if body.text.is_empty() {
            return Err(HeimdallrError::EmptyResponse);
        }

        Ok(Completion {
            text: body.text,
            model: body.model,
            usage: Usage::new(body.tokens_in, body.tokens_out),
        })
    }
}
