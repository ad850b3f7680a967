//! Hosted generative-text backend (Gemini `generateContent`)

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{InferenceBackend, InferenceError};
use crate::prompt::Prompt;
use crate::{Error, Result};

/// Default API base URL
pub const DEFAULT_CLOUD_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model
pub const DEFAULT_CLOUD_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Sends prompts to a hosted model
pub struct CloudBackend {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl CloudBackend {
    /// Create a cloud backend
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty or the HTTP client cannot be built
    pub fn new(
        api_key: SecretString,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(Error::Config(
                "API key required for the cloud backend".to_string(),
            ));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            api_key,
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn generate(&self, text: &str) -> std::result::Result<String, InferenceError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text }],
            }],
        };

        // The key travels in the query string, so strip URLs from errors
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.expose_secret())])
            .json(&request)
            .send()
            .await
            .map_err(|e| InferenceError::Unreachable(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| InferenceError::Unreachable(e.without_url().to_string()))?;

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| InferenceError::Unreachable(format!("bad response ({status}): {e}")))?;

        let Some(candidates) = parsed.candidates else {
            tracing::warn!(status = %status, body = %body, "cloud response had no candidates");
            return Err(InferenceError::InvalidCredentials);
        };

        candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| InferenceError::Unreachable("empty candidate".to_string()))
    }
}

#[async_trait]
impl InferenceBackend for CloudBackend {
    fn name(&self) -> &'static str {
        "cloud"
    }

    fn is_ready(&self) -> bool {
        true
    }

    async fn infer(&self, prompt: &Prompt) -> std::result::Result<String, InferenceError> {
        tracing::debug!(model = %self.model, "sending prompt to cloud");

        let reply = self.generate(&prompt.text()).await.inspect_err(|e| {
            tracing::error!(error = %e, "cloud inference failed");
        })?;

        tracing::debug!(reply_len = reply.len(), "cloud responded");
        Ok(reply)
    }
}
