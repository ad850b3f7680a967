//! Locally served model (Ollama-compatible engine)
//!
//! The engine must pull/load the model before it can answer. Progress is
//! streamed as newline-delimited JSON and forwarded to the caller; until
//! the pull reports success every `infer` call is refused.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::{InferenceBackend, InferenceError, LoadProgress, NOT_READY_PHRASE, ProgressCallback};
use crate::prompt::{ChatMessage, Prompt};
use crate::{Error, Result};

/// Default engine URL
pub const DEFAULT_LOCAL_URL: &str = "http://localhost:11434";

/// Default model identifier
pub const DEFAULT_LOCAL_MODEL: &str = "llama3.2:1b";

#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    model: &'a str,
    stream: bool,
}

/// One line of the pull progress stream
#[derive(Debug, Default, Deserialize)]
struct PullEvent {
    status: Option<String>,
    total: Option<u64>,
    completed: Option<u64>,
    error: Option<String>,
}

impl PullEvent {
    fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }

    fn progress(&self) -> LoadProgress {
        match (self.total, self.completed) {
            (Some(total), Some(completed)) if total > 0 => {
                #[allow(clippy::cast_precision_loss)]
                let fraction = (completed as f64 / total as f64).clamp(0.0, 1.0);
                LoadProgress {
                    text: format!("Loading: {:.0}%", fraction * 100.0),
                    fraction: Some(fraction),
                }
            }
            _ => LoadProgress {
                text: format!("Loading: {}", self.status.as_deref().unwrap_or("starting")),
                fraction: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Runs prompts through a locally loaded model
pub struct LocalBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    ready: AtomicBool,
}

impl LocalBackend {
    /// Create a local backend; call [`InferenceBackend::prepare`] before use
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            ready: AtomicBool::new(false),
        })
    }

    /// Model identifier
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn pull(&self, progress: ProgressCallback<'_>) -> Result<()> {
        let url = format!("{}/api/pull", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&PullRequest {
                model: &self.model,
                stream: true,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!("model pull failed {status}: {body}")));
        }

        let mut stream = response.bytes_stream();
        let mut pending = Vec::new();
        let mut succeeded = false;

        while let Some(chunk) = stream.next().await {
            pending.extend_from_slice(&chunk?);

            while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                succeeded |= handle_pull_line(&line, progress)?;
            }
        }
        if !pending.is_empty() {
            succeeded |= handle_pull_line(&pending, progress)?;
        }

        if succeeded {
            Ok(())
        } else {
            Err(Error::Inference(
                "model pull ended without success".to_string(),
            ))
        }
    }

    async fn chat(&self, prompt: &Prompt) -> std::result::Result<String, InferenceError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let messages = prompt.messages();

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest {
                model: &self.model,
                messages: &messages,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| InferenceError::Engine(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Engine(format!("engine returned {status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Engine(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| InferenceError::Engine("no choices in response".to_string()))
    }
}

/// Parse one progress line; returns true on the success marker
fn handle_pull_line(line: &[u8], progress: ProgressCallback<'_>) -> Result<bool> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return Ok(false);
    }

    let event: PullEvent = serde_json::from_str(line)?;
    if let Some(error) = event.error {
        return Err(Error::Inference(error));
    }

    let report = event.progress();
    tracing::debug!(progress = %report.text, "engine load progress");
    progress(report);

    Ok(event.is_success())
}

#[async_trait]
impl InferenceBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn not_ready_phrase(&self) -> Option<&'static str> {
        Some(NOT_READY_PHRASE)
    }

    async fn prepare(&self, progress: ProgressCallback<'_>) -> Result<()> {
        tracing::info!(model = %self.model, url = %self.base_url, "loading local model");

        self.pull(progress).await?;
        self.ready.store(true, Ordering::Release);

        progress(LoadProgress {
            text: "Ready".to_string(),
            fraction: Some(1.0),
        });
        tracing::info!(model = %self.model, "local model ready");
        Ok(())
    }

    async fn infer(&self, prompt: &Prompt) -> std::result::Result<String, InferenceError> {
        if !self.is_ready() {
            return Err(InferenceError::NotReady);
        }

        let reply = self.chat(prompt).await.inspect_err(|e| {
            tracing::error!(error = %e, "local inference failed");
        })?;

        tracing::debug!(reply_len = reply.len(), "local engine responded");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::directive::DirectiveVocabulary;
    use crate::environment::EnvironmentSnapshot;
    use crate::prompt::{PromptAssembler, PromptContext};

    fn prompt() -> Prompt {
        let context = PromptContext {
            time_label: "9:00:00 AM".to_string(),
            snapshot: EnvironmentSnapshot::default().with_battery(Some(80)),
        };
        PromptAssembler.assemble("dim the screen", &context, &DirectiveVocabulary::local())
    }

    const PULL_BODY: &str = concat!(
        "{\"status\":\"pulling manifest\"}\n",
        "{\"status\":\"pulling 74701a8c35f6\",\"digest\":\"sha256:74701a8c35f6\",\"total\":200,\"completed\":50}\n",
        "{\"status\":\"pulling 74701a8c35f6\",\"digest\":\"sha256:74701a8c35f6\",\"total\":200,\"completed\":200}\n",
        "{\"status\":\"success\"}\n",
    );

    async fn mount_pull(server: &MockServer, body: &str) {
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
            .mount(server)
            .await;
    }

    #[test]
    fn test_progress_text() {
        let event = PullEvent {
            status: Some("pulling abc".into()),
            total: Some(1000),
            completed: Some(420),
            error: None,
        };
        let progress = event.progress();
        assert_eq!(progress.text, "Loading: 42%");
        assert_eq!(progress.fraction, Some(0.42));

        let event = PullEvent {
            status: Some("verifying sha256 digest".into()),
            ..PullEvent::default()
        };
        assert_eq!(event.progress().text, "Loading: verifying sha256 digest");
    }

    #[tokio::test]
    async fn test_infer_before_load_is_refused() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let backend = LocalBackend::new(server.uri(), "tiny", None).unwrap();
        assert!(!backend.is_ready());

        let err = backend.infer(&prompt()).await.unwrap_err();
        assert!(matches!(err, InferenceError::NotReady));
        assert_eq!(err.spoken_apology(), NOT_READY_PHRASE);
    }

    #[tokio::test]
    async fn test_prepare_reports_progress_then_ready() {
        let server = MockServer::start().await;
        mount_pull(&server, PULL_BODY).await;

        let backend = LocalBackend::new(server.uri(), "tiny", None).unwrap();
        let seen = Mutex::new(Vec::new());
        backend
            .prepare(&|p: LoadProgress| seen.lock().unwrap().push(p.text))
            .await
            .unwrap();

        assert!(backend.is_ready());
        let seen = seen.into_inner().unwrap();
        assert_eq!(
            seen,
            vec![
                "Loading: pulling manifest",
                "Loading: 25%",
                "Loading: 100%",
                "Loading: success",
                "Ready",
            ]
        );
    }

    #[tokio::test]
    async fn test_pull_error_keeps_backend_unready() {
        let server = MockServer::start().await;
        mount_pull(&server, "{\"error\":\"pull model manifest: file does not exist\"}\n").await;

        let backend = LocalBackend::new(server.uri(), "missing", None).unwrap();
        let result = backend.prepare(&|_| {}).await;

        assert!(result.is_err());
        assert!(!backend.is_ready());
    }

    #[tokio::test]
    async fn test_chat_completion_after_load() {
        let server = MockServer::start().await;
        mount_pull(&server, PULL_BODY).await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "[[BRIGHT_LOW]] Dimmed." },
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = LocalBackend::new(server.uri(), "tiny", None).unwrap();
        backend.prepare(&|_| {}).await.unwrap();

        let reply = backend.infer(&prompt()).await.unwrap();
        assert_eq!(reply, "[[BRIGHT_LOW]] Dimmed.");

        let requests = server.received_requests().await.unwrap();
        let chat = requests
            .iter()
            .find(|r| r.url.path() == "/v1/chat/completions")
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&chat.body).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "dim the screen");
    }

    #[tokio::test]
    async fn test_engine_failure_is_confusion() {
        let server = MockServer::start().await;
        mount_pull(&server, PULL_BODY).await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .mount(&server)
            .await;

        let backend = LocalBackend::new(server.uri(), "tiny", None).unwrap();
        backend.prepare(&|_| {}).await.unwrap();

        let err = backend.infer(&prompt()).await.unwrap_err();
        assert_eq!(err.spoken_apology(), "Sorry, I got confused.");
    }
}
