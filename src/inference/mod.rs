//! Language model backends
//!
//! The pipeline only sees [`InferenceBackend`]: prompt in, reply text out.
//! Which implementation is active is a configuration choice.

mod cloud;
mod local;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::prompt::Prompt;

pub use cloud::{CloudBackend, DEFAULT_CLOUD_MODEL, DEFAULT_CLOUD_URL};
pub use local::{DEFAULT_LOCAL_MODEL, DEFAULT_LOCAL_URL, LocalBackend};

/// Spoken when the local engine has not finished loading
pub const NOT_READY_PHRASE: &str = "Please wait, my brain is still loading.";

/// Why a turn produced no reply
///
/// Each variant maps to a fixed spoken apology; none of them is fatal.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Engine still loading
    #[error("inference engine not ready")]
    NotReady,

    /// The cloud answered without candidates
    #[error("response had no candidates")]
    InvalidCredentials,

    /// The cloud could not be reached or answered garbage
    #[error("cloud unreachable: {0}")]
    Unreachable(String),

    /// The local engine call failed
    #[error("engine failure: {0}")]
    Engine(String),
}

impl InferenceError {
    /// Fixed phrase spoken in place of a reply
    #[must_use]
    pub const fn spoken_apology(&self) -> &'static str {
        match self {
            Self::NotReady => NOT_READY_PHRASE,
            Self::InvalidCredentials => "My API key might be invalid.",
            Self::Unreachable(_) => "I cannot reach the cloud.",
            Self::Engine(_) => "Sorry, I got confused.",
        }
    }
}

/// Load-phase progress report
#[derive(Debug, Clone, PartialEq)]
pub struct LoadProgress {
    /// Human-readable, e.g. "Loading: 42%"
    pub text: String,
    /// 0.0 to 1.0 when the engine reports sizes
    pub fraction: Option<f64>,
}

/// Callback receiving load progress
pub type ProgressCallback<'a> = &'a (dyn Fn(LoadProgress) + Send + Sync);

/// Engine readiness as shown on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    pub backend: &'static str,
    pub ready: bool,
    /// Latest load message, e.g. "Loading: 42%" or "Ready"
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fraction: Option<f64>,
}

impl EngineStatus {
    /// Status before `prepare` has reported anything
    #[must_use]
    pub fn starting(backend: &'static str) -> Self {
        Self {
            backend,
            ready: false,
            text: "Loading...".to_string(),
            fraction: None,
        }
    }

    /// Status after a progress report
    #[must_use]
    pub fn loading(backend: &'static str, progress: LoadProgress) -> Self {
        Self {
            backend,
            ready: false,
            text: progress.text,
            fraction: progress.fraction,
        }
    }

    /// Status once the backend can infer
    #[must_use]
    pub fn ready(backend: &'static str) -> Self {
        Self {
            backend,
            ready: true,
            text: "Ready".to_string(),
            fraction: Some(1.0),
        }
    }
}

/// Text in, text out
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Short identifier for logs and the dashboard
    fn name(&self) -> &'static str;

    /// Whether `infer` can be called now
    fn is_ready(&self) -> bool;

    /// Refusal spoken when a session is requested before the backend is ready
    ///
    /// `None` means start requests are dropped silently.
    fn not_ready_phrase(&self) -> Option<&'static str> {
        None
    }

    /// Load or download whatever the backend needs before `infer`
    ///
    /// # Errors
    ///
    /// Returns error if the load phase fails; the backend stays not-ready
    async fn prepare(&self, _progress: ProgressCallback<'_>) -> crate::Result<()> {
        Ok(())
    }

    /// Produce a reply for one prompt
    async fn infer(&self, prompt: &Prompt) -> Result<String, InferenceError>;
}

/// Which backend to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// Hosted generative-text API
    #[default]
    Cloud,
    /// Locally served model
    Local,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cloud => f.write_str("cloud"),
            Self::Local => f.write_str("local"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cloud" | "gemini" => Ok(Self::Cloud),
            "local" | "ollama" => Ok(Self::Local),
            other => Err(format!("unknown inference backend: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apologies() {
        assert_eq!(
            InferenceError::InvalidCredentials.spoken_apology(),
            "My API key might be invalid."
        );
        assert_eq!(
            InferenceError::Unreachable("dns".into()).spoken_apology(),
            "I cannot reach the cloud."
        );
        assert_eq!(
            InferenceError::Engine("oom".into()).spoken_apology(),
            "Sorry, I got confused."
        );
        assert_eq!(InferenceError::NotReady.spoken_apology(), NOT_READY_PHRASE);
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("cloud".parse(), Ok(BackendKind::Cloud));
        assert_eq!(" LOCAL ".parse(), Ok(BackendKind::Local));
        assert!("mainframe".parse::<BackendKind>().is_err());
    }
}
