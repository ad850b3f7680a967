//! Smart Deck - an always-on dashboard with a voice assistant
//!
//! This library provides the core functionality for the deck:
//! - Clock, weather and month calendar for the dashboard
//! - A voice pipeline: listen, transcribe, prompt, infer, act, speak
//! - Cloud or local inference behind one trait
//! - Hardware directives for the kiosk (screen off, brightness, reload)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   Front-end (kiosk)                  │
//! │    Clock  │  Weather  │  Calendar  │  Mic button     │
//! └────────────────────┬────────────────────────────────┘
//!                      │ HTTP / SSE
//! ┌────────────────────▼────────────────────────────────┐
//! │                     Deck daemon                      │
//! │  Assistant  │  Prompt  │  Directives  │  STT/TTS     │
//! └──────────┬─────────────────────────────┬────────────┘
//!            │                             │
//! ┌──────────▼──────────┐       ┌──────────▼────────────┐
//! │  Inference backend  │       │   Kiosk bridge        │
//! │   Cloud  │  Local   │       │   Fully Kiosk REST    │
//! └─────────────────────┘       └───────────────────────┘
//! ```

pub mod api;
pub mod assistant;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod daemon;
pub mod directive;
pub mod environment;
pub mod error;
pub mod hardware;
pub mod inference;
pub mod prompt;
pub mod voice;
pub mod weather;

pub use assistant::{Assistant, AssistantHandle, AssistantStatus, CaptureState, StartOutcome};
pub use config::Config;
pub use daemon::Daemon;
pub use directive::{DirectiveExecutor, DirectiveToken, DirectiveVocabulary};
pub use environment::{EnvironmentSnapshot, SnapshotReader, SnapshotWriter};
pub use error::{Error, Result};
pub use hardware::{HardwareBridge, HardwareCommand};
pub use inference::{InferenceBackend, InferenceError};
pub use prompt::{Prompt, PromptAssembler, PromptContext};
