//! One assistant turn: prompt, infer, act, speak

use std::sync::Arc;

use crate::clock::ClockSource;
use crate::directive::{DirectiveExecutor, DirectiveVocabulary};
use crate::environment::SnapshotReader;
use crate::hardware::{HardwareBridge, HardwareCommand};
use crate::inference::InferenceBackend;
use crate::prompt::{PromptAssembler, PromptContext};
use crate::voice::SpeechOutput;

/// What a turn ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model answered; commands were dispatched and the text spoken
    Replied {
        spoken_text: String,
        commands: Vec<HardwareCommand>,
    },
    /// Inference failed; only the apology was spoken
    Apologized { phrase: &'static str },
}

impl TurnOutcome {
    /// Text that was handed to speech output
    #[must_use]
    pub fn spoken(&self) -> &str {
        match self {
            Self::Replied { spoken_text, .. } => spoken_text,
            Self::Apologized { phrase } => phrase,
        }
    }
}

/// Stateless turn runner shared by the assistant and the CLI
pub struct Pipeline {
    assembler: PromptAssembler,
    executor: DirectiveExecutor,
    backend: Arc<dyn InferenceBackend>,
    speech: Arc<dyn SpeechOutput>,
    bridge: Option<Arc<dyn HardwareBridge>>,
    snapshot: SnapshotReader,
    include_battery: bool,
    clock: ClockSource,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        speech: Arc<dyn SpeechOutput>,
        snapshot: SnapshotReader,
        vocabulary: DirectiveVocabulary,
    ) -> Self {
        Self {
            assembler: PromptAssembler,
            executor: DirectiveExecutor::new(vocabulary),
            backend,
            speech,
            bridge: None,
            snapshot,
            include_battery: false,
            clock: ClockSource,
        }
    }

    /// Attach the kiosk bridge used for directives (and battery readings)
    #[must_use]
    pub fn with_bridge(mut self, bridge: Arc<dyn HardwareBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Report battery level in the prompt context
    #[must_use]
    pub const fn with_battery(mut self, include: bool) -> Self {
        self.include_battery = include;
        self
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn InferenceBackend> {
        &self.backend
    }

    #[must_use]
    pub fn speech(&self) -> &Arc<dyn SpeechOutput> {
        &self.speech
    }

    /// Run one turn for a transcript
    ///
    /// Never fails: inference errors become a spoken apology and speech
    /// errors are logged.
    pub async fn run_turn(&self, transcript: &str) -> TurnOutcome {
        let context = self.context().await;
        let prompt = self
            .assembler
            .assemble(transcript, &context, self.executor.vocabulary());

        tracing::debug!(backend = self.backend.name(), transcript = prompt.transcript(), "inferring");

        let outcome = match self.backend.infer(&prompt).await {
            Ok(reply) => {
                tracing::info!(reply = %reply, "model replied");
                let execution = self.executor.execute(&reply);
                DirectiveExecutor::dispatch(&execution.commands, self.bridge.as_deref()).await;
                TurnOutcome::Replied {
                    spoken_text: execution.spoken_text,
                    commands: execution.commands,
                }
            }
            Err(e) => {
                tracing::warn!(backend = self.backend.name(), error = %e, "inference failed");
                TurnOutcome::Apologized {
                    phrase: e.spoken_apology(),
                }
            }
        };

        self.say(outcome.spoken()).await;
        outcome
    }

    /// Speak text, logging failures
    pub async fn say(&self, text: &str) {
        if let Err(e) = self.speech.speak(text).await {
            tracing::warn!(error = %e, "speech output failed");
        }
    }

    async fn context(&self) -> PromptContext {
        let mut snapshot = self.snapshot.current();

        if self.include_battery {
            if let Some(bridge) = &self.bridge {
                match bridge.battery_level().await {
                    Ok(level) => snapshot = snapshot.with_battery(Some(level)),
                    Err(e) => tracing::debug!(error = %e, "battery level unavailable"),
                }
            }
        }

        PromptContext {
            time_label: self.clock.tick().prompt_time_label,
            snapshot,
        }
    }
}
