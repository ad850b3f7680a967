//! Voice assistant
//!
//! A single task owns the capture session. Requests arrive through an
//! [`AssistantHandle`]; recognition and inference run on spawned tasks
//! that report back to the owner, so session state only ever changes in
//! one place.
//!
//! A request made while a session is active is answered with
//! [`StartOutcome::Busy`] and dropped, never queued.

mod controller;
mod pipeline;

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::Instrument;
use uuid::Uuid;

pub use controller::{
    AssistantStatus, CaptureController, CaptureState, IDLE_STATUS, LISTENING_STATUS,
    StartOutcome, THINKING_STATUS,
};
pub use pipeline::{Pipeline, TurnOutcome};

use crate::voice::SpeechRecognizer;
use crate::{Error, Result};

/// Capacity of the request queue
const COMMAND_BUFFER: usize = 16;

/// Requests from the dashboard and API
#[derive(Debug)]
enum AssistantCommand {
    /// Mic pressed
    Start { reply: oneshot::Sender<StartOutcome> },
    /// Typed command, no microphone
    Ask {
        text: String,
        reply: oneshot::Sender<StartOutcome>,
    },
}

/// Results reported by session tasks
#[derive(Debug)]
enum SessionEvent {
    Heard {
        session: Uuid,
        result: Result<Option<String>>,
    },
    TurnFinished {
        session: Uuid,
        outcome: Option<TurnOutcome>,
    },
}

/// Cloneable handle to the running assistant
#[derive(Debug, Clone)]
pub struct AssistantHandle {
    commands: mpsc::Sender<AssistantCommand>,
    status: watch::Receiver<AssistantStatus>,
}

impl AssistantHandle {
    /// Open a listening session
    ///
    /// # Errors
    ///
    /// Returns error if the assistant task has stopped
    pub async fn start(&self) -> Result<StartOutcome> {
        let (reply, rx) = oneshot::channel();
        self.request(AssistantCommand::Start { reply }, rx).await
    }

    /// Run a typed command through the pipeline
    ///
    /// # Errors
    ///
    /// Returns error if the assistant task has stopped
    pub async fn ask(&self, text: impl Into<String>) -> Result<StartOutcome> {
        let (reply, rx) = oneshot::channel();
        let text = text.into();
        self.request(AssistantCommand::Ask { text, reply }, rx).await
    }

    /// Latest published status
    #[must_use]
    pub fn status(&self) -> AssistantStatus {
        self.status.borrow().clone()
    }

    /// Receiver that wakes on every status change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AssistantStatus> {
        self.status.clone()
    }

    async fn request(
        &self,
        command: AssistantCommand,
        rx: oneshot::Receiver<StartOutcome>,
    ) -> Result<StartOutcome> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::AssistantUnavailable)?;
        rx.await.map_err(|_| Error::AssistantUnavailable)
    }
}

/// Owner of the capture session
pub struct Assistant {
    controller: CaptureController,
    pipeline: Arc<Pipeline>,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    commands: mpsc::Receiver<AssistantCommand>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Assistant {
    /// Create the assistant and its handle
    ///
    /// Without a recognizer, mic requests answer
    /// [`StartOutcome::VoiceUnavailable`]; typed commands still work.
    #[must_use]
    pub fn new(
        pipeline: Pipeline,
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
    ) -> (Self, AssistantHandle) {
        let (controller, status) = CaptureController::new();
        let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let assistant = Self {
            controller,
            pipeline: Arc::new(pipeline),
            recognizer,
            commands,
            events_tx,
            events_rx,
        };
        let handle = AssistantHandle {
            commands: commands_tx,
            status,
        };

        (assistant, handle)
    }

    /// Process requests until every handle is dropped
    pub async fn run(mut self) {
        tracing::info!(
            backend = self.pipeline.backend().name(),
            voice = self.recognizer.is_some(),
            "assistant running"
        );

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }
        }

        tracing::info!("assistant stopped");
    }

    fn handle_command(&mut self, command: AssistantCommand) {
        match command {
            AssistantCommand::Start { reply } => {
                let outcome = self.start_listening();
                let _ = reply.send(outcome);
            }
            AssistantCommand::Ask { text, reply } => {
                let outcome = self.submit(text);
                let _ = reply.send(outcome);
            }
        }
    }

    fn start_listening(&mut self) -> StartOutcome {
        let Some(recognizer) = self.recognizer.clone() else {
            return StartOutcome::VoiceUnavailable;
        };

        let outcome = self.controller.try_start(self.pipeline.backend().is_ready());
        match outcome {
            StartOutcome::Started => {
                if let Some(session) = self.controller.session_id() {
                    self.spawn_recognition(session, recognizer);
                }
            }
            StartOutcome::NotReady => self.refuse(),
            StartOutcome::Busy | StartOutcome::VoiceUnavailable | StartOutcome::Empty => {
                tracing::debug!(?outcome, "start request dropped");
            }
        }
        outcome
    }

    fn submit(&mut self, text: String) -> StartOutcome {
        if text.trim().is_empty() {
            return StartOutcome::Empty;
        }

        let outcome = self.controller.try_submit(self.pipeline.backend().is_ready());
        match outcome {
            StartOutcome::Started => {
                if let Some(session) = self.controller.session_id() {
                    self.spawn_turn(session, text);
                }
            }
            StartOutcome::NotReady => self.refuse(),
            StartOutcome::Busy | StartOutcome::VoiceUnavailable | StartOutcome::Empty => {
                tracing::debug!(?outcome, "typed command dropped");
            }
        }
        outcome
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Heard { session, result } => {
                if self.controller.session_id() != Some(session) {
                    return;
                }

                let transcript = match result {
                    Ok(transcript) => transcript,
                    Err(e) => {
                        tracing::warn!(error = %e, "speech recognition failed");
                        None
                    }
                };

                let proceed = self.controller.finish_listening(transcript.as_deref());
                if let (true, Some(text)) = (proceed, transcript) {
                    tracing::info!(transcript = %text, "heard");
                    self.spawn_turn(session, text);
                }
            }
            SessionEvent::TurnFinished { session, outcome } => {
                if self.controller.session_id() != Some(session) {
                    return;
                }
                if outcome.is_none() {
                    tracing::error!(%session, "turn task aborted");
                }
                self.controller.complete();
            }
        }
    }

    /// Speak the backend's refusal, if it has one
    fn refuse(&self) {
        let Some(phrase) = self.pipeline.backend().not_ready_phrase() else {
            return;
        };

        let pipeline = Arc::clone(&self.pipeline);
        tokio::spawn(async move {
            pipeline.say(phrase).await;
        });
    }

    fn spawn_recognition(&self, session: Uuid, recognizer: Arc<dyn SpeechRecognizer>) {
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let task = tokio::spawn(async move { recognizer.recognize().await }.in_current_span());
            let result = task
                .await
                .unwrap_or_else(|e| Err(Error::Voice(format!("recognition task failed: {e}"))));
            let _ = events.send(SessionEvent::Heard { session, result });
        }
        .instrument(tracing::info_span!("session", %session)));
    }

    fn spawn_turn(&self, session: Uuid, transcript: String) {
        let events = self.events_tx.clone();
        let pipeline = Arc::clone(&self.pipeline);
        tokio::spawn(async move {
            let task =
                tokio::spawn(async move { pipeline.run_turn(&transcript).await }.in_current_span());
            let outcome = task.await.ok();
            let _ = events.send(SessionEvent::TurnFinished { session, outcome });
        }
        .instrument(tracing::info_span!("session", %session)));
    }
}
