//! Capture session state machine
//!
//! ```text
//! Idle --start--> Listening --transcript--> Processing --complete--> Idle
//!                     |                                   ^
//!                     +------ nothing heard / error ------+
//! ```
//!
//! The controller is the only writer of session state and of the
//! published [`AssistantStatus`].

use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

/// Status text while idle
pub const IDLE_STATUS: &str = "Tap mic to speak";

/// Status text while the microphone is open
pub const LISTENING_STATUS: &str = "Listening...";

/// Status text while the model is working
pub const THINKING_STATUS: &str = "Thinking...";

/// Lifecycle state of the voice pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Idle,
    Listening,
    Processing,
}

/// Answer to a start or submit request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    /// A new session began
    Started,
    /// A session is already active; nothing changed
    Busy,
    /// The inference backend has not finished loading
    NotReady,
    /// No microphone pipeline configured
    VoiceUnavailable,
    /// Typed command was blank
    Empty,
}

/// What the dashboard shows about the assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssistantStatus {
    pub state: CaptureState,
    /// Drives the mic button / wave animation
    pub listening: bool,
    pub status_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
}

impl Default for AssistantStatus {
    fn default() -> Self {
        Self {
            state: CaptureState::Idle,
            listening: false,
            status_text: IDLE_STATUS.to_string(),
            session_id: None,
        }
    }
}

/// Owns the capture session state
#[derive(Debug)]
pub struct CaptureController {
    state: CaptureState,
    session: Option<Uuid>,
    status: watch::Sender<AssistantStatus>,
}

impl CaptureController {
    /// Create an idle controller and a receiver for its status
    #[must_use]
    pub fn new() -> (Self, watch::Receiver<AssistantStatus>) {
        let (status, rx) = watch::channel(AssistantStatus::default());
        (
            Self {
                state: CaptureState::Idle,
                session: None,
                status,
            },
            rx,
        )
    }

    #[must_use]
    pub const fn state(&self) -> CaptureState {
        self.state
    }

    /// Id of the active session, if any
    #[must_use]
    pub const fn session_id(&self) -> Option<Uuid> {
        self.session
    }

    /// Mic pressed: open a listening session
    pub fn try_start(&mut self, ready: bool) -> StartOutcome {
        let outcome = self.admit(ready);
        if outcome == StartOutcome::Started {
            self.transition(CaptureState::Listening, true, LISTENING_STATUS);
        }
        outcome
    }

    /// Typed command: skip listening and go straight to processing
    pub fn try_submit(&mut self, ready: bool) -> StartOutcome {
        let outcome = self.admit(ready);
        if outcome == StartOutcome::Started {
            self.transition(CaptureState::Processing, false, THINKING_STATUS);
        }
        outcome
    }

    /// Recognition ended
    ///
    /// The listening signal is cleared whatever the result. Returns true
    /// when a transcript was accepted and the session is now processing.
    pub fn finish_listening(&mut self, transcript: Option<&str>) -> bool {
        if self.state != CaptureState::Listening {
            tracing::debug!(state = ?self.state, "ignoring stale recognition result");
            return false;
        }

        match transcript.map(str::trim).filter(|t| !t.is_empty()) {
            Some(_) => {
                self.transition(CaptureState::Processing, false, THINKING_STATUS);
                true
            }
            None => {
                self.end_session();
                false
            }
        }
    }

    /// Reply dispatched (or apology spoken): back to idle
    pub fn complete(&mut self) {
        if self.state == CaptureState::Idle {
            return;
        }
        self.end_session();
    }

    fn admit(&mut self, ready: bool) -> StartOutcome {
        if self.state != CaptureState::Idle {
            return StartOutcome::Busy;
        }
        if !ready {
            return StartOutcome::NotReady;
        }

        let id = Uuid::new_v4();
        self.session = Some(id);
        tracing::debug!(session = %id, "capture session opened");
        StartOutcome::Started
    }

    fn end_session(&mut self) {
        if let Some(id) = self.session.take() {
            tracing::debug!(session = %id, "capture session closed");
        }
        self.transition(CaptureState::Idle, false, IDLE_STATUS);
    }

    fn transition(&mut self, state: CaptureState, listening: bool, text: &str) {
        self.state = state;
        let session_id = self.session;
        self.status.send_replace(AssistantStatus {
            state,
            listening,
            status_text: text.to_string(),
            session_id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_from_idle() {
        let (mut controller, status) = CaptureController::new();

        assert_eq!(controller.try_start(true), StartOutcome::Started);
        assert_eq!(controller.state(), CaptureState::Listening);
        assert!(status.borrow().listening);
        assert_eq!(status.borrow().status_text, LISTENING_STATUS);
        assert!(controller.session_id().is_some());
    }

    #[test]
    fn test_start_while_active_is_noop() {
        let (mut controller, status) = CaptureController::new();
        controller.try_start(true);
        let session = controller.session_id();

        assert_eq!(controller.try_start(true), StartOutcome::Busy);
        assert_eq!(controller.state(), CaptureState::Listening);
        assert_eq!(controller.session_id(), session);

        controller.finish_listening(Some("hello"));
        assert_eq!(controller.try_start(true), StartOutcome::Busy);
        assert_eq!(controller.try_submit(true), StartOutcome::Busy);
        assert_eq!(controller.state(), CaptureState::Processing);
        assert_eq!(status.borrow().session_id, session);
    }

    #[test]
    fn test_not_ready_leaves_idle() {
        let (mut controller, status) = CaptureController::new();

        assert_eq!(controller.try_start(false), StartOutcome::NotReady);
        assert_eq!(controller.state(), CaptureState::Idle);
        assert!(!status.borrow().listening);
        assert!(controller.session_id().is_none());
    }

    #[test]
    fn test_full_cycle_clears_listening() {
        let (mut controller, status) = CaptureController::new();
        controller.try_start(true);

        assert!(controller.finish_listening(Some("what time is it")));
        assert!(!status.borrow().listening);
        assert_eq!(status.borrow().state, CaptureState::Processing);
        assert_eq!(status.borrow().status_text, THINKING_STATUS);

        controller.complete();
        assert_eq!(controller.state(), CaptureState::Idle);
        assert_eq!(*status.borrow(), AssistantStatus::default());
    }

    #[test]
    fn test_recognition_failure_returns_to_idle() {
        let (mut controller, status) = CaptureController::new();
        controller.try_start(true);

        assert!(!controller.finish_listening(None));
        assert_eq!(controller.state(), CaptureState::Idle);
        assert!(!status.borrow().listening);

        controller.try_start(true);
        assert!(!controller.finish_listening(Some("   ")));
        assert_eq!(controller.state(), CaptureState::Idle);
    }

    #[test]
    fn test_submit_skips_listening() {
        let (mut controller, status) = CaptureController::new();

        assert_eq!(controller.try_submit(true), StartOutcome::Started);
        assert_eq!(controller.state(), CaptureState::Processing);
        assert!(!status.borrow().listening);

        // A late recognition event must not disturb the typed session
        assert!(!controller.finish_listening(Some("stray")));
        assert_eq!(controller.state(), CaptureState::Processing);
    }
}
