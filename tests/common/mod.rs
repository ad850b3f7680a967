//! Shared test utilities: in-memory fakes for the assistant's seams

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use smart_deck::assistant::{Assistant, AssistantHandle, CaptureState, Pipeline};
use smart_deck::environment::{SnapshotWriter, snapshot_slot};
use smart_deck::hardware::{HardwareBridge, HardwareCommand};
use smart_deck::inference::{InferenceBackend, InferenceError, NOT_READY_PHRASE};
use smart_deck::prompt::Prompt;
use smart_deck::voice::{SpeechOutput, SpeechRecognizer};
use smart_deck::{DirectiveVocabulary, Error, Result};
use tokio::sync::Notify;

/// What the fake model answers
#[derive(Debug, Clone)]
pub enum FakeReply {
    Text(String),
    NoCandidates,
    Unreachable,
}

/// Scripted inference backend that records prompts
pub struct FakeBackend {
    ready: AtomicBool,
    refusal: Option<&'static str>,
    reply: Mutex<FakeReply>,
    prompts: Mutex<Vec<Prompt>>,
}

impl FakeBackend {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            ready: AtomicBool::new(true),
            refusal: None,
            reply: Mutex::new(FakeReply::Text(text.to_string())),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(reply: FakeReply) -> Arc<Self> {
        Arc::new(Self {
            ready: AtomicBool::new(true),
            refusal: None,
            reply: Mutex::new(reply),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// A local-style engine that is still loading
    pub fn loading(text: &str) -> Arc<Self> {
        Arc::new(Self {
            ready: AtomicBool::new(false),
            refusal: Some(NOT_READY_PHRASE),
            reply: Mutex::new(FakeReply::Text(text.to_string())),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn set_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn not_ready_phrase(&self) -> Option<&'static str> {
        self.refusal
    }

    async fn infer(&self, prompt: &Prompt) -> std::result::Result<String, InferenceError> {
        if !self.is_ready() {
            return Err(InferenceError::NotReady);
        }
        self.prompts.lock().unwrap().push(prompt.clone());

        let reply = self.reply.lock().unwrap().clone();
        match reply {
            FakeReply::Text(text) => Ok(text),
            FakeReply::NoCandidates => Err(InferenceError::InvalidCredentials),
            FakeReply::Unreachable => Err(InferenceError::Unreachable("connection refused".into())),
        }
    }
}

/// Records everything it is asked to say
#[derive(Default)]
pub struct FakeSpeech {
    spoken: Mutex<Vec<String>>,
    said: Notify,
}

impl FakeSpeech {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    /// Wait until something has been spoken
    pub async fn wait_for_speech(&self) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.spoken.lock().unwrap().is_empty() {
                self.said.notified().await;
            }
        })
        .await
        .expect("nothing was spoken");
    }
}

#[async_trait]
impl SpeechOutput for FakeSpeech {
    async fn speak(&self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        self.said.notify_one();
        Ok(())
    }
}

/// Kiosk bridge that records commands
#[derive(Default)]
pub struct FakeBridge {
    applied: Mutex<Vec<HardwareCommand>>,
    battery: Option<u8>,
}

impl FakeBridge {
    pub fn with_battery(level: u8) -> Self {
        Self {
            applied: Mutex::new(Vec::new()),
            battery: Some(level),
        }
    }

    pub fn applied(&self) -> Vec<HardwareCommand> {
        self.applied.lock().unwrap().clone()
    }

    fn record(&self, command: HardwareCommand) -> Result<()> {
        self.applied.lock().unwrap().push(command);
        Ok(())
    }
}

#[async_trait]
impl HardwareBridge for FakeBridge {
    async fn turn_screen_off(&self) -> Result<()> {
        self.record(HardwareCommand::ScreenOff)
    }

    async fn set_screen_brightness(&self, level: u8) -> Result<()> {
        self.record(HardwareCommand::SetBrightness(level))
    }

    async fn reload(&self) -> Result<()> {
        self.record(HardwareCommand::Reload)
    }

    async fn battery_level(&self) -> Result<u8> {
        self.battery
            .ok_or_else(|| Error::Hardware("no battery".to_string()))
    }
}

/// Recognizer that returns a scripted transcript once released
pub struct FakeRecognizer {
    transcript: Option<String>,
    fail: bool,
    gate: Option<Notify>,
    calls: AtomicUsize,
}

impl FakeRecognizer {
    pub fn hearing(text: &str) -> Arc<Self> {
        Arc::new(Self {
            transcript: Some(text.to_string()),
            fail: false,
            gate: None,
            calls: AtomicUsize::new(0),
        })
    }

    /// Holds the session in Listening until `release` is called
    pub fn gated(text: &str) -> Arc<Self> {
        Arc::new(Self {
            transcript: Some(text.to_string()),
            fail: false,
            gate: Some(Notify::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn silent() -> Arc<Self> {
        Arc::new(Self {
            transcript: None,
            fail: false,
            gate: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            transcript: None,
            fail: true,
            gate: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechRecognizer for FakeRecognizer {
    async fn recognize(&self) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail {
            return Err(Error::Stt("microphone unplugged".to_string()));
        }
        Ok(self.transcript.clone())
    }
}

/// A running assistant wired to fakes
pub struct Harness {
    pub handle: AssistantHandle,
    pub speech: Arc<FakeSpeech>,
    pub bridge: Arc<FakeBridge>,
    pub weather: SnapshotWriter,
}

/// Spawn an assistant over the given backend and recognizer
pub fn spawn_assistant(
    backend: Arc<FakeBackend>,
    recognizer: Option<Arc<FakeRecognizer>>,
    vocabulary: DirectiveVocabulary,
) -> Harness {
    spawn_assistant_with_bridge(backend, recognizer, vocabulary, FakeBridge::default(), false)
}

pub fn spawn_assistant_with_bridge(
    backend: Arc<FakeBackend>,
    recognizer: Option<Arc<FakeRecognizer>>,
    vocabulary: DirectiveVocabulary,
    bridge: FakeBridge,
    include_battery: bool,
) -> Harness {
    let (weather, snapshot) = snapshot_slot();
    let speech = Arc::new(FakeSpeech::default());
    let bridge = Arc::new(bridge);

    let pipeline = Pipeline::new(backend, speech.clone(), snapshot, vocabulary)
        .with_bridge(bridge.clone())
        .with_battery(include_battery);

    let recognizer = recognizer.map(|r| r as Arc<dyn SpeechRecognizer>);
    let (assistant, handle) = Assistant::new(pipeline, recognizer);
    tokio::spawn(assistant.run());

    Harness {
        handle,
        speech,
        bridge,
        weather,
    }
}

/// Wait until the assistant reports the given state
pub async fn wait_for_state(handle: &AssistantHandle, state: CaptureState) {
    let mut status = handle.subscribe();
    tokio::time::timeout(Duration::from_secs(2), status.wait_for(|s| s.state == state))
        .await
        .expect("timed out waiting for assistant state")
        .expect("assistant stopped");
}
