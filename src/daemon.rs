//! Daemon - the main deck service
//!
//! Starts the clock, weather poller, inference engine load, voice
//! assistant and API server, then waits for Ctrl-C.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;

use crate::api::{ApiServer, ApiState};
use crate::assistant::{Assistant, Pipeline};
use crate::clock::ClockSource;
use crate::config::{HardwareConfig, InferenceConfig, VoiceConfig};
use crate::environment::{SnapshotReader, snapshot_slot};
use crate::hardware::{FullyKioskBridge, HardwareBridge};
use crate::inference::{
    BackendKind, CloudBackend, EngineStatus, InferenceBackend, LoadProgress, LocalBackend,
};
use crate::voice::{
    LoggedSpeech, MicrophoneRecognizer, SpeechOutput, SpeechRecognizer, SpeechToText,
    SynthesizedSpeech, TextToSpeech,
};
use crate::weather::WeatherSource;
use crate::{Config, Error, Result};

/// The deck daemon
pub struct Daemon {
    config: Config,
}

impl Daemon {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the daemon until interrupted
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be built or the API server fails
    pub async fn run(self) -> Result<()> {
        let config = &self.config;
        tracing::info!(
            port = config.server.port,
            backend = %config.inference.backend,
            voice = config.voice.enabled,
            "daemon running"
        );

        let (writer, snapshot) = snapshot_slot();

        // Clock display
        let clock = ClockSource;
        let (clock_tx, clock_rx) = watch::channel(clock.tick());
        let clock_task = tokio::spawn(clock.run(clock_tx));

        // Weather: first poll immediately, then every period
        let weather = WeatherSource::new(
            config.weather.base_url.clone(),
            config.location.latitude,
            config.location.longitude,
        );
        let weather_task = tokio::spawn(weather.run(writer, config.weather.poll_interval));

        // Inference engine load runs in the background; sessions are
        // refused until it reports ready
        let backend = build_backend(&config.inference)?;
        let (engine_tx, engine_rx) = watch::channel(EngineStatus::starting(backend.name()));
        let prepare_task = tokio::spawn(prepare_backend(Arc::clone(&backend), engine_tx));

        let pipeline = build_pipeline(config, backend, snapshot.clone());
        let recognizer = build_recognizer(&config.voice);
        if recognizer.is_none() {
            tracing::info!("microphone disabled - typed commands only");
        }

        let (assistant, handle) = Assistant::new(pipeline, recognizer);
        let assistant_task = tokio::spawn(assistant.run());

        let state = ApiState {
            clock: clock_rx,
            snapshot,
            engine: engine_rx,
            assistant: handle,
        };
        let mut api_task = ApiServer::new(state, &config.server).spawn();
        tracing::info!(port = config.server.port, "API server started");

        let result = tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown requested");
                signal.map_err(Error::from)
            }
            served = &mut api_task => match served {
                Ok(result) => result,
                Err(e) => Err(Error::Config(format!("API server task failed: {e}"))),
            },
        };

        for task in [clock_task, weather_task, prepare_task, assistant_task] {
            task.abort();
        }
        api_task.abort();

        tracing::info!("daemon stopped");
        result
    }
}

/// Build the configured inference backend
///
/// # Errors
///
/// Returns error if the cloud backend is selected without an API key
pub fn build_backend(config: &InferenceConfig) -> Result<Arc<dyn InferenceBackend>> {
    match config.backend {
        BackendKind::Cloud => {
            let api_key = config.cloud.api_key.as_ref().ok_or_else(|| {
                Error::Config("GEMINI_API_KEY required for the cloud backend".to_string())
            })?;
            let backend = CloudBackend::new(
                rewrap(api_key),
                config.cloud.model.clone(),
                config.cloud.base_url.clone(),
                config.http_timeout,
            )?;
            Ok(Arc::new(backend))
        }
        BackendKind::Local => {
            let backend = LocalBackend::new(
                config.local.base_url.clone(),
                config.local.model.clone(),
                config.http_timeout,
            )?;
            Ok(Arc::new(backend))
        }
    }
}

/// Load the backend, publishing progress
pub async fn prepare_backend(
    backend: Arc<dyn InferenceBackend>,
    status: watch::Sender<EngineStatus>,
) {
    let name = backend.name();
    let report = |progress: LoadProgress| {
        status.send_replace(EngineStatus::loading(name, progress));
    };

    match backend.prepare(&report).await {
        Ok(()) => {
            tracing::info!(backend = name, "inference engine ready");
            status.send_replace(EngineStatus::ready(name));
        }
        Err(e) => {
            tracing::error!(backend = name, error = %e, "inference engine failed to load");
            status.send_replace(EngineStatus {
                backend: name,
                ready: false,
                text: format!("Engine failed: {e}"),
                fraction: None,
            });
        }
    }
}

/// Assemble the turn pipeline from config
#[must_use]
pub fn build_pipeline(
    config: &Config,
    backend: Arc<dyn InferenceBackend>,
    snapshot: SnapshotReader,
) -> Pipeline {
    let speech = build_speech(&config.voice);
    let mut pipeline = Pipeline::new(
        backend,
        speech,
        snapshot,
        config.inference.vocabulary.clone(),
    )
    .with_battery(config.inference.include_battery);

    if let Some(bridge) = config.hardware.as_ref().map(build_bridge) {
        pipeline = pipeline.with_bridge(bridge);
    }
    pipeline
}

/// Speech output: TTS and speakers when voice is on, log otherwise
#[must_use]
pub fn build_speech(config: &VoiceConfig) -> Arc<dyn SpeechOutput> {
    if !config.enabled {
        return Arc::new(LoggedSpeech);
    }

    let tts = config.api_key.as_ref().map(|key| {
        TextToSpeech::new(
            config.base_url.clone(),
            rewrap(key),
            config.tts_model.clone(),
            config.tts_voice.clone(),
            config.tts_speed,
        )
    });

    match tts {
        Some(Ok(tts)) => Arc::new(SynthesizedSpeech::new(tts)),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "TTS unavailable, replies will be logged");
            Arc::new(LoggedSpeech)
        }
        None => {
            tracing::warn!("OPENAI_API_KEY not set, replies will be logged");
            Arc::new(LoggedSpeech)
        }
    }
}

/// Microphone recognizer, if voice is enabled and STT is configured
#[must_use]
pub fn build_recognizer(config: &VoiceConfig) -> Option<Arc<dyn SpeechRecognizer>> {
    if !config.enabled {
        return None;
    }

    let key = config.api_key.as_ref()?;
    match SpeechToText::new(
        config.base_url.clone(),
        rewrap(key),
        config.stt_model.clone(),
        &config.locale,
    ) {
        Ok(stt) => Some(Arc::new(MicrophoneRecognizer::new(stt, config.max_listen))),
        Err(e) => {
            tracing::warn!(error = %e, "STT unavailable");
            None
        }
    }
}

/// Kiosk bridge from config
#[must_use]
pub fn build_bridge(config: &HardwareConfig) -> Arc<dyn HardwareBridge> {
    tracing::info!(url = %config.base_url, "kiosk bridge configured");
    Arc::new(FullyKioskBridge::new(
        config.base_url.clone(),
        config.password.as_ref().map(rewrap),
    ))
}

fn rewrap(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_string())
}
