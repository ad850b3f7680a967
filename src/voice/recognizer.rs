//! Speech recognition: record one utterance, then transcribe it

use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{AudioCapture, EndpointState, SAMPLE_RATE, SpeechToText, UtteranceDetector, samples_to_wav};
use crate::{Error, Result};

/// How often the capture buffer is drained
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Produces the transcript of one spoken command
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Listen for a single utterance
    ///
    /// `Ok(None)` means nothing intelligible was heard.
    ///
    /// # Errors
    ///
    /// Returns error if the microphone or the STT service fails
    async fn recognize(&self) -> Result<Option<String>>;
}

/// Records from the default microphone and transcribes via STT
pub struct MicrophoneRecognizer {
    stt: SpeechToText,
    max_listen: Duration,
}

impl MicrophoneRecognizer {
    #[must_use]
    pub const fn new(stt: SpeechToText, max_listen: Duration) -> Self {
        Self { stt, max_listen }
    }
}

#[async_trait]
impl SpeechRecognizer for MicrophoneRecognizer {
    async fn recognize(&self) -> Result<Option<String>> {
        let max_listen = self.max_listen;

        // cpal streams are tied to their thread, so record on the blocking pool
        let samples = tokio::task::spawn_blocking(move || record_utterance(max_listen))
            .await
            .map_err(|e| Error::Voice(format!("recording task failed: {e}")))??;

        let Some(samples) = samples else {
            tracing::debug!("no speech heard");
            return Ok(None);
        };

        let wav = samples_to_wav(&samples, SAMPLE_RATE)?;
        let transcript = self.stt.transcribe(&wav).await?;
        let transcript = transcript.trim();

        Ok((!transcript.is_empty()).then(|| transcript.to_string()))
    }
}

/// Block until one utterance is captured or `max_listen` elapses
fn record_utterance(max_listen: Duration) -> Result<Option<Vec<f32>>> {
    let capture = AudioCapture::open()?;
    let mut detector = UtteranceDetector::new();

    let started = Instant::now();
    loop {
        std::thread::sleep(POLL_INTERVAL);

        let samples = capture.drain();
        if !samples.is_empty() && detector.process(&samples) == EndpointState::Complete {
            return Ok(Some(detector.take_utterance()));
        }

        if started.elapsed() >= max_listen {
            tracing::debug!(heard = detector.heard_speech(), "listen window elapsed");
            return Ok(detector.heard_speech().then(|| detector.take_utterance()));
        }
    }
}
