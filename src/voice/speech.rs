//! Speech output: synthesize and play replies

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{AudioPlayback, TextToSpeech};
use crate::{Error, Result};

/// Speaks text aloud
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Speak `text`, returning once playback has finished
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&self, text: &str) -> Result<()>;
}

/// TTS service plus local speakers
///
/// Utterances are queued: a second `speak` waits for the first to finish.
pub struct SynthesizedSpeech {
    tts: TextToSpeech,
    queue: Mutex<()>,
}

impl SynthesizedSpeech {
    #[must_use]
    pub fn new(tts: TextToSpeech) -> Self {
        Self {
            tts,
            queue: Mutex::new(()),
        }
    }
}

#[async_trait]
impl SpeechOutput for SynthesizedSpeech {
    async fn speak(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let _turn = self.queue.lock().await;
        tracing::debug!(text, "speaking");

        let audio = self.tts.synthesize(text).await?;
        tokio::task::spawn_blocking(move || AudioPlayback::new()?.play_mp3(&audio))
            .await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }
}

/// Speech output for decks without speakers: replies go to the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggedSpeech;

#[async_trait]
impl SpeechOutput for LoggedSpeech {
    async fn speak(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if !text.is_empty() {
            tracing::info!(text, "reply (voice disabled)");
        }
        Ok(())
    }
}
