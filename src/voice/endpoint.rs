//! Utterance endpointing
//!
//! Decides when the user has started and finished speaking, using RMS
//! energy over short chunks. Only the completed utterance is sent to STT.

use super::SAMPLE_RATE;

/// Minimum audio energy threshold to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech to count as an utterance (0.3 s)
const MIN_SPEECH_SAMPLES: usize = SAMPLE_RATE as usize * 3 / 10;

/// Trailing silence that ends an utterance (0.8 s)
const END_SILENCE_SAMPLES: usize = SAMPLE_RATE as usize * 8 / 10;

/// Where the detector is within one listening window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// No speech yet
    Waiting,
    /// Speech started, accumulating
    Speaking,
    /// Speech followed by enough silence
    Complete,
}

/// Finds the boundaries of a single spoken command
pub struct UtteranceDetector {
    state: EndpointState,
    speech_buffer: Vec<f32>,
    voiced_samples: usize,
    silence_counter: usize,
}

impl Default for UtteranceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl UtteranceDetector {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: EndpointState::Waiting,
            speech_buffer: Vec::new(),
            voiced_samples: 0,
            silence_counter: 0,
        }
    }

    /// Feed a chunk of samples and return the new state
    pub fn process(&mut self, samples: &[f32]) -> EndpointState {
        let energy = calculate_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            EndpointState::Waiting => {
                if is_speech {
                    self.state = EndpointState::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.voiced_samples = samples.len();
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech started");
                }
            }
            EndpointState::Speaking => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.voiced_samples += samples.len();
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.silence_counter > END_SILENCE_SAMPLES {
                    if self.voiced_samples >= MIN_SPEECH_SAMPLES {
                        tracing::debug!(samples = self.speech_buffer.len(), "utterance complete");
                        self.state = EndpointState::Complete;
                    } else {
                        // A click or cough, keep waiting
                        tracing::trace!("speech too short, resetting");
                        self.reset();
                    }
                }
            }
            EndpointState::Complete => {}
        }

        self.state
    }

    /// Take the utterance audio, leaving the detector waiting
    pub fn take_utterance(&mut self) -> Vec<f32> {
        let samples = std::mem::take(&mut self.speech_buffer);
        self.reset();
        samples
    }

    /// Whether any speech has been heard in this window
    #[must_use]
    pub fn heard_speech(&self) -> bool {
        self.state != EndpointState::Waiting
    }

    #[must_use]
    pub const fn state(&self) -> EndpointState {
        self.state
    }

    /// Back to waiting, discarding audio
    pub fn reset(&mut self) {
        self.state = EndpointState::Waiting;
        self.speech_buffer.clear();
        self.voiced_samples = 0;
        self.silence_counter = 0;
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
