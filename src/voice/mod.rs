//! Voice processing module
//!
//! Microphone capture, utterance endpointing, STT, TTS and playback,
//! exposed to the assistant as [`SpeechRecognizer`] and [`SpeechOutput`].

mod capture;
mod endpoint;
mod playback;
mod recognizer;
mod speech;
mod stt;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use endpoint::{EndpointState, UtteranceDetector, calculate_energy};
pub use playback::{AudioPlayback, decode_mp3};
pub use recognizer::{MicrophoneRecognizer, SpeechRecognizer};
pub use speech::{LoggedSpeech, SpeechOutput, SynthesizedSpeech};
pub use stt::{DEFAULT_SPEECH_URL, SpeechToText};
pub use tts::TextToSpeech;
