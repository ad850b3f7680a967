//! Microphone capture

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, SupportedStreamConfigRange};

use crate::{Error, Result};

/// Capture rate; the STT upload and the endpoint detector both assume it
pub const SAMPLE_RATE: u32 = 16000;

/// A live recording from the default input device
///
/// Recording starts on [`AudioCapture::open`] and stops when the value is
/// dropped. Multi-channel devices are mixed down to mono in the callback.
/// Holds a cpal stream, so it must stay on the thread that opened it.
pub struct AudioCapture {
    pending: Arc<Mutex<Vec<f32>>>,
    _stream: Stream,
}

impl AudioCapture {
    /// Open the default microphone and start recording
    ///
    /// # Errors
    ///
    /// Returns error if there is no input device or it cannot run at 16kHz
    pub fn open() -> Result<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let range = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .filter(supports_speech_rate)
            .min_by_key(SupportedStreamConfigRange::channels)
            .ok_or_else(|| Error::Audio("microphone cannot record at 16kHz".to_string()))?;

        let config = range.with_sample_rate(SampleRate(SAMPLE_RATE)).config();
        let channels = usize::from(config.channels);

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            channels,
            "microphone opened"
        );

        let pending = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&pending);
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = sink.lock() {
                        downmix_into(data, channels, &mut buf);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "microphone stream error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        Ok(Self {
            pending,
            _stream: stream,
        })
    }

    /// Mono samples recorded since the previous call
    #[must_use]
    pub fn drain(&self) -> Vec<f32> {
        self.pending
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }
}

fn supports_speech_rate(range: &SupportedStreamConfigRange) -> bool {
    range.sample_format() == cpal::SampleFormat::F32
        && range.min_sample_rate() <= SampleRate(SAMPLE_RATE)
        && range.max_sample_rate() >= SampleRate(SAMPLE_RATE)
}

/// Average interleaved frames into mono samples
#[allow(clippy::cast_precision_loss)]
fn downmix_into(data: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(data);
        return;
    }

    let scale = 1.0 / channels as f32;
    out.extend(
        data.chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}

/// Encode mono samples as 16-bit PCM WAV for the transcription upload
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    let mut writer =
        hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

    for &sample in samples {
        #[allow(clippy::cast_possible_truncation)]
        let pcm = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        writer
            .write_sample(pcm)
            .map_err(|e| Error::Audio(e.to_string()))?;
    }
    writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;

    Ok(cursor.into_inner())
}
