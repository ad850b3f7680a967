//! Configuration management for the smart deck
//!
//! Every value resolves as environment variable, then TOML file, then
//! built-in default.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::directive::{DirectiveToken, DirectiveVocabulary};
use crate::inference::{
    BackendKind, DEFAULT_CLOUD_MODEL, DEFAULT_CLOUD_URL, DEFAULT_LOCAL_MODEL, DEFAULT_LOCAL_URL,
};
use crate::voice::DEFAULT_SPEECH_URL;
use crate::weather::{DEFAULT_POLL_INTERVAL, DEFAULT_WEATHER_URL};
use crate::{Error, Result};

use self::file::DeckConfigFile;

/// Default latitude (Ahmedabad)
pub const DEFAULT_LATITUDE: f64 = 23.02;

/// Default longitude (Ahmedabad)
pub const DEFAULT_LONGITUDE: f64 = 72.57;

/// Default API server port
pub const DEFAULT_PORT: u16 = 18790;

/// Smart deck configuration
#[derive(Debug)]
pub struct Config {
    /// Where the deck is
    pub location: LocationConfig,

    /// Weather polling
    pub weather: WeatherConfig,

    /// Language model backend
    pub inference: InferenceConfig,

    /// Microphone and speaker pipeline
    pub voice: VoiceConfig,

    /// Kiosk bridge, absent when no URL is configured
    pub hardware: Option<HardwareConfig>,

    /// HTTP API server
    pub server: ServerConfig,
}

/// Coordinates for weather lookups
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
}

/// Weather polling configuration
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub base_url: String,
    pub poll_interval: Duration,
}

/// Inference configuration
#[derive(Debug)]
pub struct InferenceConfig {
    /// Which backend runs
    pub backend: BackendKind,

    /// Directive tokens advertised in the prompt
    pub vocabulary: DirectiveVocabulary,

    /// Report kiosk battery level in the prompt
    pub include_battery: bool,

    /// Outbound request timeout, none by default
    pub http_timeout: Option<Duration>,

    pub cloud: CloudConfig,
    pub local: LocalConfig,
}

/// Hosted generative-text endpoint
#[derive(Debug)]
pub struct CloudConfig {
    /// Required when the cloud backend is selected
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
}

/// Local inference engine
#[derive(Debug, Clone)]
pub struct LocalConfig {
    pub base_url: String,
    pub model: String,
}

/// Voice configuration
#[derive(Debug)]
pub struct VoiceConfig {
    /// Enable microphone and speech output
    pub enabled: bool,

    /// Recognition locale
    pub locale: String,

    /// Speech API base URL
    pub base_url: String,

    /// Speech API key
    pub api_key: Option<SecretString>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice (e.g. "alloy")
    pub tts_voice: String,

    /// TTS speed multiplier
    pub tts_speed: f32,

    /// Longest utterance recorded per session
    pub max_listen: Duration,
}

/// Fully Kiosk REST bridge
#[derive(Debug)]
pub struct HardwareConfig {
    pub base_url: String,
    pub password: Option<SecretString>,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,

    /// Front-end served at `/`
    pub static_dir: Option<PathBuf>,
}

/// Command-line overrides applied on top of env and file
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub backend: Option<BackendKind>,
    pub port: Option<u16>,
    pub disable_voice: bool,
}

impl Config {
    /// Load configuration from env and the TOML file
    ///
    /// # Errors
    ///
    /// Returns error if a value cannot be parsed
    pub fn load() -> Result<Self> {
        Self::load_with_options(&ConfigOverrides::default())
    }

    /// Load configuration with command-line overrides
    ///
    /// # Errors
    ///
    /// Returns error if a value cannot be parsed
    pub fn load_with_options(overrides: &ConfigOverrides) -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok(), overrides)
    }

    /// Resolve configuration from a parsed file and an env lookup
    ///
    /// # Errors
    ///
    /// Returns error if a value cannot be parsed
    #[allow(clippy::needless_pass_by_value, clippy::too_many_lines)]
    pub fn from_sources(
        fc: DeckConfigFile,
        env: impl Fn(&str) -> Option<String>,
        overrides: &ConfigOverrides,
    ) -> Result<Self> {
        let location = LocationConfig {
            latitude: parse_env(&env, "DECK_LATITUDE")?
                .or(fc.location.latitude)
                .unwrap_or(DEFAULT_LATITUDE),
            longitude: parse_env(&env, "DECK_LONGITUDE")?
                .or(fc.location.longitude)
                .unwrap_or(DEFAULT_LONGITUDE),
        };

        let weather = WeatherConfig {
            base_url: env("DECK_WEATHER_URL")
                .or(fc.weather.base_url)
                .unwrap_or_else(|| DEFAULT_WEATHER_URL.to_string()),
            poll_interval: match parse_env(&env, "DECK_WEATHER_INTERVAL")?
                .or(fc.weather.poll_interval_secs)
            {
                Some(0) => {
                    return Err(Error::Config(
                        "invalid DECK_WEATHER_INTERVAL: poll period must be at least 1 second"
                            .to_string(),
                    ));
                }
                Some(secs) => Duration::from_secs(secs),
                None => DEFAULT_POLL_INTERVAL,
            },
        };

        let backend = match overrides.backend {
            Some(kind) => kind,
            None => env("DECK_INFERENCE")
                .or(fc.inference.backend)
                .map(|s| s.parse::<BackendKind>().map_err(Error::Config))
                .transpose()?
                .unwrap_or_default(),
        };

        let vocabulary = match fc.inference.vocabulary {
            Some(names) => DirectiveVocabulary::new(
                names
                    .iter()
                    .map(|n| n.parse::<DirectiveToken>().map_err(Error::Config))
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => match backend {
                BackendKind::Cloud => DirectiveVocabulary::cloud(),
                BackendKind::Local => DirectiveVocabulary::local(),
            },
        };

        let inference = InferenceConfig {
            backend,
            vocabulary,
            include_battery: parse_env(&env, "DECK_INCLUDE_BATTERY")?
                .or(fc.inference.include_battery)
                .unwrap_or(backend == BackendKind::Local),
            http_timeout: parse_env(&env, "DECK_HTTP_TIMEOUT")?
                .or(fc.inference.http_timeout_secs)
                .map(Duration::from_secs),
            cloud: CloudConfig {
                api_key: env("GEMINI_API_KEY")
                    .or(fc.inference.cloud.api_key)
                    .filter(|k| !k.is_empty())
                    .map(SecretString::from),
                model: env("DECK_CLOUD_MODEL")
                    .or(fc.inference.cloud.model)
                    .unwrap_or_else(|| DEFAULT_CLOUD_MODEL.to_string()),
                base_url: env("DECK_CLOUD_URL")
                    .or(fc.inference.cloud.base_url)
                    .unwrap_or_else(|| DEFAULT_CLOUD_URL.to_string()),
            },
            local: LocalConfig {
                base_url: env("DECK_LOCAL_URL")
                    .or(fc.inference.local.base_url)
                    .unwrap_or_else(|| DEFAULT_LOCAL_URL.to_string()),
                model: env("DECK_LOCAL_MODEL")
                    .or(fc.inference.local.model)
                    .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string()),
            },
        };

        let voice_enabled = if overrides.disable_voice {
            tracing::info!("voice explicitly disabled via --disable-voice");
            false
        } else {
            fc.voice.enabled.unwrap_or(true)
        };
        let voice = VoiceConfig {
            enabled: voice_enabled,
            locale: env("DECK_LOCALE")
                .or(fc.voice.locale)
                .unwrap_or_else(|| "en-US".to_string()),
            base_url: env("DECK_SPEECH_URL")
                .or(fc.voice.base_url)
                .unwrap_or_else(|| DEFAULT_SPEECH_URL.to_string()),
            api_key: env("OPENAI_API_KEY")
                .or(fc.voice.api_key)
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            stt_model: env("DECK_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| "whisper-1".to_string()),
            tts_model: env("DECK_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or_else(|| "tts-1".to_string()),
            tts_voice: env("DECK_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or_else(|| "alloy".to_string()),
            tts_speed: fc.voice.tts_speed.unwrap_or(1.0),
            max_listen: Duration::from_secs(fc.voice.max_listen_secs.unwrap_or(8)),
        };

        let hardware = env("FULLY_URL")
            .or(fc.hardware.base_url)
            .map(|base_url| HardwareConfig {
                base_url,
                password: env("FULLY_PASSWORD")
                    .or(fc.hardware.password)
                    .map(SecretString::from),
            });

        let port = match overrides.port {
            Some(port) => port,
            None => parse_env(&env, "DECK_PORT")?
                .or(fc.server.port)
                .unwrap_or(DEFAULT_PORT),
        };
        let server = ServerConfig {
            port,
            static_dir: env("DECK_STATIC_DIR")
                .or(fc.server.static_dir)
                .map(PathBuf::from),
        };

        Ok(Self {
            location,
            weather,
            inference,
            voice,
            hardware,
            server,
        })
    }
}

/// Parse an env var, naming it in the error
fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| Error::Config(format!("invalid {key}: {e}")))
        })
        .transpose()
}
