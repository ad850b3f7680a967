//! TOML configuration file loading
//!
//! Supports `~/.config/smart-deck/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct DeckConfigFile {
    /// Where the deck is (weather lookups)
    #[serde(default)]
    pub location: LocationFileConfig,

    /// Weather polling
    #[serde(default)]
    pub weather: WeatherFileConfig,

    /// Language model backend
    #[serde(default)]
    pub inference: InferenceFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Kiosk hardware bridge
    #[serde(default)]
    pub hardware: HardwareFileConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,
}

/// Location configuration
#[derive(Debug, Default, Deserialize)]
pub struct LocationFileConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Weather polling configuration
#[derive(Debug, Default, Deserialize)]
pub struct WeatherFileConfig {
    /// Forecast API base URL
    pub base_url: Option<String>,

    /// Poll period in seconds
    pub poll_interval_secs: Option<u64>,
}

/// Inference backend configuration
#[derive(Debug, Default, Deserialize)]
pub struct InferenceFileConfig {
    /// "cloud" or "local"
    pub backend: Option<String>,

    /// Directive tokens the model may emit (e.g. `["SCREEN_OFF", "RELOAD"]`)
    pub vocabulary: Option<Vec<String>>,

    /// Include the kiosk battery level in the prompt
    pub include_battery: Option<bool>,

    /// Timeout for outbound inference calls, unset means none
    pub http_timeout_secs: Option<u64>,

    #[serde(default)]
    pub cloud: CloudFileConfig,

    #[serde(default)]
    pub local: LocalFileConfig,
}

/// Cloud generative-text endpoint
#[derive(Debug, Default, Deserialize)]
pub struct CloudFileConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

/// Local inference engine
#[derive(Debug, Default, Deserialize)]
pub struct LocalFileConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable voice input/output
    pub enabled: Option<bool>,

    /// Recognition locale (e.g. "en-US")
    pub locale: Option<String>,

    /// Speech API base URL (OpenAI-compatible)
    pub base_url: Option<String>,

    /// Speech API key
    pub api_key: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,

    /// Longest utterance to record, in seconds
    pub max_listen_secs: Option<u64>,
}

/// Fully Kiosk REST bridge
#[derive(Debug, Default, Deserialize)]
pub struct HardwareFileConfig {
    /// e.g. `http://192.168.1.20:2323`
    pub base_url: Option<String>,
    pub password: Option<String>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Front-end directory served at `/`
    pub static_dir: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `DeckConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> DeckConfigFile {
    let Some(path) = config_file_path() else {
        return DeckConfigFile::default();
    };

    load_config_file_from(&path)
}

/// Load a TOML config file from an explicit path
///
/// Missing or malformed files fall back to defaults with a warning.
pub fn load_config_file_from(path: &Path) -> DeckConfigFile {
    if !path.exists() {
        return DeckConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                DeckConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            DeckConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/smart-deck/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("smart-deck").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let fc = load_config_file_from(Path::new("/nonexistent/smart-deck.toml"));
        assert!(fc.location.latitude.is_none());
        assert!(fc.inference.backend.is_none());
    }

    #[test]
    fn partial_file_is_an_overlay() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[location]
latitude = 51.5

[inference]
backend = "local"
vocabulary = ["SCREEN_OFF", "RELOAD"]

[inference.local]
model = "qwen2.5:0.5b"
"#
        )
        .unwrap();

        let fc = load_config_file_from(file.path());
        assert_eq!(fc.location.latitude, Some(51.5));
        assert!(fc.location.longitude.is_none());
        assert_eq!(fc.inference.backend.as_deref(), Some("local"));
        assert_eq!(fc.inference.local.model.as_deref(), Some("qwen2.5:0.5b"));
        assert_eq!(
            fc.inference.vocabulary,
            Some(vec!["SCREEN_OFF".to_string(), "RELOAD".to_string()])
        );
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[location\nlatitude = ").unwrap();

        let fc = load_config_file_from(file.path());
        assert!(fc.location.latitude.is_none());
    }
}
