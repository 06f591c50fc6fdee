//! TOML configuration file loading
//!
//! Supports `~/.config/dinner-robot/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct DinnerConfigFile {
    #[serde(default)]
    pub server: ServerFileConfig,

    #[serde(default)]
    pub llm: LlmFileConfig,

    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Loop and worker pacing
    #[serde(default)]
    pub timing: TimingFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// HTTP server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub port: Option<u16>,

    /// Directory holding the web front end
    pub static_dir: Option<String>,
}

/// Language model configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Model identifier (e.g. "gemini-2.0-flash")
    pub model: Option<String>,

    pub timeout_secs: Option<u64>,

    /// Override for the Gemini API root
    pub base_url: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable the microphone loop and voice output
    pub enabled: Option<bool>,

    /// "whisper" or "deepgram"
    pub stt_provider: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// "openai" or "elevenlabs"
    pub tts_provider: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// Default TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    pub voice_es: Option<String>,
    pub voice_en: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,

    /// Per-request timeout for STT and TTS calls
    pub request_timeout_secs: Option<u64>,

    pub listen_timeout_ms: Option<u64>,
    pub phrase_limit_ms: Option<u64>,
    pub calibration_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimingFileConfig {
    pub busy_poll_ms: Option<u64>,
    pub speaking_poll_ms: Option<u64>,
    pub thinking_poll_ms: Option<u64>,
    pub idle_poll_ms: Option<u64>,
    pub error_cooldown_ms: Option<u64>,
    pub worker_poll_ms: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub gemini: Option<String>,
    pub openai: Option<String>,
    pub deepgram: Option<String>,
    pub elevenlabs: Option<String>,
}

/// Parse a config file from TOML text
///
/// # Errors
///
/// Returns error if the text is not valid TOML for this schema
pub fn parse_config_file(content: &str) -> Result<DinnerConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Load the TOML config file
///
/// An explicit path must exist and parse. Otherwise `DINNER_CONFIG` and then
/// the standard path are tried, and a missing or broken file falls back to
/// defaults with a warning.
///
/// # Errors
///
/// Returns error if an explicit path cannot be read or parsed
pub fn load_config_file(explicit: Option<&Path>) -> Result<DinnerConfigFile> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)?;
        let config = parse_config_file(&content)?;
        tracing::info!(path = %path.display(), "loaded config file");
        return Ok(config);
    }

    let Some(path) = std::env::var("DINNER_CONFIG")
        .ok()
        .map(PathBuf::from)
        .or_else(config_file_path)
    else {
        return Ok(DinnerConfigFile::default());
    };

    if !path.exists() {
        return Ok(DinnerConfigFile::default());
    }

    let config = match std::fs::read_to_string(&path) {
        Ok(content) => match parse_config_file(&content) {
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
                DinnerConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            DinnerConfigFile::default()
        }
    };

    Ok(config)
}

/// Return the config file path: `~/.config/dinner-robot/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("dinner-robot").join("config.toml"))
}
