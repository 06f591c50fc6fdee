//! Configuration management for the Dinner robot backend
//!
//! Precedence, lowest to highest: built-in defaults, the TOML file,
//! environment variables, then CLI flags (applied by the binary).

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;

use crate::Result;
use crate::voice::SttProvider;
use file::DinnerConfigFile;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5000;

/// Default Gemini model
pub const DEFAULT_LLM_MODEL: &str = "gemini-2.0-flash";

/// Backend configuration
#[derive(Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub voice: VoiceConfig,
    pub timing: TimingConfig,
    pub api_keys: ApiKeys,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Path to static files directory (web UI)
    pub static_dir: Option<PathBuf>,
}

/// Language model configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// API root, `None` for the public Gemini endpoint
    pub base_url: Option<String>,
}

/// TTS provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtsProviderKind {
    #[default]
    OpenAI,
    ElevenLabs,
}

impl TtsProviderKind {
    /// Parse a provider name, `None` if unknown
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" => Some(Self::OpenAI),
            "elevenlabs" => Some(Self::ElevenLabs),
            _ => None,
        }
    }
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Run the microphone loop and voice output
    pub enabled: bool,

    pub stt_provider: SttProvider,

    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: String,

    pub tts_provider: TtsProviderKind,

    /// TTS model (e.g. "tts-1", "eleven_multilingual_v2")
    pub tts_model: String,

    /// TTS voice used when no per-language voice is set
    pub tts_voice: String,

    /// Voice for Spanish replies
    pub voice_es: Option<String>,

    /// Voice for English replies
    pub voice_en: Option<String>,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,

    /// Per-request timeout for STT and TTS calls
    pub request_timeout: Duration,

    /// How long to wait for speech to start
    pub listen_timeout: Duration,

    /// Longest single phrase
    pub phrase_limit: Duration,

    /// Ambient noise measurement at startup
    pub calibration: Duration,
}

/// Loop and worker pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Re-check interval while the busy flag is set
    pub busy_poll: Duration,
    /// Re-check interval while speaking
    pub speaking_poll: Duration,
    /// Re-check interval while thinking
    pub thinking_poll: Duration,
    /// Pause after an empty capture
    pub idle_poll: Duration,
    /// Pause after the coordinator recovers from an error
    pub error_cooldown: Duration,
    /// Speech queue dequeue timeout
    pub worker_poll: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            busy_poll: Duration::from_millis(100),
            speaking_poll: Duration::from_millis(500),
            thinking_poll: Duration::from_millis(100),
            idle_poll: Duration::from_millis(50),
            error_cooldown: Duration::from_secs(2),
            worker_poll: Duration::from_secs(1),
        }
    }
}

/// API keys for external services
#[derive(Debug, Default)]
pub struct ApiKeys {
    /// Google Gemini key (responses)
    pub gemini: Option<SecretString>,

    /// `OpenAI` key (Whisper and TTS)
    pub openai: Option<SecretString>,

    /// `Deepgram` key (optional STT)
    pub deepgram: Option<SecretString>,

    /// `ElevenLabs` key (optional TTS)
    pub elevenlabs: Option<SecretString>,
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file cannot be read or parsed
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let fc = file::load_config_file(path)?;
        Ok(Self::from_sources(fc, |key| std::env::var(key).ok()))
    }

    /// Merge a parsed config file with an environment lookup
    ///
    /// Env > toml > default.
    #[must_use]
    pub fn from_sources(fc: DinnerConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let secret = |key: &str, file: Option<String>| {
            env(key)
                .or(file)
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from)
        };

        let api_keys = ApiKeys {
            gemini: secret("GEMINI_API_KEY", fc.api_keys.gemini),
            openai: secret("OPENAI_API_KEY", fc.api_keys.openai),
            deepgram: secret("DEEPGRAM_API_KEY", fc.api_keys.deepgram),
            elevenlabs: secret("ELEVENLABS_API_KEY", fc.api_keys.elevenlabs),
        };

        let server = ServerConfig {
            port: env("DINNER_PORT")
                .or_else(|| env("PORT"))
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(DEFAULT_PORT),
            static_dir: env("DINNER_STATIC_DIR")
                .or(fc.server.static_dir)
                .map(PathBuf::from),
        };

        let llm = LlmConfig {
            model: env("DINNER_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            timeout: Duration::from_secs(
                env("DINNER_LLM_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .or(fc.llm.timeout_secs)
                    .unwrap_or(20),
            ),
            base_url: fc.llm.base_url,
        };

        let stt_provider = env("DINNER_STT_PROVIDER")
            .or(fc.voice.stt_provider)
            .and_then(|name| {
                let parsed = SttProvider::parse(&name);
                if parsed.is_none() {
                    tracing::warn!(provider = %name, "unknown STT provider, using whisper");
                }
                parsed
            })
            .unwrap_or_default();

        let tts_provider = env("DINNER_TTS_PROVIDER")
            .or(fc.voice.tts_provider)
            .and_then(|name| {
                let parsed = TtsProviderKind::parse(&name);
                if parsed.is_none() {
                    tracing::warn!(provider = %name, "unknown TTS provider, using openai");
                }
                parsed
            })
            .unwrap_or_default();

        let default_stt_model = match stt_provider {
            SttProvider::Whisper => "whisper-1",
            SttProvider::Deepgram => "nova-2",
        };
        let (default_tts_model, default_tts_voice) = match tts_provider {
            TtsProviderKind::OpenAI => ("tts-1", "alloy"),
            TtsProviderKind::ElevenLabs => ("eleven_multilingual_v2", "21m00Tcm4TlvDq8ikWAM"),
        };

        let ms = |value: Option<u64>, default: u64| Duration::from_millis(value.unwrap_or(default));

        let voice = VoiceConfig {
            enabled: fc.voice.enabled.unwrap_or(true),
            stt_provider,
            stt_model: env("DINNER_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| default_stt_model.to_string()),
            tts_provider,
            tts_model: env("DINNER_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or_else(|| default_tts_model.to_string()),
            tts_voice: env("DINNER_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or_else(|| default_tts_voice.to_string()),
            voice_es: env("DINNER_TTS_VOICE_ES").or(fc.voice.voice_es),
            voice_en: env("DINNER_TTS_VOICE_EN").or(fc.voice.voice_en),
            tts_speed: fc.voice.tts_speed.unwrap_or(1.0).clamp(0.25, 4.0),
            request_timeout: Duration::from_secs(
                env("DINNER_VOICE_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .or(fc.voice.request_timeout_secs)
                    .unwrap_or(15),
            ),
            listen_timeout: ms(fc.voice.listen_timeout_ms, 5000),
            phrase_limit: ms(fc.voice.phrase_limit_ms, 8000),
            calibration: ms(fc.voice.calibration_ms, 1000),
        };

        let defaults = TimingConfig::default();
        let or_default = |value: Option<u64>, default: Duration| {
            value.map_or(default, Duration::from_millis)
        };
        let timing = TimingConfig {
            busy_poll: or_default(fc.timing.busy_poll_ms, defaults.busy_poll),
            speaking_poll: or_default(fc.timing.speaking_poll_ms, defaults.speaking_poll),
            thinking_poll: or_default(fc.timing.thinking_poll_ms, defaults.thinking_poll),
            idle_poll: or_default(fc.timing.idle_poll_ms, defaults.idle_poll),
            error_cooldown: or_default(fc.timing.error_cooldown_ms, defaults.error_cooldown),
            worker_poll: or_default(fc.timing.worker_poll_ms, defaults.worker_poll),
        };

        Self {
            server,
            llm,
            voice,
            timing,
            api_keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_any_source() {
        let config = Config::from_sources(DinnerConfigFile::default(), env_of(&[]));

        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.llm.model, DEFAULT_LLM_MODEL);
        assert_eq!(config.llm.timeout, Duration::from_secs(20));
        assert!(config.voice.enabled);
        assert_eq!(config.voice.stt_provider, SttProvider::Whisper);
        assert_eq!(config.voice.tts_voice, "alloy");
        assert_eq!(config.voice.request_timeout, Duration::from_secs(15));
        assert_eq!(config.voice.listen_timeout, Duration::from_secs(5));
        assert_eq!(config.voice.phrase_limit, Duration::from_secs(8));
        assert_eq!(config.timing, TimingConfig::default());
        assert!(config.api_keys.gemini.is_none());
    }

    #[test]
    fn env_beats_file() {
        let fc = file::parse_config_file(
            r#"
            [server]
            port = 8080

            [llm]
            model = "from-file"

            [api_keys]
            gemini = "file-key"
            "#,
        )
        .unwrap();

        let config = Config::from_sources(
            fc,
            env_of(&[("DINNER_PORT", "9000"), ("GEMINI_API_KEY", "env-key")]),
        );

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.llm.model, "from-file");
        assert_eq!(
            config.api_keys.gemini.as_ref().map(|k| k.expose_secret().to_string()),
            Some("env-key".to_string())
        );
    }

    #[test]
    fn generic_port_is_a_fallback() {
        let config = Config::from_sources(
            DinnerConfigFile::default(),
            env_of(&[("PORT", "7000")]),
        );
        assert_eq!(config.server.port, 7000);

        let config = Config::from_sources(
            DinnerConfigFile::default(),
            env_of(&[("PORT", "7000"), ("DINNER_PORT", "7001")]),
        );
        assert_eq!(config.server.port, 7001);
    }

    #[test]
    fn blank_keys_are_absent() {
        let config = Config::from_sources(
            DinnerConfigFile::default(),
            env_of(&[("OPENAI_API_KEY", "  ")]),
        );
        assert!(config.api_keys.openai.is_none());
    }

    #[test]
    fn provider_selection_changes_model_defaults() {
        let config = Config::from_sources(
            DinnerConfigFile::default(),
            env_of(&[
                ("DINNER_STT_PROVIDER", "deepgram"),
                ("DINNER_TTS_PROVIDER", "elevenlabs"),
                ("DINNER_TTS_VOICE_ES", "es-voice"),
            ]),
        );

        assert_eq!(config.voice.stt_provider, SttProvider::Deepgram);
        assert_eq!(config.voice.stt_model, "nova-2");
        assert_eq!(config.voice.tts_provider, TtsProviderKind::ElevenLabs);
        assert_eq!(config.voice.voice_es.as_deref(), Some("es-voice"));
    }

    #[test]
    fn timing_overrides_from_file() {
        let fc = file::parse_config_file("[timing]\nerror_cooldown_ms = 5\n").unwrap();
        let config = Config::from_sources(fc, env_of(&[]));

        assert_eq!(config.timing.error_cooldown, Duration::from_millis(5));
        assert_eq!(config.timing.busy_poll, TimingConfig::default().busy_poll);
    }

    #[test]
    fn speech_service_timeout_is_configurable() {
        let fc = file::parse_config_file("[voice]\nrequest_timeout_secs = 4\n").unwrap();
        let config = Config::from_sources(fc, env_of(&[]));
        assert_eq!(config.voice.request_timeout, Duration::from_secs(4));

        let fc = file::parse_config_file("[voice]\nrequest_timeout_secs = 4\n").unwrap();
        let config = Config::from_sources(fc, env_of(&[("DINNER_VOICE_TIMEOUT_SECS", "9")]));
        assert_eq!(config.voice.request_timeout, Duration::from_secs(9));
    }
}
