//! Text-to-speech (TTS) processing

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::language::Language;
use crate::{Error, Result};

/// Remote speech synthesis engine
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize text spoken in the given language
    ///
    /// Returns encoded audio (MP3).
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>>;
}

/// TTS provider backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TtsProvider {
    OpenAI,
    ElevenLabs,
}

/// Voice used for each language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSelection {
    /// Fallback when no per-language voice is set
    pub default: String,
    pub spanish: Option<String>,
    pub english: Option<String>,
}

impl VoiceSelection {
    /// Voice for a language, falling back to the default
    #[must_use]
    pub fn for_language(&self, language: Language) -> &str {
        let preferred = match language {
            Language::Es => self.spanish.as_deref(),
            Language::En => self.english.as_deref(),
        };

        preferred
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(&self.default)
    }
}

/// Synthesizes speech from text
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: SecretString,
    voices: VoiceSelection,
    speed: f32,
    model: String,
    provider: TtsProvider,
}

impl TextToSpeech {
    /// Create a new TTS instance using `OpenAI`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_openai(
        api_key: SecretString,
        voices: VoiceSelection,
        speed: f32,
        model: String,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: super::http_client(timeout)?,
            api_key,
            voices,
            speed,
            model,
            provider: TtsProvider::OpenAI,
        })
    }

    /// Create a new TTS instance using ElevenLabs
    ///
    /// Voices are ElevenLabs voice IDs.
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_elevenlabs(
        api_key: SecretString,
        voices: VoiceSelection,
        model: String,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "ElevenLabs API key required for TTS".to_string(),
            ));
        }

        Ok(Self {
            client: super::http_client(timeout)?,
            api_key,
            voices,
            speed: 1.0,
            model,
            provider: TtsProvider::ElevenLabs,
        })
    }

    /// Synthesize using OpenAI TTS
    async fn synthesize_openai(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice,
            speed: self.speed,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }

    /// Synthesize using ElevenLabs TTS
    async fn synthesize_elevenlabs(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let url = format!("https://api.elevenlabs.io/v1/text-to-speech/{voice}");

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", self.api_key.expose_secret())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for TextToSpeech {
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>> {
        let voice = self.voices.for_language(language);
        tracing::debug!(chars = text.len(), %language, voice, "synthesizing speech");

        match self.provider {
            TtsProvider::OpenAI => self.synthesize_openai(text, voice).await,
            TtsProvider::ElevenLabs => self.synthesize_elevenlabs(text, voice).await,
        }
    }
}
