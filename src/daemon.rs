//! Daemon - the main robot service
//!
//! Wires the runtime, the speech worker, the API server and, when voice is
//! available, the audio coordinator, then runs until Ctrl-C.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::mpsc;

use crate::api::ApiServerBuilder;
use crate::config::{Config, TtsProviderKind};
use crate::llm::{DEFAULT_GEMINI_URL, GeminiClient};
use crate::responder::ResponseGenerator;
use crate::robot::{Coordinator, RobotRuntime, SpeechWorker};
use crate::voice::{
    AudioSource, Microphone, Speaker, SpeechCapture, SpeechSynthesizer, SpeechToText, SttProvider,
    TextToSpeech, Transcriber, VoiceSelection,
};
use crate::{Error, Result};

/// Microphone, transcription and synthesis, ready to use
pub struct VoicePipeline {
    pub source: Arc<dyn AudioSource>,
    pub transcriber: Arc<dyn Transcriber>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

/// The robot daemon
pub struct Daemon {
    config: Config,
    responder: Arc<ResponseGenerator>,
}

impl Daemon {
    /// Create a new daemon instance
    ///
    /// # Errors
    ///
    /// Returns error if the language model cannot be configured
    pub fn new(config: Config) -> Result<Self> {
        let api_key = require_key(config.api_keys.gemini.as_ref(), "the language model")?;

        let model = GeminiClient::new(
            api_key,
            config.llm.model.clone(),
            config
                .llm
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_GEMINI_URL.to_string()),
            config.llm.timeout,
        )?;
        tracing::info!(model = model.model(), "language model configured");

        Ok(Self {
            config,
            responder: Arc::new(ResponseGenerator::new(Arc::new(model))),
        })
    }

    /// Response generator shared with the API and the coordinator
    #[must_use]
    pub fn responder(&self) -> Arc<ResponseGenerator> {
        Arc::clone(&self.responder)
    }

    /// Run the daemon until interrupted
    ///
    /// # Errors
    ///
    /// Returns error if the API server fails
    pub async fn run(self) -> Result<()> {
        let (runtime, queue) = RobotRuntime::new();

        let voice = if self.config.voice.enabled {
            match build_voice_pipeline(&self.config).await {
                Ok(voice) => Some(voice),
                Err(e) => {
                    tracing::warn!(error = %e, "voice unavailable, running text-only");
                    None
                }
            }
        } else {
            tracing::info!("voice disabled");
            None
        };

        let worker = match &voice {
            Some(voice) => SpeechWorker::new(
                Arc::clone(&runtime),
                Arc::clone(&voice.synthesizer),
                Arc::new(Speaker),
                self.config.timing.worker_poll,
            ),
            None => SpeechWorker::muted(Arc::clone(&runtime), self.config.timing.worker_poll),
        };
        tokio::spawn(worker.run(queue));

        let mut server = ApiServerBuilder::new(
            Arc::clone(&runtime),
            Arc::clone(&self.responder),
            self.config.server.port,
        )
        .static_dir(self.config.server.static_dir.clone())
        .voice_enabled(voice.is_some())
        .build()
        .spawn();

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(()).await;
            }
        });

        let coordinator = voice.map(|voice| {
            let capture = SpeechCapture::new(
                voice.source,
                voice.transcriber,
                self.config.voice.listen_timeout,
                self.config.voice.phrase_limit,
            );
            Coordinator::new(
                Arc::clone(&runtime),
                capture,
                Arc::clone(&self.responder),
                self.config.timing,
            )
        });

        tracing::info!(port = self.config.server.port, "Dinner is ready, say \"Dinner\"");

        let coordinator_loop = async {
            match &coordinator {
                Some(coordinator) => coordinator.run().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::info!("shutdown requested");
                server.abort();
            }
            result = &mut server => {
                return match result {
                    Ok(result) => result,
                    Err(e) => Err(Error::Worker(format!("API server task failed: {e}"))),
                };
            }
            () = coordinator_loop => {}
        }

        Ok(())
    }
}

/// Open the microphone and connect speech services
///
/// # Errors
///
/// Returns error if a device is missing or a provider key is not configured
pub async fn build_voice_pipeline(config: &Config) -> Result<VoicePipeline> {
    let transcriber = build_transcriber(config)?;
    let synthesizer = build_synthesizer(config)?;

    let calibration = config.voice.calibration;
    let microphone = tokio::task::spawn_blocking(move || -> Result<Microphone> {
        let mut microphone = Microphone::new()?;
        microphone.calibrate(calibration)?;
        Ok(microphone)
    })
    .await
    .map_err(|e| Error::Audio(format!("microphone setup task failed: {e}")))??;

    Ok(VoicePipeline {
        source: Arc::new(microphone),
        transcriber: Arc::new(transcriber),
        synthesizer: Arc::new(synthesizer),
    })
}

/// Speech-to-text client for the configured provider
///
/// # Errors
///
/// Returns error if the provider key is not configured
pub fn build_transcriber(config: &Config) -> Result<SpeechToText> {
    let voice = &config.voice;
    let key = match voice.stt_provider {
        SttProvider::Whisper => config.api_keys.openai.as_ref(),
        SttProvider::Deepgram => config.api_keys.deepgram.as_ref(),
    };

    SpeechToText::new(
        voice.stt_provider,
        require_key(key, "STT")?,
        voice.stt_model.clone(),
        voice.request_timeout,
    )
}

/// Text-to-speech client for the configured provider
///
/// # Errors
///
/// Returns error if the provider key is not configured
pub fn build_synthesizer(config: &Config) -> Result<TextToSpeech> {
    let voice = &config.voice;
    let voices = VoiceSelection {
        default: voice.tts_voice.clone(),
        spanish: voice.voice_es.clone(),
        english: voice.voice_en.clone(),
    };

    match voice.tts_provider {
        TtsProviderKind::OpenAI => TextToSpeech::new_openai(
            require_key(config.api_keys.openai.as_ref(), "TTS")?,
            voices,
            voice.tts_speed,
            voice.tts_model.clone(),
            voice.request_timeout,
        ),
        TtsProviderKind::ElevenLabs => TextToSpeech::new_elevenlabs(
            require_key(config.api_keys.elevenlabs.as_ref(), "TTS")?,
            voices,
            voice.tts_model.clone(),
            voice.request_timeout,
        ),
    }
}

fn require_key(key: Option<&SecretString>, purpose: &str) -> Result<SecretString> {
    key.map(|k| SecretString::from(k.expose_secret().to_owned()))
        .ok_or_else(|| Error::Config(format!("no API key configured for {purpose}")))
}
