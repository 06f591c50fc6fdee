//! Shared test utilities
//!
//! Scripted stand-ins for the microphone, speech services and language
//! model, so the pipeline runs without audio hardware or network.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dinner_robot::config::TimingConfig;
use dinner_robot::llm::LanguageModel;
use dinner_robot::voice::{AudioSink, AudioSource, SpeechSynthesizer, Transcriber};
use dinner_robot::{Error, Language, ResponseGenerator, Result, RobotRuntime};

/// Fast pacing for loop tests
#[must_use]
pub fn test_timing() -> TimingConfig {
    TimingConfig {
        busy_poll: Duration::from_millis(5),
        speaking_poll: Duration::from_millis(5),
        thinking_poll: Duration::from_millis(5),
        idle_poll: Duration::from_millis(5),
        error_cooldown: Duration::from_millis(5),
        worker_poll: Duration::from_millis(20),
    }
}

/// One second of a 440Hz tone at 16kHz
#[must_use]
pub fn tone() -> Vec<f32> {
    #[allow(clippy::cast_precision_loss)]
    (0..16000)
        .map(|i| 0.3 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0).sin())
        .collect()
}

/// Language model that answers from a script, then fails
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    #[must_use]
    pub fn replying(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| Ok((*r).to_string())).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn failing() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Llm("model unavailable".to_string())))
    }
}

/// Language model that panics on every call
pub struct PanickingModel;

#[async_trait]
impl LanguageModel for PanickingModel {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        panic!("model client bug");
    }
}

/// Response generator over a scripted model
#[must_use]
pub fn responder(model: &Arc<ScriptedModel>) -> Arc<ResponseGenerator> {
    Arc::new(ResponseGenerator::new(Arc::clone(model) as Arc<dyn LanguageModel>))
}

/// Audio source that plays back scripted recordings, then silence
#[derive(Default)]
pub struct ScriptedSource {
    recordings: Mutex<VecDeque<Result<Option<Vec<f32>>>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    /// One utterance, then silence forever
    #[must_use]
    pub fn one_utterance() -> Arc<Self> {
        Self::scripted(vec![Ok(Some(tone()))])
    }

    #[must_use]
    pub fn scripted(recordings: Vec<Result<Option<Vec<f32>>>>) -> Arc<Self> {
        Arc::new(Self {
            recordings: Mutex::new(recordings.into()),
            calls: AtomicUsize::new(0),
        })
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AudioSource for ScriptedSource {
    fn record(&self, _wait: Duration, _phrase_limit: Duration) -> Result<Option<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.recordings.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }
}

/// Audio source where a front end asks for an idle phrase mid-capture
pub struct InterruptedSource {
    runtime: Arc<RobotRuntime>,
    calls: AtomicUsize,
}

impl InterruptedSource {
    #[must_use]
    pub fn new(runtime: &Arc<RobotRuntime>) -> Arc<Self> {
        Arc::new(Self {
            runtime: Arc::clone(runtime),
            calls: AtomicUsize::new(0),
        })
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AudioSource for InterruptedSource {
    fn record(&self, _wait: Duration, _phrase_limit: Duration) -> Result<Option<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(self.runtime.idle_speak(Language::Es), "idle phrase refused");
        Ok(Some(tone()))
    }
}

/// Transcriber with a fixed answer per language; `None` means the call fails
pub struct FixedTranscriber {
    pub english: Option<String>,
    pub spanish: Option<String>,
}

impl FixedTranscriber {
    #[must_use]
    pub fn new(english: Option<&str>, spanish: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            english: english.map(ToString::to_string),
            spanish: spanish.map(ToString::to_string),
        })
    }
}

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(&self, wav: &[u8], language: Language) -> Result<String> {
        assert!(!wav.is_empty(), "transcriber got no audio");

        let text = match language {
            Language::En => self.english.clone(),
            Language::Es => self.spanish.clone(),
        };
        text.ok_or_else(|| Error::Stt(format!("no {language} transcript")))
    }
}

/// Synthesizer that records what it was asked to say
#[derive(Default)]
pub struct RecordingSynthesizer {
    pub spoken: Mutex<Vec<(String, Language)>>,
    fail: bool,
    panic_on: Option<String>,
}

impl RecordingSynthesizer {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    /// Panics when asked to say `text`
    #[must_use]
    pub fn panicking_on(text: &str) -> Arc<Self> {
        Arc::new(Self {
            panic_on: Some(text.to_string()),
            ..Self::default()
        })
    }

    #[must_use]
    pub fn spoken(&self) -> Vec<(String, Language)> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for RecordingSynthesizer {
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>> {
        if self.fail {
            return Err(Error::Tts("synthesis offline".to_string()));
        }
        if self.panic_on.as_deref() == Some(text) {
            panic!("synthesizer crashed on {text:?}");
        }
        self.spoken.lock().unwrap().push((text.to_string(), language));
        Ok(text.as_bytes().to_vec())
    }
}

/// Sink that records clips and tracks overlapping playback
#[derive(Default)]
pub struct RecordingSink {
    pub played: Mutex<Vec<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    delay: Duration,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Each clip takes `delay` to play
    #[must_use]
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    #[must_use]
    pub fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }

    /// Most clips ever playing at once
    #[must_use]
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl AudioSink for RecordingSink {
    fn play(&self, audio: &[u8]) -> Result<()> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        std::thread::sleep(self.delay);
        self.played
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(audio).into_owned());

        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
