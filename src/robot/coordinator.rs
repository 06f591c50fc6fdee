//! Audio coordinator
//!
//! The long-running loop that owns the microphone. Each tick checks the busy
//! flag and the state, captures one utterance when allowed, and on a wake
//! word runs the full Listening → Thinking → Speaking handoff to the speech
//! worker. Errors inside a tick force a reset to idle and a cooldown; the
//! loop itself never ends.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use super::events::RobotEvent;
use super::runtime::{RobotRuntime, SpeechJob};
use super::state::RobotState;
use crate::{Error, Result};
use crate::config::TimingConfig;
use crate::gesture::ResponseEnvelope;
use crate::responder::ResponseGenerator;
use crate::voice::{SpeechCapture, contains_wake_word};

/// What one pass of the loop did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// Busy flag set; microphone left alone
    Busy,
    /// Playback in progress
    Speaking,
    /// Response generation in progress
    Thinking,
    /// Nothing was said
    Silence,
    /// Speech without the wake word
    Ignored(String),
    /// Wake word heard and a reply queued for speaking
    Responded(ResponseEnvelope),
}

/// Drives listening, wake word detection and response generation
pub struct Coordinator {
    runtime: Arc<RobotRuntime>,
    capture: SpeechCapture,
    responder: Arc<ResponseGenerator>,
    timing: TimingConfig,
}

impl Coordinator {
    #[must_use]
    pub fn new(
        runtime: Arc<RobotRuntime>,
        capture: SpeechCapture,
        responder: Arc<ResponseGenerator>,
        timing: TimingConfig,
    ) -> Self {
        Self {
            runtime,
            capture,
            responder,
            timing,
        }
    }

    /// Run forever
    pub async fn run(&self) {
        tracing::info!("audio coordinator started");

        loop {
            match self.tick().await {
                Ok(tick) => {
                    let pause = self.pause_after(&tick);
                    if !pause.is_zero() {
                        tokio::time::sleep(pause).await;
                    }
                }
                Err(e) => {
                    self.recover();
                    tracing::error!(error = %e, "audio loop error, resetting to idle");
                    tokio::time::sleep(self.timing.error_cooldown).await;
                }
            }
        }
    }

    /// One pass of the loop without the trailing pause
    ///
    /// A panic in the capture or the responder comes back as
    /// [`Error::Panicked`] so the loop can recover from it.
    ///
    /// # Errors
    ///
    /// Returns error if the reply could not be handed to the speech worker
    pub async fn tick(&self) -> Result<Tick> {
        AssertUnwindSafe(self.step())
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(Error::from_panic(&*panic)))
    }

    async fn step(&self) -> Result<Tick> {
        if self.runtime.busy.is_set() {
            return Ok(Tick::Busy);
        }

        let state = self.runtime.state.get();
        if !state.accepts_audio() {
            return Ok(match state {
                RobotState::Thinking => Tick::Thinking,
                _ => Tick::Speaking,
            });
        }

        let text = self.capture.listen().await;

        // the microphone may have been closed while the capture ran
        if self.runtime.busy.is_set() || !self.runtime.state.get().accepts_audio() {
            tracing::debug!(text = %text, "microphone closed during capture, discarding");
            return Ok(Tick::Busy);
        }

        if text.is_empty() {
            return Ok(Tick::Silence);
        }

        if !contains_wake_word(&text) {
            tracing::debug!(text = %text, "no wake word");
            return Ok(Tick::Ignored(text));
        }

        if !self.runtime.busy.try_set("wake word") {
            tracing::debug!(text = %text, "robot went busy before responding, discarding");
            return Ok(Tick::Busy);
        }

        self.respond(&text).await.map(Tick::Responded)
    }

    /// Clear the busy flag and force idle
    pub fn recover(&self) {
        self.runtime.busy.clear("coordinator recovery");
        self.runtime.state.set(RobotState::Idle);
    }

    const fn pause_after(&self, tick: &Tick) -> Duration {
        match tick {
            Tick::Busy => self.timing.busy_poll,
            Tick::Speaking => self.timing.speaking_poll,
            Tick::Thinking => self.timing.thinking_poll,
            Tick::Silence => self.timing.idle_poll,
            Tick::Ignored(_) | Tick::Responded(_) => Duration::ZERO,
        }
    }

    async fn respond(&self, text: &str) -> Result<ResponseEnvelope> {
        tracing::info!(text = %text, "wake word detected");

        self.runtime.state.set(RobotState::Thinking);
        self.runtime.emit(RobotEvent::WakeWordDetected {
            text: text.to_string(),
        });

        let envelope = self.responder.generate(text).await;

        self.runtime.emit(RobotEvent::DetectedLanguage {
            language: envelope.language,
        });
        self.runtime.emit(RobotEvent::Response(envelope.clone()));

        self.runtime.state.set(RobotState::Speaking);
        self.runtime.enqueue_speech(SpeechJob::from(&envelope))?;

        Ok(envelope)
    }
}
