//! Shared robot runtime
//!
//! The coordinator, the speech worker and the event gateway talk to each
//! other only through this aggregate: the locked state, the busy flag and
//! the speech queue. Built once at startup and passed around as an `Arc`.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::busy::BusyFlag;
use super::events::{EventBus, RobotEvent};
use super::state::{RobotState, RobotStateMachine};
use crate::gesture::{self, ResponseEnvelope};
use crate::language::Language;
use crate::{Error, Result};

/// Text waiting to be spoken
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechJob {
    pub text: String,
    pub language: Language,
}

impl From<&ResponseEnvelope> for SpeechJob {
    fn from(envelope: &ResponseEnvelope) -> Self {
        Self {
            text: envelope.message.clone(),
            language: envelope.language,
        }
    }
}

/// Receiving end of the speech queue, owned by the speech worker
pub struct SpeechQueue {
    rx: mpsc::UnboundedReceiver<SpeechJob>,
}

impl SpeechQueue {
    /// Next job in FIFO order, `None` once the runtime is gone
    pub async fn recv(&mut self) -> Option<SpeechJob> {
        self.rx.recv().await
    }
}

/// Process-wide robot state shared by every component
pub struct RobotRuntime {
    pub state: RobotStateMachine,
    pub busy: BusyFlag,
    events: EventBus,
    speech_tx: mpsc::UnboundedSender<SpeechJob>,
}

impl RobotRuntime {
    /// Create the runtime and the queue its speech worker will drain
    #[must_use]
    pub fn new() -> (Arc<Self>, SpeechQueue) {
        let events = EventBus::new();
        let (speech_tx, rx) = mpsc::unbounded_channel();

        let runtime = Arc::new(Self {
            state: RobotStateMachine::new(events.clone()),
            busy: BusyFlag::new(),
            events,
            speech_tx,
        });

        (runtime, SpeechQueue { rx })
    }

    /// Event bus for front-end notifications
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Broadcast an event to every connected client
    pub fn emit(&self, event: RobotEvent) {
        self.events.emit(event);
    }

    /// Queue text for voice playback
    ///
    /// # Errors
    ///
    /// Returns error if the speech worker has shut down
    pub fn enqueue_speech(&self, job: SpeechJob) -> Result<()> {
        tracing::debug!(text = %job.text, language = %job.language, "speech job queued");
        self.speech_tx
            .send(job)
            .map_err(|_| Error::Worker("speech queue closed".to_string()))
    }

    /// A front end connected
    pub fn client_connected(&self) {
        if self.state.transition_from(RobotState::Idle, RobotState::Listening) {
            self.busy.clear("client connected");
        }
    }

    /// Client asked the robot to start listening
    pub fn start_listening(&self) {
        if self.state.transition_from(RobotState::Idle, RobotState::Listening) {
            self.busy.clear("start listening");
        } else {
            tracing::debug!(state = %self.state.get(), "start listening ignored");
        }
    }

    /// Client asked the robot to stop listening
    pub fn stop_listening(&self) {
        self.busy.set("stop listening");
        self.state.set(RobotState::Idle);
    }

    /// Client asked the robot to fill silence with an idle phrase
    ///
    /// Only honored while listening with the microphone open. Returns
    /// whether a phrase was broadcast and queued.
    pub fn idle_speak(&self, language: Language) -> bool {
        if self.state.get() != RobotState::Listening {
            tracing::debug!(state = %self.state.get(), "idle phrase ignored, not listening");
            return false;
        }

        if !self.busy.try_set("idle phrase") {
            tracing::debug!("idle phrase ignored, robot busy");
            return false;
        }

        let envelope = gesture::random_idle_phrase().envelope(language);
        tracing::info!(message = %envelope.message, gesture = %envelope.gesture, "idle phrase");

        let job = SpeechJob::from(&envelope);
        self.emit(RobotEvent::Response(envelope));

        if let Err(e) = self.enqueue_speech(job) {
            tracing::error!(error = %e, "failed to queue idle phrase");
            self.busy.clear("idle phrase failed");
            return false;
        }

        true
    }
}
