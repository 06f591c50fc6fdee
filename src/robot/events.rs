//! Robot events pushed to connected front ends

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::state::RobotState;
use crate::gesture::ResponseEnvelope;
use crate::language::Language;

/// Channel capacity for robot events
const CHANNEL_CAPACITY: usize = 64;

/// Server → client event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RobotEvent {
    /// Connection established
    Connected { connection_id: String },
    /// Robot state changed
    StateChanged { state: RobotState },
    /// Wake word heard in an utterance
    WakeWordDetected { text: String },
    /// Language detected for the last utterance
    DetectedLanguage { language: Language },
    /// Phrase and gesture to render
    Response(ResponseEnvelope),
    /// Voice playback finished
    SpeakingDone,
    /// Pong response
    Pong,
    /// Error occurred handling a client message
    Error { message: String },
}

/// Fan-out of robot events to every subscriber
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RobotEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to all future events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RobotEvent> {
        self.tx.subscribe()
    }

    /// Broadcast an event; having no subscribers is not an error
    pub fn emit(&self, event: RobotEvent) {
        tracing::trace!(?event, "emit");
        let _ = self.tx.send(event);
    }

    /// Number of connected subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
