//! Robot operating state
//!
//! One process-wide value behind a single lock. Every change is announced on
//! the event bus while the lock is still held, so observers see changes in
//! the same total order as the assignments.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::events::{EventBus, RobotEvent};

/// Canonical robot state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotState {
    /// Not listening; waiting for a client or a start signal
    #[default]
    Idle,
    /// Waiting for the wake word
    Listening,
    /// Generating a response
    Thinking,
    /// Voice playback in progress
    Speaking,
}

impl RobotState {
    /// Lowercase wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Thinking => "thinking",
            Self::Speaking => "speaking",
        }
    }

    /// Whether the microphone may be polled in this state
    #[must_use]
    pub const fn accepts_audio(self) -> bool {
        matches!(self, Self::Idle | Self::Listening)
    }

    /// Whether `next` is a legal successor of `self`
    ///
    /// Staying put is always allowed, as is falling back to idle.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Listening)
                | (Self::Listening, Self::Thinking)
                | (Self::Thinking, Self::Speaking)
                | (Self::Speaking, Self::Listening)
                | (_, Self::Idle)
                | (Self::Listening, Self::Listening)
                | (Self::Thinking, Self::Thinking)
                | (Self::Speaking, Self::Speaking)
        )
    }
}

impl std::fmt::Display for RobotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lock-protected robot state with change notification
pub struct RobotStateMachine {
    state: Mutex<RobotState>,
    events: EventBus,
}

impl RobotStateMachine {
    /// Create a state machine starting in [`RobotState::Idle`]
    #[must_use]
    pub fn new(events: EventBus) -> Self {
        Self {
            state: Mutex::new(RobotState::Idle),
            events,
        }
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn get(&self) -> RobotState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the current state and announce it
    pub fn set(&self, next: RobotState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = *state;
        *state = next;
        self.events.emit(RobotEvent::StateChanged { state: next });
        drop(state);

        tracing::info!(from = %previous, to = %next, "state changed");
    }

    /// Move to `next` only if the transition is legal
    ///
    /// Returns false and leaves the state untouched otherwise.
    pub fn transition(&self, next: RobotState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = *state;

        if !previous.can_transition_to(next) {
            drop(state);
            tracing::warn!(from = %previous, to = %next, "rejected illegal state transition");
            return false;
        }

        *state = next;
        self.events.emit(RobotEvent::StateChanged { state: next });
        drop(state);

        tracing::info!(from = %previous, to = %next, "state changed");
        true
    }

    /// Atomically move `from` → `to`, returning false if the state was not `from`
    pub fn transition_from(&self, from: RobotState, to: RobotState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != from {
            return false;
        }

        *state = to;
        self.events.emit(RobotEvent::StateChanged { state: to });
        drop(state);

        tracing::info!(from = %from, to = %to, "state changed");
        true
    }
}
