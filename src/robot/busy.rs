//! Busy flag shared by the coordinator and the speech worker
//!
//! Set while the robot must not listen: from wake word detection until
//! playback completes, or while a client has muted it. The microphone is
//! never polled while it is set, which keeps the robot from hearing itself.

use std::sync::atomic::{AtomicBool, Ordering};

/// Microphone gate
#[derive(Debug, Default)]
pub struct BusyFlag(AtomicBool);

impl BusyFlag {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Raise the flag
    pub fn set(&self, reason: &'static str) {
        let was = self.0.swap(true, Ordering::SeqCst);
        tracing::debug!(reason, was_set = was, "busy flag set");
    }

    /// Lower the flag
    pub fn clear(&self, reason: &'static str) {
        let was = self.0.swap(false, Ordering::SeqCst);
        tracing::debug!(reason, was_set = was, "busy flag cleared");
    }

    /// Raise the flag only if it is currently clear
    ///
    /// Returns true if this call raised it.
    pub fn try_set(&self, reason: &'static str) -> bool {
        let raised = self
            .0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if raised {
            tracing::debug!(reason, "busy flag set");
        }
        raised
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
