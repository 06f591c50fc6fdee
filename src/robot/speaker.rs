//! Speech output worker
//!
//! Single consumer of the speech queue. Jobs run strictly one at a time in
//! FIFO order. After every job, spoken or failed, the worker announces
//! `speaking_done`, returns to listening and then lowers the busy flag.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use super::events::RobotEvent;
use super::runtime::{RobotRuntime, SpeechJob, SpeechQueue};
use super::state::RobotState;
use crate::voice::{AudioSink, SpeechSynthesizer};
use crate::{Error, Result};

struct VoiceOutput {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn AudioSink>,
}

/// Plays queued speech jobs
pub struct SpeechWorker {
    runtime: Arc<RobotRuntime>,
    output: Option<VoiceOutput>,
    poll: Duration,
}

impl SpeechWorker {
    #[must_use]
    pub fn new(
        runtime: Arc<RobotRuntime>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sink: Arc<dyn AudioSink>,
        poll: Duration,
    ) -> Self {
        Self {
            runtime,
            output: Some(VoiceOutput { synthesizer, sink }),
            poll,
        }
    }

    /// Worker without voice output
    ///
    /// Jobs are acknowledged as if spoken so the robot never stays busy.
    #[must_use]
    pub const fn muted(runtime: Arc<RobotRuntime>, poll: Duration) -> Self {
        Self {
            runtime,
            output: None,
            poll,
        }
    }

    /// Drain the queue until the runtime goes away
    pub async fn run(self, mut queue: SpeechQueue) {
        tracing::info!("speech worker started");

        loop {
            match tokio::time::timeout(self.poll, queue.recv()).await {
                Ok(Some(job)) => self.process(job).await,
                Ok(None) => {
                    tracing::info!("speech queue closed, worker stopping");
                    break;
                }
                Err(_) => {}
            }
        }
    }

    /// Speak one job and hand the microphone back
    pub async fn process(&self, job: SpeechJob) {
        let spoken = AssertUnwindSafe(self.speak(&job))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(Error::from_panic(&*panic)));

        if let Err(e) = spoken {
            tracing::error!(error = %e, text = %job.text, "speech output failed");
        }

        self.runtime.emit(RobotEvent::SpeakingDone);
        self.runtime.state.set(RobotState::Listening);
        self.runtime.busy.clear("playback finished");
    }

    async fn speak(&self, job: &SpeechJob) -> Result<()> {
        let Some(output) = &self.output else {
            tracing::debug!(text = %job.text, "voice output disabled, skipping playback");
            return Ok(());
        };

        let audio = output.synthesizer.synthesize(&job.text, job.language).await?;
        tracing::debug!(bytes = audio.len(), language = %job.language, "speaking");

        let sink = Arc::clone(&output.sink);
        tokio::task::spawn_blocking(move || sink.play(&audio))
            .await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }
}
