//! Utterance segmentation
//!
//! Splits a live sample stream into one utterance: waits for energy above
//! the calibrated threshold, accumulates until a trailing pause, and gives
//! up on blips that are too short to be speech.

/// Minimum duration of speech for an utterance (in samples at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800; // 0.3 seconds

/// Silence after speech that ends an utterance (in samples)
const PAUSE_SAMPLES: usize = 12800; // 0.8 seconds

/// Floor for the energy threshold, whatever calibration says
pub const MIN_ENERGY_THRESHOLD: f32 = 0.01;

/// Default energy threshold before calibration
pub const DEFAULT_ENERGY_THRESHOLD: f32 = 0.03;

/// Segmenter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmenterState {
    /// Waiting for speech
    Waiting,
    /// Speech started, accumulating
    Speech,
}

/// Finds one utterance in a stream of audio chunks
pub struct UtteranceSegmenter {
    threshold: f32,
    state: SegmenterState,
    buffer: Vec<f32>,
    silence_counter: usize,
}

impl UtteranceSegmenter {
    #[must_use]
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.max(MIN_ENERGY_THRESHOLD),
            state: SegmenterState::Waiting,
            buffer: Vec::new(),
            silence_counter: 0,
        }
    }

    /// Feed a chunk of samples
    ///
    /// Returns true once a complete utterance (speech followed by a pause)
    /// has been accumulated.
    pub fn push(&mut self, samples: &[f32]) -> bool {
        if samples.is_empty() {
            return false;
        }

        let energy = rms(samples);
        let is_speech = energy > self.threshold;

        match self.state {
            SegmenterState::Waiting => {
                if is_speech {
                    self.state = SegmenterState::Speech;
                    self.buffer.clear();
                    self.buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech started");
                }
            }
            SegmenterState::Speech => {
                self.buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.silence_counter > PAUSE_SAMPLES {
                    if self.buffer.len() - self.silence_counter > MIN_SPEECH_SAMPLES {
                        tracing::debug!(samples = self.buffer.len(), "utterance complete");
                        return true;
                    }

                    tracing::trace!("too short for speech, resetting");
                    self.reset();
                }
            }
        }

        false
    }

    /// Whether speech has started
    #[must_use]
    pub fn in_speech(&self) -> bool {
        self.state == SegmenterState::Speech
    }

    /// Take the accumulated utterance and start over
    pub fn take_utterance(&mut self) -> Vec<f32> {
        let samples = std::mem::take(&mut self.buffer);
        self.reset();
        samples
    }

    pub fn reset(&mut self) {
        self.state = SegmenterState::Waiting;
        self.buffer.clear();
        self.silence_counter = 0;
    }
}

/// RMS energy of audio samples
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
