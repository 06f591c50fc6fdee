//! Voice processing module
//!
//! Handles microphone capture, utterance segmentation, transcription,
//! wake word matching, synthesis, and playback.

use std::time::Duration;

use crate::{Error, Result};

mod capture;
mod microphone;
mod playback;
mod segmenter;
mod stt;
mod tts;
mod wake_word;

pub use capture::{SpeechCapture, choose_transcript};
pub use microphone::{AudioSource, Microphone, SAMPLE_RATE, samples_to_wav};
pub use playback::{AudioPlayback, AudioSink, DecodedAudio, Speaker, decode_mp3};
pub use segmenter::{UtteranceSegmenter, rms};
pub use stt::{SpeechToText, SttProvider, Transcriber};
pub use tts::{SpeechSynthesizer, TextToSpeech, VoiceSelection};
pub use wake_word::contains_wake_word;

/// HTTP client for the speech services with a per-request timeout
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))
}
