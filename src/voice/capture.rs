//! Speech capture
//!
//! Records one utterance and transcribes it twice, once as English and once
//! as Spanish. Every failure degrades to an empty transcript; callers never
//! see an error from here.

use std::sync::Arc;
use std::time::Duration;

use super::microphone::{AudioSource, SAMPLE_RATE, samples_to_wav};
use super::stt::Transcriber;
use super::wake_word::contains_wake_word;
use crate::language::Language;

/// Microphone plus transcription, best effort
pub struct SpeechCapture {
    source: Arc<dyn AudioSource>,
    transcriber: Arc<dyn Transcriber>,
    listen_timeout: Duration,
    phrase_limit: Duration,
}

impl SpeechCapture {
    #[must_use]
    pub fn new(
        source: Arc<dyn AudioSource>,
        transcriber: Arc<dyn Transcriber>,
        listen_timeout: Duration,
        phrase_limit: Duration,
    ) -> Self {
        Self {
            source,
            transcriber,
            listen_timeout,
            phrase_limit,
        }
    }

    /// Capture and transcribe one utterance
    ///
    /// Returns an empty string on silence or when nothing could be
    /// transcribed.
    pub async fn listen(&self) -> String {
        let source = Arc::clone(&self.source);
        let (wait, limit) = (self.listen_timeout, self.phrase_limit);

        let samples = match tokio::task::spawn_blocking(move || source.record(wait, limit)).await
        {
            Ok(Ok(Some(samples))) => samples,
            Ok(Ok(None)) => {
                tracing::trace!("no speech before timeout");
                return String::new();
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "audio capture failed");
                return String::new();
            }
            Err(e) => {
                tracing::debug!(error = %e, "capture task failed");
                return String::new();
            }
        };

        let wav = match samples_to_wav(&samples, SAMPLE_RATE) {
            Ok(wav) => wav,
            Err(e) => {
                tracing::debug!(error = %e, "wav encoding failed");
                return String::new();
            }
        };

        let (english, spanish) = tokio::join!(
            self.transcribe(&wav, Language::En),
            self.transcribe(&wav, Language::Es),
        );

        let text = choose_transcript(english, spanish);
        if !text.is_empty() {
            tracing::debug!(transcript = %text, "heard");
        }
        text
    }

    async fn transcribe(&self, wav: &[u8], language: Language) -> Option<String> {
        match self.transcriber.transcribe(wav, language).await {
            Ok(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Err(e) => {
                tracing::debug!(error = %e, %language, "transcription failed");
                None
            }
        }
    }
}

/// Pick between the English and Spanish transcripts of one utterance
///
/// A transcript holding the wake word wins when the other does not.
/// Otherwise Spanish is preferred, then whichever exists.
#[must_use]
pub fn choose_transcript(english: Option<String>, spanish: Option<String>) -> String {
    match (english, spanish) {
        (Some(en), Some(es)) => {
            if contains_wake_word(&en) && !contains_wake_word(&es) {
                en
            } else {
                es
            }
        }
        (Some(en), None) => en,
        (None, Some(es)) => es,
        (None, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn wake_word_transcript_wins() {
        assert_eq!(
            choose_transcript(some("hello dinner"), some("jelou diner")),
            "jelou diner"
        );
        assert_eq!(
            choose_transcript(some("hello dinner"), some("jelou dina")),
            "hello dinner"
        );
        assert_eq!(
            choose_transcript(some("hello"), some("hola dinner")),
            "hola dinner"
        );
    }

    #[test]
    fn spanish_is_preferred_without_wake_word() {
        assert_eq!(choose_transcript(some("hello"), some("hola")), "hola");
    }

    #[test]
    fn single_success_is_used() {
        assert_eq!(choose_transcript(some("hello dinner"), None), "hello dinner");
        assert_eq!(choose_transcript(None, some("hola")), "hola");
        assert_eq!(choose_transcript(None, None), "");
    }
}
