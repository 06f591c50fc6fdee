//! Voice pipeline integration tests
//!
//! Tests voice components without requiring audio hardware

use std::io::Cursor;
use std::time::Duration;

use dinner_robot::Error;
use dinner_robot::voice::{
    SAMPLE_RATE, SpeechCapture, UtteranceSegmenter, contains_wake_word, rms,
    samples_to_wav,
};

mod common;
use common::{FixedTranscriber, ScriptedSource};

/// Generate sine wave audio samples
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}

fn capture(source: std::sync::Arc<ScriptedSource>, transcriber: std::sync::Arc<FixedTranscriber>) -> SpeechCapture {
    SpeechCapture::new(
        source,
        transcriber,
        Duration::from_millis(10),
        Duration::from_millis(10),
    )
}

#[test]
fn test_segmenter_finds_utterance_in_stream() {
    let mut segmenter = UtteranceSegmenter::new(0.02);

    let mut stream = generate_silence(0.5);
    stream.extend(generate_sine_samples(300.0, 0.8, 0.4));
    stream.extend(generate_silence(1.2));

    let mut complete = false;
    for chunk in stream.chunks(1600) {
        if segmenter.push(chunk) {
            complete = true;
            break;
        }
    }

    assert!(complete);
    let utterance = segmenter.take_utterance();
    assert!(rms(&utterance) > 0.1);
    assert!(!segmenter.in_speech());
}

#[test]
fn test_segmenter_ignores_quiet_room() {
    let mut segmenter = UtteranceSegmenter::new(0.05);
    let hum = generate_sine_samples(50.0, 2.0, 0.02);

    for chunk in hum.chunks(1600) {
        assert!(!segmenter.push(chunk));
    }
    assert!(!segmenter.in_speech());
}

#[test]
fn test_wav_encoding_for_stt() {
    let samples = generate_sine_samples(440.0, 0.5, 0.5);
    let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");

    let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
    assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
    assert_eq!(reader.spec().bits_per_sample, 16);
    assert_eq!(reader.len() as usize, samples.len());
}

#[test]
fn test_wake_word_matching() {
    assert!(contains_wake_word("Hola Dinner"));
    assert!(contains_wake_word("hey diner can you hear me"));
    assert!(!contains_wake_word("dinnerware"));
}

#[tokio::test]
async fn test_capture_prefers_spanish_transcript() {
    let capture = capture(
        ScriptedSource::one_utterance(),
        FixedTranscriber::new(Some("hello there"), Some("hola que tal")),
    );
    assert_eq!(capture.listen().await, "hola que tal");
}

#[tokio::test]
async fn test_capture_prefers_transcript_with_wake_word() {
    let capture = capture(
        ScriptedSource::one_utterance(),
        FixedTranscriber::new(Some("hi dinner"), Some("hay diene")),
    );
    assert_eq!(capture.listen().await, "hi dinner");
}

#[tokio::test]
async fn test_capture_falls_back_to_english_only() {
    let capture = capture(
        ScriptedSource::one_utterance(),
        FixedTranscriber::new(Some("good morning"), None),
    );
    assert_eq!(capture.listen().await, "good morning");
}

#[tokio::test]
async fn test_capture_never_fails() {
    // nothing transcribed
    let both_fail = capture(ScriptedSource::one_utterance(), FixedTranscriber::new(None, None));
    assert_eq!(both_fail.listen().await, "");

    // blank transcripts count as failures
    let blank = capture(
        ScriptedSource::one_utterance(),
        FixedTranscriber::new(Some("  "), Some("")),
    );
    assert_eq!(blank.listen().await, "");

    // silence
    let silent = capture(
        ScriptedSource::scripted(vec![Ok(None)]),
        FixedTranscriber::new(Some("hello dinner"), None),
    );
    assert_eq!(silent.listen().await, "");

    // device error
    let broken = capture(
        ScriptedSource::scripted(vec![Err(Error::Audio("no input device".to_string()))]),
        FixedTranscriber::new(Some("hello dinner"), None),
    );
    assert_eq!(broken.listen().await, "");
}
