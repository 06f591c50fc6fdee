//! Microphone input
//!
//! [`AudioSource`] is the blocking seam speech capture records through;
//! [`Microphone`] is the cpal-backed implementation. The input stream is
//! opened per recording so the struct itself holds no device handle and can
//! move between threads.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use super::segmenter::{self, DEFAULT_ENERGY_THRESHOLD, MIN_ENERGY_THRESHOLD, UtteranceSegmenter};
use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// How often the recording loop drains the capture buffer
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Calibrated threshold = ambient RMS times this margin
const CALIBRATION_MARGIN: f32 = 1.5;

/// Blocking source of single utterances
pub trait AudioSource: Send + Sync {
    /// Record one utterance
    ///
    /// Waits up to `wait` for speech to start and stops after `phrase_limit`
    /// of speech. Returns `None` if nobody spoke.
    ///
    /// # Errors
    ///
    /// Returns error if the audio device fails
    fn record(&self, wait: Duration, phrase_limit: Duration) -> Result<Option<Vec<f32>>>;
}

/// Default input device at 16kHz mono
pub struct Microphone {
    config: StreamConfig,
    energy_threshold: f32,
}

impl Microphone {
    /// Open the default input device
    ///
    /// # Errors
    ///
    /// Returns error if no suitable input device exists
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "microphone initialized"
        );

        Ok(Self {
            config,
            energy_threshold: DEFAULT_ENERGY_THRESHOLD,
        })
    }

    /// Measure ambient noise and set the speech threshold above it
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be opened
    pub fn calibrate(&mut self, duration: Duration) -> Result<f32> {
        let samples = self.capture_for(duration)?;
        let ambient = segmenter::rms(&samples);

        self.energy_threshold = (ambient * CALIBRATION_MARGIN).max(MIN_ENERGY_THRESHOLD);
        tracing::info!(
            ambient,
            threshold = self.energy_threshold,
            "microphone calibrated"
        );

        Ok(self.energy_threshold)
    }

    /// Record raw samples for a fixed duration
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be opened
    pub fn capture_for(&self, duration: Duration) -> Result<Vec<f32>> {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let stream = self.open_stream(Arc::clone(&buffer))?;

        std::thread::sleep(duration);
        drop(stream);

        Ok(drain(&buffer))
    }

    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn open_stream(&self, buffer: Arc<Mutex<Vec<f32>>>) -> Result<Stream> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device".to_string()))?;

        let stream = device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        Ok(stream)
    }
}

impl AudioSource for Microphone {
    fn record(&self, wait: Duration, phrase_limit: Duration) -> Result<Option<Vec<f32>>> {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let stream = self.open_stream(Arc::clone(&buffer))?;

        let mut segmenter = UtteranceSegmenter::new(self.energy_threshold);
        let started = Instant::now();
        let mut speech_started: Option<Instant> = None;

        let utterance = loop {
            std::thread::sleep(POLL_INTERVAL);

            if segmenter.push(&drain(&buffer)) {
                break Some(segmenter.take_utterance());
            }

            match (segmenter.in_speech(), speech_started) {
                (true, None) => speech_started = Some(Instant::now()),
                (false, Some(_)) => speech_started = None,
                _ => {}
            }

            if let Some(at) = speech_started {
                if at.elapsed() >= phrase_limit {
                    tracing::debug!("phrase limit reached");
                    break Some(segmenter.take_utterance());
                }
            } else if started.elapsed() >= wait {
                break None;
            }
        };

        drop(stream);
        Ok(utterance)
    }
}

fn drain(buffer: &Mutex<Vec<f32>>) -> Vec<f32> {
    std::mem::take(&mut *buffer.lock().unwrap_or_else(PoisonError::into_inner))
}

/// Convert f32 samples to WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_encoding_keeps_samples() {
        let samples = vec![0.0f32, 0.5, -0.5, 1.0, -1.0];
        let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

        let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, SAMPLE_RATE);
        assert_eq!(spec.channels, 1);
        assert_eq!(reader.len(), 5);
    }

    #[test]
    fn wav_encoding_clamps() {
        let wav = samples_to_wav(&[2.0, -2.0], SAMPLE_RATE).unwrap();
        let mut reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, vec![32767, -32768]);
    }
}
