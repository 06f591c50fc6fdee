//! Audio playback to speakers

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Rate assumed when a clip carries no frames to read it from
const FALLBACK_SAMPLE_RATE: u32 = 24000;

/// Extra wait past the expected duration before giving up on the device
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Blocking audio output
pub trait AudioSink: Send + Sync {
    /// Play encoded (MP3) audio, returning once it has finished
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    fn play(&self, audio: &[u8]) -> Result<()>;
}

/// Mono samples decoded from a clip, with the rate they were encoded at
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Plays audio to the default output device
pub struct AudioPlayback {
    config: StreamConfig,
    sample_rate: u32,
}

impl AudioPlayback {
    /// Open the default output device at the given sample rate
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new(sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supports_rate = |c: &cpal::SupportedStreamConfigRange| {
            c.min_sample_rate() <= SampleRate(sample_rate)
                && c.max_sample_rate() >= SampleRate(sample_rate)
        };

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| c.channels() == 1 && supports_rate(c))
            .or_else(|| {
                device
                    .supported_output_configs()
                    .ok()?
                    .find(|c| c.channels() == 2 && supports_rate(c))
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(sample_rate))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self {
            config,
            sample_rate,
        })
    }

    /// Play mono f32 samples, blocking until done
    ///
    /// # Errors
    ///
    /// Returns error if the output stream fails
    pub fn play_samples(&self, samples: Vec<f32>) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device".to_string()))?;

        let channels = usize::from(self.config.channels);
        let sample_count = samples.len();

        let samples = Arc::new(samples);
        let position = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let stream = {
            let samples = Arc::clone(&samples);
            let position = Arc::clone(&position);
            let finished = Arc::clone(&finished);

            device
                .build_output_stream(
                    &self.config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let mut pos = position.load(Ordering::Relaxed);

                        for frame in data.chunks_mut(channels) {
                            let sample = samples.get(pos).copied().unwrap_or(0.0);
                            frame.fill(sample);

                            if pos < samples.len() {
                                pos += 1;
                            }
                        }

                        position.store(pos, Ordering::Relaxed);
                        if pos >= samples.len() {
                            finished.store(true, Ordering::Release);
                        }
                    },
                    |err| {
                        tracing::error!(error = %err, "audio playback error");
                    },
                    None,
                )
                .map_err(|e| Error::Audio(e.to_string()))?
        };

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        let expected =
            Duration::from_millis((sample_count as u64 * 1000) / u64::from(self.sample_rate));
        let start = Instant::now();

        while !finished.load(Ordering::Acquire) {
            if start.elapsed() > expected + DRAIN_GRACE {
                tracing::warn!("playback did not drain in time");
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        // let the device flush its last buffer
        std::thread::sleep(Duration::from_millis(100));

        drop(stream);
        tracing::debug!(samples = sample_count, "playback complete");

        Ok(())
    }
}

/// Speaker that opens a fresh output engine for every clip
#[derive(Debug, Default, Clone, Copy)]
pub struct Speaker;

impl AudioSink for Speaker {
    fn play(&self, audio: &[u8]) -> Result<()> {
        let decoded = decode_mp3(audio)?;
        if decoded.samples.is_empty() {
            return Ok(());
        }
        AudioPlayback::new(decoded.sample_rate)?.play_samples(decoded.samples)
    }
}

/// Decode MP3 bytes to mono f32 samples
///
/// The sample rate is taken from the first frame. Providers differ here:
/// `OpenAI` speech is 24 kHz, ElevenLabs defaults to 44.1 kHz.
///
/// # Errors
///
/// Returns error if the data is not valid MP3
pub fn decode_mp3(mp3_data: &[u8]) -> Result<DecodedAudio> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = None;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate.is_none() {
                    sample_rate = u32::try_from(frame.sample_rate).ok().filter(|&r| r > 0);
                }

                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(DecodedAudio {
        samples,
        sample_rate: sample_rate.unwrap_or(FALLBACK_SAMPLE_RATE),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Silent MPEG Layer III stream built from one repeated frame header
    fn silent_mp3(header: [u8; 4], frame_len: usize, frames: usize) -> Vec<u8> {
        let mut frame = vec![0u8; frame_len];
        frame[..4].copy_from_slice(&header);
        frame.repeat(frames)
    }

    #[test]
    fn empty_mp3_decodes_to_nothing() {
        let decoded = decode_mp3(&[]).unwrap();
        assert!(decoded.samples.is_empty());
        assert_eq!(decoded.sample_rate, FALLBACK_SAMPLE_RATE);
    }

    #[test]
    fn garbage_is_not_audio() {
        // minimp3 skips junk looking for a sync word, so this is either
        // silence or an error, never samples
        let result = decode_mp3(b"definitely not an mp3 stream");
        assert!(result.map(|d| d.samples.is_empty()).unwrap_or(true));
    }

    #[test]
    fn sample_rate_comes_from_the_stream() {
        // MPEG-1, 128 kbps, 44.1 kHz, mono: 417 byte frames
        let decoded = decode_mp3(&silent_mp3([0xFF, 0xFB, 0x90, 0xC0], 417, 16)).unwrap();
        assert_eq!(decoded.sample_rate, 44_100);
        assert!(!decoded.samples.is_empty());

        // MPEG-2, 64 kbps, 24 kHz, mono: 192 byte frames
        let decoded = decode_mp3(&silent_mp3([0xFF, 0xF3, 0x84, 0xC0], 192, 16)).unwrap();
        assert_eq!(decoded.sample_rate, 24_000);
        assert!(!decoded.samples.is_empty());
    }
}
