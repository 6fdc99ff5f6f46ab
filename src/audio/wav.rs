//! WAV file decoding.
//!
//! Loads a RIFF/WAVE container into normalized mono samples. Supports
//! 8, 16 and 32-bit integer PCM at any sample rate; multi-channel audio
//! is down-mixed by per-frame averaging.

use crate::error::{DropcueError, Result};
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Decoded WAV audio: normalized mono samples plus the source sample rate.
#[derive(Debug)]
pub struct WavAudio {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl WavAudio {
    /// Open and fully decode a WAV file from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(Box::new(std::io::BufReader::new(file)))
    }

    /// Decode WAV data from any reader (for testing/flexibility).
    pub fn from_reader(reader: Box<dyn Read + Send>) -> Result<Self> {
        let mut wav_reader = hound::WavReader::new(reader).map_err(|e| DropcueError::BadAudio {
            message: format!("failed to parse WAV container: {}", e),
        })?;

        let spec = wav_reader.spec();
        if spec.sample_format != hound::SampleFormat::Int {
            return Err(DropcueError::UnsupportedFormat {
                message: "only integer PCM is supported".to_string(),
            });
        }

        // Full-scale divisor for the source bit depth. hound already
        // bias-corrects 8-bit unsigned samples to signed.
        let scale = match spec.bits_per_sample {
            8 => 128.0,
            16 => 32768.0,
            32 => 2147483648.0,
            other => {
                return Err(DropcueError::UnsupportedFormat {
                    message: format!("{}-bit samples", other),
                });
            }
        };

        let raw: Vec<i32> = wav_reader
            .samples::<i32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| DropcueError::BadAudio {
                message: format!("failed to read WAV samples: {}", e),
            })?;

        let channels = spec.channels.max(1) as usize;
        let samples = if channels == 1 {
            raw.iter().map(|&s| s as f32 / scale).collect()
        } else {
            raw.chunks_exact(channels)
                .map(|frame| {
                    let sum: f64 = frame.iter().map(|&s| s as f64).sum();
                    (sum / channels as f64 / scale as f64) as f32
                })
                .collect()
        };

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Total duration of the decoded audio.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Consume the source and return the normalized mono samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}
