//! Chunk types for the streaming pipeline.
//!
//! Defines the data that flows from the chunk source into the detectors.

use std::time::Duration;

/// A fixed-duration slice of the input stream.
///
/// Samples are mono, normalized to [-1.0, +1.0]. The timestamp is the
/// offset of the chunk's first sample from the start of the stream;
/// `duration` is the nominal chunk duration (the final chunk of a stream
/// may carry fewer samples than the nominal duration implies).
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub timestamp: Duration,
    pub duration: Duration,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, timestamp: Duration, duration: Duration) -> Self {
        Self {
            samples,
            timestamp,
            duration,
        }
    }

    /// Nominal end instant of this chunk (timestamp + nominal duration).
    pub fn end(&self) -> Duration {
        self.timestamp + self.duration
    }

    /// Duration actually covered by the carried samples.
    pub fn actual_duration(&self, sample_rate: u32) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / sample_rate as f64)
    }
}

/// Per-stream constants: sample rate and nominal chunk duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    pub sample_rate: u32,
    pub chunk_duration: Duration,
}

impl StreamParams {
    pub fn new(sample_rate: u32, chunk_duration: Duration) -> Self {
        Self {
            sample_rate,
            chunk_duration,
        }
    }

    /// Number of samples in a full chunk.
    pub fn samples_per_chunk(&self) -> usize {
        (self.sample_rate as f64 * self.chunk_duration.as_secs_f64()) as usize
    }
}
