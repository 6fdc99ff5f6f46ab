//! Chunk source: turns a decoded sample buffer into a timestamped stream.
//!
//! A spawned producer task slices the buffer into nominal-duration chunks
//! and sends them over a bounded channel. With pacing enabled, delivery is
//! delayed to wall-clock to simulate a live call; pacing affects delivery
//! timing only, never timestamps.

use crate::audio::chunk::{AudioChunk, StreamParams};
use std::time::Duration;
use tokio::sync::mpsc;

/// Bound on in-flight chunks between the producer and the engine.
const CHANNEL_BOUND: usize = 10;

/// Streams a sample buffer as fixed-duration chunks.
pub struct ChunkStreamer {
    samples: Vec<f32>,
    params: StreamParams,
}

impl ChunkStreamer {
    pub fn new(samples: Vec<f32>, params: StreamParams) -> Self {
        Self { samples, params }
    }

    /// Total duration represented by the sample buffer.
    pub fn total_duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.params.sample_rate as f64)
    }

    /// Starts the producer task and returns the chunk receiver.
    ///
    /// The channel closes when the buffer is exhausted; end-of-stream is a
    /// normal termination, not an error. When `paced` is set the producer
    /// sleeps for each chunk's actual duration after sending it.
    pub fn stream(self, paced: bool) -> mpsc::Receiver<AudioChunk> {
        let (tx, rx) = mpsc::channel(CHANNEL_BOUND);
        let samples_per_chunk = self.params.samples_per_chunk().max(1);
        let sample_rate = self.params.sample_rate;
        let chunk_duration = self.params.chunk_duration;
        let samples = self.samples;

        tokio::spawn(async move {
            let mut position = 0usize;
            let mut current_time = Duration::ZERO;

            while position < samples.len() {
                let end = (position + samples_per_chunk).min(samples.len());
                let chunk = AudioChunk::new(
                    samples[position..end].to_vec(),
                    current_time,
                    chunk_duration,
                );
                let actual = chunk.actual_duration(sample_rate);

                if tx.send(chunk).await.is_err() {
                    // Consumer decided early; stop producing.
                    return;
                }

                current_time += actual;
                position = end;

                if paced {
                    tokio::time::sleep(actual).await;
                }
            }
        });

        rx
    }
}
