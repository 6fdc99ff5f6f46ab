//! Audio input: WAV decoding and chunked streaming.

pub mod chunk;
pub mod streamer;
pub mod wav;

pub use chunk::{AudioChunk, StreamParams};
pub use streamer::ChunkStreamer;
pub use wav::WavAudio;
