//! Speech-to-text bridge.
//!
//! The adapter pushes raw PCM to a remote transcription backend and
//! surfaces transcript events over a bounded queue. Backend failure is
//! always degradation, never fatal: once disconnected, sends silently
//! no-op and the rest of the pipeline proceeds without phrase evidence.

pub mod deepgram;

use crate::config::Config;
use crate::error::{DropcueError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Bound on queued transcript events; overflow drops silently.
pub const TRANSCRIPT_QUEUE: usize = 100;

/// Bound on queued outbound audio payloads.
const AUDIO_QUEUE: usize = 100;

/// One transcript fragment from the backend.
///
/// The timestamp is the fragment's start offset from the beginning of the
/// stream. Interim (non-final) results are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEvent {
    pub text: String,
    pub timestamp: Duration,
    pub is_final: bool,
}

/// Handle to a live transcription session.
///
/// Audio flows out through a bounded channel to a writer task; transcript
/// events flow back through [`SttAdapter::take_events`]. Dropping the
/// adapter (or calling [`SttAdapter::close`]) ends the session.
#[derive(Debug)]
pub struct SttAdapter {
    audio_tx: Option<mpsc::Sender<Vec<u8>>>,
    events_rx: Option<mpsc::Receiver<TranscriptEvent>>,
    connected: Arc<AtomicBool>,
}

impl SttAdapter {
    /// Connects to the configured backend.
    ///
    /// Fails with `SttUnavailable` when no API key is configured or the
    /// backend refuses the connection.
    pub async fn connect(config: &Config, sample_rate: u32) -> Result<Self> {
        let Some(api_key) = config.stt.api_key.as_deref().filter(|k| !k.is_empty()) else {
            return Err(DropcueError::SttUnavailable {
                message: "speech-to-text is disabled (no API key)".to_string(),
            });
        };

        deepgram::connect(api_key, sample_rate).await
    }

    /// Assembles an adapter from raw session parts. Used by the backend
    /// client, and by tests through [`SttAdapter::piped`].
    pub(crate) fn from_parts(
        audio_tx: mpsc::Sender<Vec<u8>>,
        events_rx: mpsc::Receiver<TranscriptEvent>,
        connected: Arc<AtomicBool>,
    ) -> Self {
        Self {
            audio_tx: Some(audio_tx),
            events_rx: Some(events_rx),
            connected,
        }
    }

    /// Builds a backend-free adapter for tests: returns the adapter, the
    /// receiving end of the audio byte stream, and the sending end of the
    /// transcript queue.
    pub fn piped() -> (
        Self,
        mpsc::Receiver<Vec<u8>>,
        mpsc::Sender<TranscriptEvent>,
    ) {
        let (audio_tx, audio_rx) = mpsc::channel(AUDIO_QUEUE);
        let (events_tx, events_rx) = mpsc::channel(TRANSCRIPT_QUEUE);
        let connected = Arc::new(AtomicBool::new(true));
        (
            Self::from_parts(audio_tx, events_rx, connected),
            audio_rx,
            events_tx,
        )
    }

    /// Forwards one chunk of samples to the backend as 16-bit LE PCM.
    ///
    /// No-op when disconnected. Queue-full and closed-channel failures are
    /// logged and dropped.
    pub fn send_audio(&self, samples: &[f32]) {
        if !self.is_connected() {
            return;
        }
        let Some(tx) = &self.audio_tx else {
            return;
        };

        let payload = encode_linear16(samples);
        if let Err(e) = tx.try_send(payload) {
            debug!("dropping audio payload: {}", e);
        }
    }

    /// Hands out the transcript event receiver. Yields `None` on a second
    /// call or when the session was built without one.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<TranscriptEvent>> {
        self.events_rx.take()
    }

    /// True while the backend connection is up.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Ends the session: the writer task flushes a close frame and both
    /// tasks wind down.
    pub fn close(&mut self) {
        self.audio_tx = None;
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// Converts normalized samples to 16-bit little-endian linear PCM.
///
/// Samples are clamped to [-1, +1] and scaled by 32767.
pub fn encode_linear16(samples: &[f32]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        data.extend_from_slice(&value.to_le_bytes());
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_linear16_scaling() {
        let data = encode_linear16(&[0.0, 1.0, -1.0, 0.5]);
        assert_eq!(data.len(), 8);

        let values: Vec<i16> = data
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(values[0], 0);
        assert_eq!(values[1], 32767);
        assert_eq!(values[2], -32767);
        assert_eq!(values[3], 16383);
    }

    #[test]
    fn test_encode_linear16_clamps_out_of_range() {
        let data = encode_linear16(&[2.0, -3.5]);
        let values: Vec<i16> = data
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(values, vec![32767, -32767]);
    }

    #[test]
    fn test_encode_linear16_is_little_endian() {
        // 0.5 * 32767 = 16383 = 0x3FFF -> bytes FF 3F
        let data = encode_linear16(&[0.5]);
        assert_eq!(data, vec![0xFF, 0x3F]);
    }

    #[tokio::test]
    async fn test_connect_without_key_is_unavailable() {
        let config = Config::default();
        let err = SttAdapter::connect(&config, 16000).await.unwrap_err();
        assert!(matches!(err, DropcueError::SttUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_piped_adapter_forwards_audio() {
        let (adapter, mut audio_rx, _events_tx) = SttAdapter::piped();
        assert!(adapter.is_connected());

        adapter.send_audio(&[0.0, 0.5]);
        let payload = audio_rx.recv().await.unwrap();
        assert_eq!(payload.len(), 4);
    }

    #[tokio::test]
    async fn test_send_after_close_is_noop() {
        let (mut adapter, mut audio_rx, _events_tx) = SttAdapter::piped();
        adapter.close();
        assert!(!adapter.is_connected());

        adapter.send_audio(&[0.1; 32]);
        assert!(audio_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_take_events_yields_once() {
        let (mut adapter, _audio_rx, events_tx) = SttAdapter::piped();

        let mut events = adapter.take_events().expect("first take");
        assert!(adapter.take_events().is_none());

        events_tx
            .send(TranscriptEvent {
                text: "hello".to_string(),
                timestamp: Duration::from_secs(1),
                is_final: true,
            })
            .await
            .unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(event.text, "hello");
        assert!(event.is_final);
    }
}
