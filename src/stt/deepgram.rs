//! Deepgram live transcription client.
//!
//! Streams 16-bit LE PCM over Deepgram's listen WebSocket and parses
//! interim and final transcript messages back into [`TranscriptEvent`]s.

use crate::error::{DropcueError, Result};
use crate::stt::{SttAdapter, TranscriptEvent, TRANSCRIPT_QUEUE};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

const LISTEN_URL: &str = "wss://api.deepgram.com/v1/listen";

/// Bound on outbound audio payloads queued for the socket writer.
const AUDIO_QUEUE: usize = 100;

/// Sent to flush any buffered audio before the socket closes.
const CLOSE_STREAM: &str = r#"{"type":"CloseStream"}"#;

/// Opens a live transcription session.
///
/// The returned adapter owns two spawned tasks: a writer forwarding PCM
/// payloads to the socket, and a reader parsing transcript messages into
/// the bounded event queue.
pub(crate) async fn connect(api_key: &str, sample_rate: u32) -> Result<SttAdapter> {
    let url = format!(
        "{LISTEN_URL}?model=nova-2&language=en-US&punctuate=true&smart_format=true\
         &interim_results=true&encoding=linear16&channels=1&sample_rate={sample_rate}"
    );

    let mut request = url
        .into_client_request()
        .map_err(|e| DropcueError::SttUnavailable {
            message: format!("failed to build request: {}", e),
        })?;
    let auth = HeaderValue::from_str(&format!("Token {}", api_key)).map_err(|_| {
        DropcueError::SttUnavailable {
            message: "API key is not a valid header value".to_string(),
        }
    })?;
    request.headers_mut().insert("Authorization", auth);

    let (socket, _response) =
        connect_async(request)
            .await
            .map_err(|e| DropcueError::SttUnavailable {
                message: format!("WebSocket connect failed: {}", e),
            })?;
    debug!(sample_rate, "connected to Deepgram");

    let (mut sink, mut stream) = socket.split();
    let (audio_tx, mut audio_rx) = mpsc::channel::<Vec<u8>>(AUDIO_QUEUE);
    let (events_tx, events_rx) = mpsc::channel::<TranscriptEvent>(TRANSCRIPT_QUEUE);
    let connected = Arc::new(AtomicBool::new(true));

    // Writer: forward PCM until the adapter drops its sender, then flush.
    let writer_connected = connected.clone();
    tokio::spawn(async move {
        while let Some(payload) = audio_rx.recv().await {
            if sink.send(Message::Binary(payload)).await.is_err() {
                warn!("audio send failed; treating backend as disconnected");
                writer_connected.store(false, Ordering::SeqCst);
                return;
            }
        }
        let _ = sink.send(Message::Text(CLOSE_STREAM.to_string())).await;
        let _ = sink.close().await;
    });

    // Reader: parse transcript messages until the backend closes.
    let reader_connected = connected.clone();
    tokio::spawn(async move {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    if let Some(event) = parse_transcript(&text)
                        && events_tx.try_send(event).is_err()
                    {
                        debug!("transcript queue full; dropping event");
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("transcript stream error: {}", e);
                    break;
                }
            }
        }
        reader_connected.store(false, Ordering::SeqCst);
        debug!("disconnected from Deepgram");
    });

    Ok(SttAdapter::from_parts(audio_tx, events_rx, connected))
}

/// Extracts a transcript event from one Deepgram message, if it carries a
/// non-empty alternative.
fn parse_transcript(text: &str) -> Option<TranscriptEvent> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;

    let transcript = value["channel"]["alternatives"][0]["transcript"].as_str()?;
    if transcript.is_empty() {
        return None;
    }

    let start = value["start"].as_f64().unwrap_or(0.0);
    let is_final = value["is_final"].as_bool().unwrap_or(false);

    Some(TranscriptEvent {
        text: transcript.to_string(),
        timestamp: Duration::from_secs_f64(start.max(0.0)),
        is_final,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transcript_message() {
        let message = r#"{
            "type": "Results",
            "start": 2.5,
            "is_final": true,
            "channel": {
                "alternatives": [
                    {"transcript": "Please leave a message after the beep.", "confidence": 0.98}
                ]
            }
        }"#;

        let event = parse_transcript(message).expect("event");
        assert_eq!(event.text, "Please leave a message after the beep.");
        assert_eq!(event.timestamp, Duration::from_millis(2500));
        assert!(event.is_final);
    }

    #[test]
    fn test_parse_skips_empty_transcript() {
        let message = r#"{
            "start": 1.0,
            "is_final": false,
            "channel": {"alternatives": [{"transcript": ""}]}
        }"#;
        assert!(parse_transcript(message).is_none());
    }

    #[test]
    fn test_parse_skips_metadata_messages() {
        let message = r#"{"type": "Metadata", "request_id": "abc"}"#;
        assert!(parse_transcript(message).is_none());

        assert!(parse_transcript("not json at all").is_none());
    }

    #[test]
    fn test_parse_defaults_missing_fields() {
        let message = r#"{"channel": {"alternatives": [{"transcript": "hello"}]}}"#;
        let event = parse_transcript(message).unwrap();
        assert_eq!(event.timestamp, Duration::ZERO);
        assert!(!event.is_final);
    }
}
