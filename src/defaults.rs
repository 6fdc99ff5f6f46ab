//! Default configuration constants for dropcue.
//!
//! This module provides shared constants used across the configuration types
//! to ensure consistency and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for telephony speech processing and matches what
/// the transcription vendor expects for linear PCM streams.
pub const SAMPLE_RATE: u32 = 16000;

/// Nominal chunk duration in milliseconds.
///
/// 20ms chunks keep detector latency low while leaving enough samples per
/// chunk for meaningful spectral analysis at telephony sample rates.
pub const CHUNK_DURATION_MS: u64 = 20;

/// Lower edge of the beep frequency band in Hz.
pub const BEEP_MIN_FREQ: f32 = 600.0;

/// Upper edge of the beep frequency band in Hz.
///
/// Voicemail beeps sit between 600 and 2500 Hz across carriers; energy
/// outside this band is never considered tonal evidence.
pub const BEEP_MAX_FREQ: f32 = 2500.0;

/// Minimum beep length in milliseconds.
///
/// Advisory: the beep detector enforces its own consecutive-hit floor
/// derived from the chunk duration, which works out to roughly 150ms.
pub const BEEP_MIN_DURATION_MS: u64 = 300;

/// Amplitude floor for a spectral peak to count as a beep.
pub const BEEP_MIN_AMPLITUDE: f32 = 0.02;

/// RMS ceiling below which a chunk is classified as silent.
///
/// Normalized units (0.0 to 1.0). Chunks between this and three times this
/// value are ambiguous: they neither count as speech nor break silence.
pub const SILENCE_THRESHOLD: f32 = 0.01;

/// Minimum elapsed silence in milliseconds before a silence event is emitted.
///
/// Filters the natural 200-600ms pauses inside a spoken greeting.
pub const SILENCE_MIN_DURATION_MS: u64 = 500;

/// How long to wait after confirmed silence for a beep, in milliseconds.
pub const BEEP_WAIT_TIMEOUT_MS: u64 = 2000;

/// Canonical end-of-greeting phrases matched against transcripts.
pub const END_PHRASES: [&str; 15] = [
    "after the beep",
    "after the tone",
    "leave a message",
    "leave your message",
    "leave your name",
    "leave your number",
    "record your message",
    "at the tone",
    "at the beep",
    "please leave",
    "brief message",
    "please leave a message",
    "you may leave",
    "record a message",
    "your message after",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_phrases_are_lowercase() {
        for phrase in END_PHRASES {
            assert_eq!(phrase, phrase.to_lowercase());
        }
    }

    #[test]
    fn beep_band_is_ordered() {
        assert!(BEEP_MIN_FREQ < BEEP_MAX_FREQ);
        assert!(SILENCE_THRESHOLD > 0.0);
    }
}
