//! Sustained-silence detector.
//!
//! Tracks RMS energy per chunk and distinguishes the end-of-greeting
//! silence from natural intra-speech pauses with a two-tier gate: a silent
//! run first becomes an event after the minimum duration, and is confirmed
//! only once it has been sustained for two full seconds.

use crate::audio::chunk::AudioChunk;
use crate::config::SilenceConfig;
use std::time::Duration;

/// Speech must be this much louder than the silence ceiling. The gap in
/// between is ambiguous and affects neither state.
const SPEECH_THRESHOLD_RATIO: f32 = 3.0;

/// A silent run must persist this long before it is confirmed as
/// end-of-greeting. Calibrated against recorded voicemail greetings.
const SUSTAINED_SILENCE: Duration = Duration::from_secs(2);

/// A silent run in progress. Emitted on every chunk once the run exceeds
/// the minimum duration; `confirmed` latches when the run is sustained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SilenceEvent {
    pub start: Duration,
    pub end: Duration,
    pub duration: Duration,
    pub confirmed: bool,
}

/// Online silence detector backed by per-chunk RMS classification.
pub struct SilenceDetector {
    config: SilenceConfig,
    speech_threshold: f32,

    in_silence: bool,
    had_speech: bool,
    silence_start: Duration,
    potential_end: Option<Duration>,
    confirmed_end: bool,
    last_speech: Duration,
}

impl SilenceDetector {
    pub fn new(config: &SilenceConfig) -> Self {
        Self {
            config: config.clone(),
            speech_threshold: config.threshold * SPEECH_THRESHOLD_RATIO,
            in_silence: false,
            had_speech: false,
            silence_start: Duration::ZERO,
            potential_end: None,
            confirmed_end: false,
            last_speech: Duration::ZERO,
        }
    }

    /// Processes one chunk; returns an event while a qualifying silent run
    /// is in progress.
    pub fn process(&mut self, chunk: &AudioChunk) -> Option<SilenceEvent> {
        let rms = calculate_rms(&chunk.samples);
        let is_silent = rms < self.config.threshold;
        let is_speech = rms >= self.speech_threshold;
        let current_time = chunk.end();

        if is_speech {
            self.had_speech = true;
            self.last_speech = current_time;
        }

        if is_silent {
            if !self.in_silence {
                self.silence_start = chunk.timestamp;
                self.in_silence = true;
            } else {
                let elapsed = current_time.saturating_sub(self.silence_start);

                // Only silence after speech can be the greeting's end.
                if self.had_speech && elapsed >= self.config.min_duration() {
                    let potential = *self.potential_end.get_or_insert(self.silence_start);

                    if current_time.saturating_sub(potential) >= SUSTAINED_SILENCE {
                        self.confirmed_end = true;
                    }

                    return Some(SilenceEvent {
                        start: self.silence_start,
                        end: current_time,
                        duration: elapsed,
                        confirmed: self.confirmed_end,
                    });
                }
            }
        } else {
            // Sound resumed. A short silent run was just a pause.
            if self.in_silence {
                let run = current_time.saturating_sub(self.silence_start);
                if run < SUSTAINED_SILENCE {
                    self.potential_end = None;
                    self.confirmed_end = false;
                }
            }
            self.in_silence = false;
        }

        None
    }

    /// True while the most recent chunk was silent.
    pub fn is_in_silence(&self) -> bool {
        self.in_silence
    }

    /// True once any chunk has been classified as speech.
    pub fn had_speech(&self) -> bool {
        self.had_speech
    }

    /// Timestamp of the most recent speech chunk's end.
    pub fn last_speech(&self) -> Duration {
        self.last_speech
    }
}

/// Root mean square of normalized samples.
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHUNK: Duration = Duration::from_millis(20);
    const CHUNK_SAMPLES: usize = 320;

    fn detector() -> SilenceDetector {
        SilenceDetector::new(&SilenceConfig::default())
    }

    fn chunk_at(index: u64, amplitude: f32) -> AudioChunk {
        AudioChunk::new(vec![amplitude; CHUNK_SAMPLES], CHUNK * index as u32, CHUNK)
    }

    /// Runs `count` chunks of the given amplitude starting at `index`,
    /// returning the last emitted event.
    fn run(
        d: &mut SilenceDetector,
        index: &mut u64,
        count: u64,
        amplitude: f32,
    ) -> Option<SilenceEvent> {
        let mut last = None;
        for _ in 0..count {
            if let Some(event) = d.process(&chunk_at(*index, amplitude)) {
                last = Some(event);
            }
            *index += 1;
        }
        last
    }

    #[test]
    fn test_rms_of_constant_signal() {
        assert!((calculate_rms(&[0.3; 100]) - 0.3).abs() < 1e-6);
        assert_eq!(calculate_rms(&[]), 0.0);
        assert_eq!(calculate_rms(&[0.0; 100]), 0.0);
    }

    #[test]
    fn test_no_event_without_prior_speech() {
        let mut d = detector();
        let mut i = 0;

        // 3 seconds of silence from stream start: never an event.
        assert!(run(&mut d, &mut i, 150, 0.0).is_none());
        assert!(!d.had_speech());
        assert!(d.is_in_silence());
    }

    #[test]
    fn test_event_after_speech_and_min_duration() {
        let mut d = detector();
        let mut i = 0;

        run(&mut d, &mut i, 50, 0.3); // 1s speech
        assert!(d.had_speech());

        // 480ms silence: below the minimum, no event yet.
        assert!(run(&mut d, &mut i, 24, 0.0).is_none());

        // Crossing 500ms elapsed produces an unconfirmed event.
        let event = run(&mut d, &mut i, 1, 0.0).expect("event at 500ms");
        assert_eq!(event.start, Duration::from_secs(1));
        assert_eq!(event.duration, Duration::from_millis(500));
        assert!(!event.confirmed);
    }

    #[test]
    fn test_confirmation_after_two_seconds() {
        let mut d = detector();
        let mut i = 0;

        run(&mut d, &mut i, 50, 0.3); // 1s speech

        // 1.98s of silence: events flow but remain unconfirmed.
        let event = run(&mut d, &mut i, 99, 0.0).unwrap();
        assert!(!event.confirmed);

        // 2s sustained: confirmed latches.
        let event = run(&mut d, &mut i, 1, 0.0).unwrap();
        assert!(event.confirmed);
        assert_eq!(event.start, Duration::from_secs(1));

        // And stays latched while the run continues.
        let event = run(&mut d, &mut i, 10, 0.0).unwrap();
        assert!(event.confirmed);
    }

    #[test]
    fn test_short_pause_resets_confirmation_progress() {
        let mut d = detector();
        let mut i = 0;

        run(&mut d, &mut i, 50, 0.3); // 1s speech
        run(&mut d, &mut i, 60, 0.0); // 1.2s pause, events but unconfirmed
        run(&mut d, &mut i, 50, 0.3); // speech resumes: pause forgotten

        // A fresh silent run must do the full 2s again.
        let event = run(&mut d, &mut i, 99, 0.0).unwrap();
        assert!(!event.confirmed);
        let event = run(&mut d, &mut i, 1, 0.0).unwrap();
        assert!(event.confirmed);
        assert_eq!(event.start, Duration::from_millis(3200));
    }

    #[test]
    fn test_ambiguous_level_neither_breaks_nor_speaks() {
        let mut d = detector();
        let mut i = 0;

        // Ambiguous audio only: between threshold and 3x threshold.
        run(&mut d, &mut i, 50, 0.02);
        assert!(!d.had_speech());
        assert!(!d.is_in_silence());

        run(&mut d, &mut i, 50, 0.3);
        // Silence, then one ambiguous chunk mid-run: the run neither ends
        // nor counts the chunk as speech, and in_silence clears.
        run(&mut d, &mut i, 30, 0.0);
        assert!(d.is_in_silence());
        run(&mut d, &mut i, 1, 0.02);
        assert!(!d.is_in_silence());
    }

    #[test]
    fn test_last_speech_tracks_chunk_end() {
        let mut d = detector();
        let mut i = 0;

        run(&mut d, &mut i, 10, 0.3);
        assert_eq!(d.last_speech(), Duration::from_millis(200));

        run(&mut d, &mut i, 10, 0.0);
        assert_eq!(d.last_speech(), Duration::from_millis(200));
    }
}
