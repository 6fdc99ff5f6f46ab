//! Tonal beep detector.
//!
//! Identifies a sustained near-pure tone inside the configured frequency
//! band using short-time spectral analysis, with hysteresis to reject
//! speech formants that briefly peak in-band.

use crate::audio::chunk::AudioChunk;
use crate::config::BeepConfig;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f32::consts::PI;
use std::time::Duration;

/// Chunks shorter than this carry too little spectral information.
const MIN_ANALYSIS_SAMPLES: usize = 64;

/// FFT input is zero-padded to at least this many points.
const MIN_FFT_SIZE: usize = 128;

/// A tone must persist for roughly this long before its trailing edge
/// produces an event; converted to a consecutive-hit count per stream.
const MIN_TRACK_MS: u64 = 150;

/// Maximum relative frequency drift while tracking a tone. Real beeps hold
/// their frequency; speech does not.
const MAX_FREQ_DEVIATION: f32 = 0.15;

/// A spectral peak must exceed the band average by this factor to count as
/// a tone rather than broadband energy.
const TONE_PEAK_RATIO: f32 = 5.0;

/// A detected tone: emitted when its trailing edge is observed, or at
/// stream end if the stream cuts off mid-tone.
#[derive(Debug, Clone, PartialEq)]
pub struct BeepEvent {
    pub start: Duration,
    pub end: Duration,
    /// Representative (smoothed) frequency in Hz.
    pub frequency: f32,
    /// Peak amplitude seen while tracking.
    pub amplitude: f32,
}

/// Online beep detector. Two states: idle and tracking.
pub struct BeepDetector {
    config: BeepConfig,
    sample_rate: u32,
    min_hits: u32,
    planner: FftPlanner<f32>,

    tracking: bool,
    start: Duration,
    frequency: f32,
    amplitude: f32,
    hits: u32,
}

impl BeepDetector {
    pub fn new(config: &BeepConfig, chunk_duration: Duration, sample_rate: u32) -> Self {
        let chunk_ms = chunk_duration.as_millis().max(1) as u64;
        let min_hits = (MIN_TRACK_MS.div_ceil(chunk_ms) as u32).max(5);

        Self {
            config: config.clone(),
            sample_rate,
            min_hits,
            planner: FftPlanner::new(),
            tracking: false,
            start: Duration::ZERO,
            frequency: 0.0,
            amplitude: 0.0,
            hits: 0,
        }
    }

    /// Consecutive beep-like chunks required before a tone qualifies.
    pub fn min_hits(&self) -> u32 {
        self.min_hits
    }

    /// Processes one chunk; returns an event when a qualifying tone's
    /// trailing edge is observed.
    pub fn process(&mut self, chunk: &AudioChunk) -> Option<BeepEvent> {
        if chunk.samples.len() < MIN_ANALYSIS_SAMPLES {
            return None;
        }

        let (freq, amp, is_tone) = self.analyze(&chunk.samples);

        let mut beep_like = is_tone
            && freq >= self.config.min_freq
            && freq <= self.config.max_freq
            && amp >= self.config.min_amplitude;

        // While tracking, require frequency stability.
        if beep_like && self.tracking {
            let deviation = (freq - self.frequency).abs() / self.frequency;
            if deviation > MAX_FREQ_DEVIATION {
                beep_like = false;
            }
        }

        if beep_like {
            if !self.tracking {
                self.start = chunk.timestamp;
                self.frequency = freq;
                self.amplitude = amp;
            }
            self.hits += 1;
            self.tracking = true;
            // Exponential smoothing, favoring the established reference.
            self.frequency = self.frequency * 0.8 + freq * 0.2;
            self.amplitude = self.amplitude.max(amp);
            return None;
        }

        let event = if self.tracking && self.hits >= self.min_hits {
            Some(BeepEvent {
                start: self.start,
                end: chunk.timestamp,
                frequency: self.frequency,
                amplitude: self.amplitude,
            })
        } else {
            None
        };
        self.reset();
        event
    }

    /// Flushes a tone still being tracked when the stream ends.
    pub fn finish(&mut self, at: Duration) -> Option<BeepEvent> {
        let event = if self.tracking && self.hits >= self.min_hits {
            Some(BeepEvent {
                start: self.start,
                end: at,
                frequency: self.frequency,
                amplitude: self.amplitude,
            })
        } else {
            None
        };
        self.reset();
        event
    }

    fn reset(&mut self) {
        self.tracking = false;
        self.hits = 0;
        self.frequency = 0.0;
        self.amplitude = 0.0;
    }

    /// Finds the dominant in-band frequency and decides whether the chunk
    /// is tonal: (frequency, amplitude, is_tone).
    fn analyze(&mut self, samples: &[f32]) -> (f32, f32, bool) {
        let n = samples.len().next_power_of_two().max(MIN_FFT_SIZE);

        // Hann window over the non-padded portion to reduce spectral leakage.
        let window_len = samples.len() as f32;
        let mut buffer: Vec<Complex<f32>> = samples
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                let w = 0.5 * (1.0 - (2.0 * PI * i as f32 / (window_len - 1.0)).cos());
                Complex::new(s * w, 0.0)
            })
            .collect();
        buffer.resize(n, Complex::new(0.0, 0.0));

        let fft = self.planner.plan_fft_forward(n);
        fft.process(&mut buffer);

        let resolution = self.sample_rate as f32 / n as f32;
        let min_bin = ((self.config.min_freq / resolution) as usize).max(1);
        let max_bin = ((self.config.max_freq / resolution) as usize).min(n / 2);
        if max_bin < min_bin {
            return (0.0, 0.0, false);
        }

        let mut peak = 0.0f32;
        let mut peak_bin = 0usize;
        let mut total = 0.0f32;
        for (bin, value) in buffer.iter().enumerate().take(max_bin + 1).skip(min_bin) {
            let magnitude = value.norm();
            total += magnitude;
            if magnitude > peak {
                peak = magnitude;
                peak_bin = bin;
            }
        }

        let frequency = peak_bin as f32 * resolution;
        let amplitude = peak / n as f32 * 2.0;

        // A beep concentrates its energy in a narrow band; speech spreads it.
        let band_mean = total / (max_bin - min_bin + 1) as f32;
        let is_tone = peak >= band_mean * TONE_PEAK_RATIO;

        (frequency, amplitude, is_tone)
    }
}
