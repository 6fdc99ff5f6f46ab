//! Fuses beep, silence and phrase evidence into one drop-time decision.
//!
//! The engine drives the chunk stream through the detectors, consumes
//! transcript events as they arrive, and applies a fixed priority policy.
//! A confirmed beep is definitive and always wins; phrase and silence
//! evidence combine with timeouts below it. If nothing fires by stream
//! end, a fallback hierarchy guarantees exactly one decision per stream.

use crate::audio::chunk::AudioChunk;
use crate::config::Config;
use crate::detector::beep::{BeepDetector, BeepEvent};
use crate::detector::phrase::PhraseDetector;
use crate::detector::silence::SilenceDetector;
use crate::stt::{SttAdapter, TranscriptEvent};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// A beep only counts once this much time passes after its trailing edge
/// with no resumed speech. Intermediate beeps (speech resumes sooner) are
/// discarded.
pub const POST_BEEP_VERIFY: Duration = Duration::from_millis(500);

/// Grace period after stream end for final transcripts, when STT is live.
const STT_SETTLE: Duration = Duration::from_secs(2);

/// Drop offset past a confirmed beep's trailing edge.
const DROP_AFTER_BEEP: Duration = Duration::from_millis(50);

/// Drop offset into a confirmed silent run.
const DROP_INTO_SILENCE: Duration = Duration::from_millis(200);

/// Wait after confirmed silence when a phrase promised no beep.
const PHRASE_SILENCE_WAIT: Duration = Duration::from_secs(1);

/// Wait after confirmed silence when a phrase promised a beep.
const EXPECTED_BEEP_WAIT: Duration = Duration::from_secs(5);

/// Drop offset past a phrase match when it is the only evidence.
const PHRASE_ONLY_DELAY: Duration = Duration::from_secs(1);

/// Share of the stream to skip when no detector fired at all.
const FALLBACK_RATIO: f64 = 0.9;

/// Evidence category of a recorded signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Beep,
    Silence,
    Phrase,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Beep => write!(f, "beep"),
            SignalKind::Silence => write!(f, "silence"),
            SignalKind::Phrase => write!(f, "phrase"),
        }
    }
}

/// One piece of evidence accumulated while processing a stream.
#[derive(Debug, Clone)]
pub struct Signal {
    pub kind: SignalKind,
    pub timestamp: Duration,
    pub details: String,
}

/// Why a drop time was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    BeepConfirmed,
    PhraseSilence,
    PhraseBeepTimeout,
    SilenceTimeout,
    BeepAtEnd,
    SilenceNoBeep,
    PhraseOnly,
    FallbackNinetyPercent,
}

impl Reason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Reason::BeepConfirmed => "BEEP_CONFIRMED",
            Reason::PhraseSilence => "PHRASE_SILENCE",
            Reason::PhraseBeepTimeout => "PHRASE_BEEP_TIMEOUT",
            Reason::SilenceTimeout => "SILENCE_TIMEOUT",
            Reason::BeepAtEnd => "BEEP_AT_END",
            Reason::SilenceNoBeep => "SILENCE_NO_BEEP",
            Reason::PhraseOnly => "PHRASE_ONLY",
            Reason::FallbackNinetyPercent => "FALLBACK_90PCT",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Reason::BeepConfirmed => {
                "Beep detected and confirmed (no speech resumed) - dropping after beep"
            }
            Reason::PhraseSilence => "End phrase + silence detected (no beep expected) - dropping",
            Reason::PhraseBeepTimeout => "Phrase indicated beep expected, wait expired - dropping",
            Reason::SilenceTimeout => "Confirmed silence and no beep within the wait - dropping",
            Reason::BeepAtEnd => "Beep detected at end - dropping after beep",
            Reason::SilenceNoBeep => "Silence after speech - no beep detected",
            Reason::PhraseOnly => "End phrase detected",
            Reason::FallbackNinetyPercent => "No clear signal - using fallback (90% of duration)",
        };
        write!(f, "{}", text)
    }
}

/// The engine's single output per stream.
#[derive(Debug, Clone)]
pub struct Decision {
    /// Stream-relative instant at which the compliant message should start.
    pub recommended_drop_time: Duration,
    pub reason: Reason,
    pub signals: Vec<Signal>,
    pub transcript: String,
    /// Stream offset at which the decision was committed.
    pub decision_made_at: Duration,
    /// Time between the earliest end-of-greeting evidence and the decision.
    pub dead_air: Duration,
}

/// Drives the detectors over a chunk stream and emits exactly one
/// [`Decision`].
pub struct DecisionEngine {
    config: Config,
    beep_detector: BeepDetector,
    silence_detector: SilenceDetector,
    phrase_detector: PhraseDetector,

    signals: Vec<Signal>,
    transcript: String,
    beep_detected: Option<BeepEvent>,
    beep_confirmed_at: Option<Duration>,
    first_silence_at: Option<Duration>,
    phrase_found: bool,
    expects_beep: bool,
    phrase_time: Option<Duration>,

    last_chunk_end: Duration,
    decision: Option<Decision>,
}

impl DecisionEngine {
    pub fn new(config: &Config, sample_rate: u32) -> Self {
        Self {
            beep_detector: BeepDetector::new(
                &config.beep,
                config.audio.chunk_duration(),
                sample_rate,
            ),
            silence_detector: SilenceDetector::new(&config.silence),
            phrase_detector: PhraseDetector::new(&config.stt.end_phrases),
            config: config.clone(),
            signals: Vec::new(),
            transcript: String::new(),
            beep_detected: None,
            beep_confirmed_at: None,
            first_silence_at: None,
            phrase_found: false,
            expects_beep: false,
            phrase_time: None,
            last_chunk_end: Duration::ZERO,
            decision: None,
        }
    }

    /// Consumes the chunk stream (and transcript events, when STT is live)
    /// and produces the stream's one decision.
    pub async fn run(
        mut self,
        mut chunks: mpsc::Receiver<AudioChunk>,
        mut stt: Option<SttAdapter>,
    ) -> Decision {
        let mut transcripts = stt.as_mut().and_then(|adapter| adapter.take_events());

        loop {
            tokio::select! {
                // Drain transcripts eagerly so phrase state is visible to
                // the next chunk evaluation.
                biased;

                event = async { transcripts.as_mut().unwrap().recv().await },
                    if transcripts.is_some() =>
                {
                    match event {
                        Some(event) => {
                            self.process_transcript(event);
                            self.check_rules(self.last_chunk_end);
                        }
                        None => transcripts = None,
                    }
                }

                chunk = chunks.recv() => {
                    match chunk {
                        Some(chunk) => {
                            self.process_chunk(&chunk, stt.as_ref());
                            self.check_rules(self.last_chunk_end);
                        }
                        None => break,
                    }
                }
            }

            if self.decision.is_some() {
                break;
            }
        }

        // A tone still in progress at cutoff is evidence too.
        if self.decision.is_none()
            && let Some(event) = self.beep_detector.finish(self.last_chunk_end)
        {
            self.record_beep(event);
        }

        // Let the backend flush final transcripts before falling back.
        if self.decision.is_none()
            && stt.is_some()
            && let Some(mut events) = transcripts.take()
        {
            let deadline = tokio::time::Instant::now() + STT_SETTLE;
            while self.decision.is_none() {
                match tokio::time::timeout_at(deadline, events.recv()).await {
                    Ok(Some(event)) => {
                        self.process_transcript(event);
                        self.check_rules(self.last_chunk_end);
                    }
                    Ok(None) | Err(_) => break,
                }
            }
        }

        if let Some(mut adapter) = stt {
            adapter.close();
        }

        if self.decision.is_none() {
            self.final_decision();
        }
        self.decision.expect("decision is always set by fallback")
    }

    /// Per-chunk work, in fixed order: beep, silence, beep verification,
    /// STT forward. Rule evaluation happens in the caller.
    fn process_chunk(&mut self, chunk: &AudioChunk, stt: Option<&SttAdapter>) {
        self.last_chunk_end = chunk.end();

        if let Some(event) = self.beep_detector.process(chunk) {
            self.record_beep(event);
        }

        let silence_event = self.silence_detector.process(chunk);
        if let Some(ref event) = silence_event
            && event.confirmed
            && self.first_silence_at.is_none()
        {
            self.first_silence_at = Some(event.start);
            self.signals.push(Signal {
                kind: SignalKind::Silence,
                timestamp: event.start,
                details: format!("confirmed silence, duration={:.2}s", event.duration.as_secs_f32()),
            });
        }

        // Post-beep verification: speech resuming inside the window means
        // the tone was intermediate, not the greeting's end.
        if let Some(beep) = &self.beep_detected
            && self.beep_confirmed_at.is_none()
        {
            let since_beep = chunk.timestamp.saturating_sub(beep.end);

            if since_beep > Duration::ZERO && since_beep < POST_BEEP_VERIFY {
                if silence_event.is_none() && !self.silence_detector.is_in_silence() {
                    debug!(at = ?chunk.timestamp, "speech resumed after beep; discarding");
                    self.signals.push(Signal {
                        kind: SignalKind::Beep,
                        timestamp: chunk.timestamp,
                        details: "intermediate beep - speech resumed, ignoring".to_string(),
                    });
                    self.beep_detected = None;
                }
            } else if since_beep >= POST_BEEP_VERIFY {
                self.beep_confirmed_at = Some(chunk.timestamp);
            }
        }

        if let Some(adapter) = stt {
            adapter.send_audio(&chunk.samples);
        }
    }

    fn record_beep(&mut self, event: BeepEvent) {
        self.signals.push(Signal {
            kind: SignalKind::Beep,
            timestamp: event.end,
            details: format!(
                "freq={:.0}Hz, duration={:.2}s",
                event.frequency,
                event.end.saturating_sub(event.start).as_secs_f32()
            ),
        });
        self.beep_detected = Some(event);
        self.beep_confirmed_at = None;
    }

    /// Folds one transcript fragment into engine state.
    fn process_transcript(&mut self, event: TranscriptEvent) {
        if !self.transcript.is_empty() {
            self.transcript.push(' ');
        }
        self.transcript.push_str(&event.text);

        if let Some(matched) = self.phrase_detector.process(&event.text, event.timestamp) {
            self.phrase_found = true;
            if self.phrase_time.is_none() {
                self.phrase_time = Some(matched.timestamp);
            }

            let phrase = matched.phrase.to_lowercase();
            if phrase.contains("beep") || phrase.contains("tone") {
                self.expects_beep = true;
            }

            self.signals.push(Signal {
                kind: SignalKind::Phrase,
                timestamp: matched.timestamp,
                details: format!("matched: '{}'", matched.phrase),
            });
        }
    }

    /// Evaluates the priority table; first match commits the decision.
    fn check_rules(&mut self, now: Duration) {
        if self.decision.is_some() {
            return;
        }

        // Priority 1: a verified beep is definitive.
        if let Some(beep) = &self.beep_detected
            && self.beep_confirmed_at.is_some()
        {
            let drop_time = beep.end + DROP_AFTER_BEEP;
            self.commit(drop_time, Reason::BeepConfirmed, now);
            return;
        }

        // Priority 2: phrase promised no beep, silence confirmed.
        if self.phrase_found
            && !self.expects_beep
            && let Some(first_silence) = self.first_silence_at
            && now.saturating_sub(first_silence) >= PHRASE_SILENCE_WAIT
        {
            self.commit(first_silence + DROP_INTO_SILENCE, Reason::PhraseSilence, now);
            return;
        }

        // Priority 3: phrase promised a beep; give it longer to arrive.
        if self.expects_beep
            && let Some(first_silence) = self.first_silence_at
            && now.saturating_sub(first_silence) >= EXPECTED_BEEP_WAIT
        {
            self.commit(
                first_silence + DROP_INTO_SILENCE,
                Reason::PhraseBeepTimeout,
                now,
            );
            return;
        }

        // Priority 4: confirmed silence, no phrase guidance, wait expired.
        if !self.expects_beep
            && self.silence_detector.had_speech()
            && let Some(first_silence) = self.first_silence_at
            && now.saturating_sub(first_silence) >= self.config.engine.beep_wait_timeout()
        {
            self.commit(first_silence + DROP_INTO_SILENCE, Reason::SilenceTimeout, now);
        }
    }

    /// Applied once the stream (and settling) ends with no rule fired.
    fn final_decision(&mut self) {
        let total = self.last_chunk_end;

        let (drop_time, reason) = if let Some(beep) = &self.beep_detected {
            (beep.end + DROP_AFTER_BEEP, Reason::BeepAtEnd)
        } else if let Some(first_silence) = self.first_silence_at
            && self.silence_detector.had_speech()
        {
            (first_silence + DROP_INTO_SILENCE, Reason::SilenceNoBeep)
        } else if self.phrase_found
            && let Some(phrase_time) = self.phrase_time
        {
            (phrase_time + PHRASE_ONLY_DELAY, Reason::PhraseOnly)
        } else {
            (total.mul_f64(FALLBACK_RATIO), Reason::FallbackNinetyPercent)
        };

        self.commit(drop_time, reason, total);
    }

    fn commit(&mut self, drop_time: Duration, reason: Reason, at: Duration) {
        let dead_air = self
            .earliest_evidence()
            .map(|evidence| at.saturating_sub(evidence))
            .unwrap_or_default();

        self.decision = Some(Decision {
            recommended_drop_time: drop_time,
            reason,
            signals: std::mem::take(&mut self.signals),
            transcript: std::mem::take(&mut self.transcript),
            decision_made_at: at,
            dead_air,
        });
    }

    /// Earliest end-of-greeting evidence: confirmed silence start or beep
    /// trailing edge, whichever came first.
    fn earliest_evidence(&self) -> Option<Duration> {
        let beep_end = self.beep_detected.as_ref().map(|b| b.end);
        match (self.first_silence_at, beep_end) {
            (Some(silence), Some(beep)) => Some(silence.min(beep)),
            (Some(silence), None) => Some(silence),
            (None, Some(beep)) => Some(beep),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHUNK: Duration = Duration::from_millis(20);
    const CHUNK_SAMPLES: usize = 320;

    fn engine() -> DecisionEngine {
        DecisionEngine::new(&Config::default(), 16000)
    }

    fn chunk_at(index: u64, amplitude: f32) -> AudioChunk {
        AudioChunk::new(vec![amplitude; CHUNK_SAMPLES], CHUNK * index as u32, CHUNK)
    }

    fn feed(engine: &mut DecisionEngine, index: &mut u64, count: u64, amplitude: f32) {
        for _ in 0..count {
            let chunk = chunk_at(*index, amplitude);
            engine.process_chunk(&chunk, None);
            engine.check_rules(engine.last_chunk_end);
            *index += 1;
            if engine.decision.is_some() {
                return;
            }
        }
    }

    fn transcript(text: &str, at_secs: f64) -> TranscriptEvent {
        TranscriptEvent {
            text: text.to_string(),
            timestamp: Duration::from_secs_f64(at_secs),
            is_final: true,
        }
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(Reason::BeepConfirmed.code(), "BEEP_CONFIRMED");
        assert_eq!(Reason::PhraseSilence.code(), "PHRASE_SILENCE");
        assert_eq!(Reason::PhraseBeepTimeout.code(), "PHRASE_BEEP_TIMEOUT");
        assert_eq!(Reason::SilenceTimeout.code(), "SILENCE_TIMEOUT");
        assert_eq!(Reason::BeepAtEnd.code(), "BEEP_AT_END");
        assert_eq!(Reason::SilenceNoBeep.code(), "SILENCE_NO_BEEP");
        assert_eq!(Reason::PhraseOnly.code(), "PHRASE_ONLY");
        assert_eq!(Reason::FallbackNinetyPercent.code(), "FALLBACK_90PCT");
    }

    #[test]
    fn test_silence_timeout_rule() {
        let mut e = engine();
        let mut i = 0;

        feed(&mut e, &mut i, 100, 0.3); // 2s speech
        feed(&mut e, &mut i, 250, 0.0); // up to 5s silence

        let decision = e.decision.expect("rule 4 fires");
        assert_eq!(decision.reason, Reason::SilenceTimeout);
        // Silence confirmed at 4s (2s sustained), wait expires at 4s too
        // since confirmation already took 2s.
        assert_eq!(decision.recommended_drop_time, Duration::from_millis(2200));
        assert_eq!(decision.decision_made_at, Duration::from_secs(4));
        assert_eq!(decision.dead_air, Duration::from_secs(2));
    }

    #[test]
    fn test_phrase_blocks_silence_timeout_when_beep_expected() {
        let mut e = engine();
        let mut i = 0;

        e.process_transcript(transcript("please leave a message after the beep", 1.5));
        assert!(e.expects_beep);

        feed(&mut e, &mut i, 100, 0.3); // 2s speech
        feed(&mut e, &mut i, 200, 0.0); // 4s silence: rule 4 must stay quiet

        assert!(e.decision.is_none());

        feed(&mut e, &mut i, 150, 0.0); // past the 5s expected-beep wait
        let decision = e.decision.expect("rule 3 fires");
        assert_eq!(decision.reason, Reason::PhraseBeepTimeout);
        assert_eq!(decision.recommended_drop_time, Duration::from_millis(2200));
    }

    #[test]
    fn test_phrase_silence_rule_fires_quickly() {
        let mut e = engine();
        let mut i = 0;

        e.process_transcript(transcript("please leave your message", 1.0));
        assert!(e.phrase_found);
        assert!(!e.expects_beep);

        feed(&mut e, &mut i, 100, 0.3); // 2s speech
        feed(&mut e, &mut i, 101, 0.0); // silence to confirmation at 4.02s

        let decision = e.decision.expect("rule 2 fires at confirmation");
        assert_eq!(decision.reason, Reason::PhraseSilence);
        assert_eq!(decision.recommended_drop_time, Duration::from_millis(2200));
    }

    #[test]
    fn test_transcript_accumulates_in_order() {
        let mut e = engine();
        e.process_transcript(transcript("Hi, you've reached", 0.5));
        e.process_transcript(transcript("the voicemail of Pat.", 1.2));
        assert_eq!(e.transcript, "Hi, you've reached the voicemail of Pat.");
    }

    #[test]
    fn test_phrase_time_keeps_first_match() {
        let mut e = engine();
        e.process_transcript(transcript("please leave a message", 2.0));
        e.process_transcript(transcript("leave a message after the beep", 3.0));

        assert_eq!(e.phrase_time, Some(Duration::from_secs(2)));
        // The later match still updates the beep expectation.
        assert!(e.expects_beep);
    }

    #[test]
    fn test_fallback_without_any_signal() {
        let mut e = engine();
        let mut i = 0;

        feed(&mut e, &mut i, 100, 0.3); // 2s pure speech, then stream ends
        assert!(e.decision.is_none());

        e.final_decision();
        let decision = e.decision.unwrap();
        assert_eq!(decision.reason, Reason::FallbackNinetyPercent);
        assert_eq!(decision.recommended_drop_time, Duration::from_millis(1800));
        assert_eq!(decision.dead_air, Duration::ZERO);
    }

    #[test]
    fn test_fallback_phrase_only() {
        let mut e = engine();
        let mut i = 0;

        e.process_transcript(transcript("leave a message", 1.5));
        feed(&mut e, &mut i, 100, 0.3); // speech only, no silence

        e.final_decision();
        let decision = e.decision.unwrap();
        assert_eq!(decision.reason, Reason::PhraseOnly);
        assert_eq!(decision.recommended_drop_time, Duration::from_millis(2500));
    }

    #[test]
    fn test_signals_precede_decision_instant() {
        let mut e = engine();
        let mut i = 0;

        feed(&mut e, &mut i, 100, 0.3);
        feed(&mut e, &mut i, 250, 0.0);

        let decision = e.decision.unwrap();
        assert!(!decision.signals.is_empty());
        for signal in &decision.signals {
            assert!(signal.timestamp <= decision.decision_made_at);
        }
    }

    #[tokio::test]
    async fn test_run_emits_exactly_one_decision() {
        use crate::audio::{ChunkStreamer, StreamParams};

        let mut samples = vec![0.3f32; 16000 * 2]; // 2s speech
        samples.extend(vec![0.0f32; 16000 * 5]); // 5s silence
        let params = StreamParams::new(16000, CHUNK);
        let streamer = ChunkStreamer::new(samples, params);

        let engine = DecisionEngine::new(&Config::default(), 16000);
        let decision = engine.run(streamer.stream(false), None).await;

        assert_eq!(decision.reason, Reason::SilenceTimeout);
        assert_eq!(decision.recommended_drop_time, Duration::from_millis(2200));
    }
}
