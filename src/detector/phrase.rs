//! End-of-greeting phrase matcher.
//!
//! Scans transcript text case-insensitively for any of the configured
//! canonical phrases ("after the beep", "leave a message", ...).

use std::time::Duration;

/// A transcript fragment that matched a canonical end phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseEvent {
    pub timestamp: Duration,
    /// The canonical phrase that matched.
    pub phrase: String,
    /// The (lowercased) transcript fragment containing it.
    pub full_text: String,
}

/// Matches canonical end phrases against incoming transcript text.
pub struct PhraseDetector {
    phrases: Vec<String>,
    lowered: Vec<String>,
}

impl PhraseDetector {
    pub fn new(phrases: &[String]) -> Self {
        Self {
            phrases: phrases.to_vec(),
            lowered: phrases.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Scans one transcript fragment; returns an event for the first
    /// canonical phrase contained in it.
    pub fn process(&self, text: &str, timestamp: Duration) -> Option<PhraseEvent> {
        let text = text.to_lowercase();

        for (i, lowered) in self.lowered.iter().enumerate() {
            if text.contains(lowered.as_str()) {
                return Some(PhraseEvent {
                    timestamp,
                    phrase: self.phrases[i].clone(),
                    full_text: text,
                });
            }
        }

        None
    }
}
