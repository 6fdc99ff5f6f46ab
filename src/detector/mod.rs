//! Online detectors driven by the decision engine.
//!
//! Each detector owns its state and communicates only by returning events
//! from per-chunk (or per-transcript) calls.

pub mod beep;
pub mod phrase;
pub mod silence;

pub use beep::{BeepDetector, BeepEvent};
pub use phrase::{PhraseDetector, PhraseEvent};
pub use silence::{SilenceDetector, SilenceEvent};
