//! dropcue - voicemail drop-point detection
//!
//! Consumes a mono PCM stream of an answered-machine greeting and decides
//! when a pre-recorded compliant message should be dropped into the call:
//! a tonal beep detector, a sustained-silence detector and an end-phrase
//! matcher feed a priority-based decision engine.

pub mod app;
pub mod audio;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod detector;
pub mod engine;
pub mod error;
pub mod output;
pub mod stt;

pub use config::Config;
pub use engine::{Decision, DecisionEngine, Reason, Signal, SignalKind};
pub use error::{DropcueError, Result};
