//! Signal-fusion decision engine.

pub mod decision;

pub use decision::{Decision, DecisionEngine, Reason, Signal, SignalKind};
