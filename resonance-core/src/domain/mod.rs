//! Domain types for the resonance screener

pub mod observation;
pub mod signal;

pub use observation::{IndicatorSet, Observation};
pub use signal::{Signal, SignalLog};
