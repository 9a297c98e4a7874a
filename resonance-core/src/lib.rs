//! Resonance Core: typed observations, indicator builder, screener, backtest driver.
//!
//! This crate holds the whole screening pipeline:
//! - Domain types (observations, indicator sets, signals, signal log)
//! - Table boundary: column validation and typed row extraction
//! - Indicator builder: per-instrument rolling means of close and volume
//! - Resonance screener: the four-condition strict predicate
//! - Backtest driver: windowed, date-partitioned replay of the screener
//!
//! Every entry point is a pure function of its inputs. Nothing is cached
//! between calls.

pub mod backtest;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod screen;
pub mod table;

pub use backtest::{
    backtest_rows, backtest_screen, backtest_screen_with, select_window, BacktestWindow,
    DEFAULT_LOOKBACK_DAYS,
};
pub use domain::{IndicatorSet, Observation, Signal, SignalLog};
pub use error::ScreenError;
pub use indicators::{build_indicators, ResonanceParams, RollingMean};
pub use screen::{
    filter_resonant, is_resonant, latest_only, screen, screen_rows, screen_with, with_indicators,
    with_row_indicators,
};
pub use table::{observations_from_frame, Mode};
