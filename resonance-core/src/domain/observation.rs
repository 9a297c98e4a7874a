//! Observation: one instrument on one timestamp.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single validated input row.
///
/// `date` is optional because snapshot screens accept tables without a date
/// column. Backtests reject such tables at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub code: String,
    pub date: Option<NaiveDate>,
    pub close: f64,
    pub volume: f64,
}

impl Observation {
    pub fn new(code: impl Into<String>, date: Option<NaiveDate>, close: f64, volume: f64) -> Self {
        Self {
            code: code.into(),
            date,
            close,
            volume,
        }
    }
}

/// Derived indicators for one observation.
///
/// `None` means the window has not filled yet for this instrument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub ma_short: Option<f64>,
    pub ma_medium: Option<f64>,
    pub ma_long: Option<f64>,
    pub vol_avg: Option<f64>,
}

impl IndicatorSet {
    /// True once every window has enough history.
    pub fn is_complete(&self) -> bool {
        self.ma_short.is_some()
            && self.ma_medium.is_some()
            && self.ma_long.is_some()
            && self.vol_avg.is_some()
    }
}
