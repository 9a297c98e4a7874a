//! Signal and signal log: the backtest output.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Emitted when an observation satisfies the resonance predicate on its date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub date: NaiveDate,
    pub code: String,
    pub close: f64,
}

/// Ordered signals: ascending date, then input row order within a day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalLog {
    signals: Vec<Signal>,
}

impl SignalLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a signal. Callers are responsible for feeding days in order.
    pub fn push(&mut self, signal: Signal) {
        debug_assert!(
            self.signals.last().map_or(true, |last| last.date <= signal.date),
            "signal log must be appended in ascending date order"
        );
        self.signals.push(signal);
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Signal> {
        self.signals.iter()
    }

    pub fn as_slice(&self) -> &[Signal] {
        &self.signals
    }

    /// Signals emitted on one date, in log order.
    pub fn signals_on(&self, date: NaiveDate) -> impl Iterator<Item = &Signal> + '_ {
        self.signals.iter().filter(move |s| s.date == date)
    }

    /// Distinct instrument codes in first-signal order.
    pub fn codes(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.signals
            .iter()
            .filter(|s| seen.insert(s.code.as_str()))
            .map(|s| s.code.as_str())
            .collect()
    }

    /// Backtest output table with exactly `date`, `code`, `close`.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let epoch = chrono::DateTime::UNIX_EPOCH.date_naive();
        let days: Vec<i32> = self
            .signals
            .iter()
            .map(|s| (s.date - epoch).num_days() as i32)
            .collect();
        let codes: Vec<&str> = self.signals.iter().map(|s| s.code.as_str()).collect();
        let closes: Vec<f64> = self.signals.iter().map(|s| s.close).collect();

        let date = Series::new("date".into(), days).cast(&DataType::Date)?;
        DataFrame::new(vec![
            date.into_column(),
            Column::new("code".into(), codes),
            Column::new("close".into(), closes),
        ])
    }
}

impl IntoIterator for SignalLog {
    type Item = Signal;
    type IntoIter = std::vec::IntoIter<Signal>;

    fn into_iter(self) -> Self::IntoIter {
        self.signals.into_iter()
    }
}

impl<'a> IntoIterator for &'a SignalLog {
    type Item = &'a Signal;
    type IntoIter = std::slice::Iter<'a, Signal>;

    fn into_iter(self) -> Self::IntoIter {
        self.signals.iter()
    }
}
