//! Backtest driver: replays the screener day by day over a trailing window.
//!
//! Pipeline per call: window filter → indicators (per instrument, over the
//! windowed rows only) → partition by date → predicate per day → signal log.
//!
//! The window is closed on both edges: `as_of - lookback_days <= date <= as_of`.
//! Rows dated after `as_of` are dropped so a replay depends only on its
//! inputs, never on the wall clock.

use chrono::{NaiveDate, TimeDelta};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::domain::{Observation, Signal, SignalLog};
use crate::error::ScreenError;
use crate::indicators::{build_indicators, ResonanceParams};
use crate::screen::is_resonant;
use crate::table::{observations_from_frame, Mode, DATE};

pub const DEFAULT_LOOKBACK_DAYS: i64 = 90;

/// Trailing calendar window ending at `as_of`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestWindow {
    pub as_of: NaiveDate,
    pub lookback_days: i64,
}

impl BacktestWindow {
    pub fn new(as_of: NaiveDate, lookback_days: i64) -> Self {
        Self {
            as_of,
            lookback_days,
        }
    }

    /// Window ending at `as_of` with the default 90-day lookback.
    pub fn ending(as_of: NaiveDate) -> Self {
        Self::new(as_of, DEFAULT_LOOKBACK_DAYS)
    }

    /// First date inside the window (inclusive). Saturates at the earliest
    /// representable date; `validate` rejects windows that would need it.
    pub fn start(&self) -> NaiveDate {
        self.checked_start().unwrap_or(NaiveDate::MIN)
    }

    fn checked_start(&self) -> Option<NaiveDate> {
        TimeDelta::try_days(self.lookback_days).and_then(|span| self.as_of.checked_sub_signed(span))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start() && date <= self.as_of
    }

    pub fn validate(&self) -> Result<(), ScreenError> {
        if self.lookback_days < 0 {
            return Err(ScreenError::InvalidWindow(format!(
                "lookback_days must be >= 0, got {}",
                self.lookback_days
            )));
        }
        if self.checked_start().is_none() {
            return Err(ScreenError::InvalidWindow(format!(
                "lookback_days {} reaches past the earliest representable date from {}",
                self.lookback_days, self.as_of
            )));
        }
        Ok(())
    }
}

/// Backtest a table with the default 5/10/20/5 windows.
pub fn backtest_screen(df: &DataFrame, window: &BacktestWindow) -> Result<SignalLog, ScreenError> {
    backtest_screen_with(df, window, &ResonanceParams::default())
}

pub fn backtest_screen_with(
    df: &DataFrame,
    window: &BacktestWindow,
    params: &ResonanceParams,
) -> Result<SignalLog, ScreenError> {
    window.validate()?;
    params.validate()?;
    let rows = observations_from_frame(df, Mode::Backtest)?;
    backtest_rows(&rows, window, params)
}

/// Rows whose date falls inside the window, in input order.
pub fn select_window(
    rows: &[Observation],
    window: &BacktestWindow,
) -> Result<Vec<Observation>, ScreenError> {
    let mut selected = Vec::new();
    for (row, obs) in rows.iter().enumerate() {
        let date = obs.date.ok_or_else(|| ScreenError::InvalidValue {
            column: DATE.to_string(),
            row,
            reason: "backtest rows need a date".into(),
        })?;
        if window.contains(date) {
            selected.push(obs.clone());
        }
    }
    Ok(selected)
}

/// Typed backtest over already-validated observations.
pub fn backtest_rows(
    rows: &[Observation],
    window: &BacktestWindow,
    params: &ResonanceParams,
) -> Result<SignalLog, ScreenError> {
    window.validate()?;
    params.validate()?;

    let windowed = select_window(rows, window)?;
    let indicators = build_indicators(&windowed, params);

    // Explicit partition: date key → row indices in input order.
    let mut days: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (i, obs) in windowed.iter().enumerate() {
        if let Some(date) = obs.date {
            days.entry(date).or_default().push(i);
        }
    }

    let mut log = SignalLog::new();
    for (date, indices) in &days {
        for &i in indices {
            let obs = &windowed[i];
            if is_resonant(obs, &indicators[i]) {
                log.push(Signal {
                    date: *date,
                    code: obs.code.clone(),
                    close: obs.close,
                });
            }
        }
    }

    debug!(
        window_start = %window.start(),
        as_of = %window.as_of,
        input_rows = rows.len(),
        window_rows = windowed.len(),
        days = days.len(),
        signals = log.len(),
        "backtest replay finished"
    );
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_rows;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let window = BacktestWindow::new(d(2024, 4, 10), 90);
        assert_eq!(window.start(), d(2024, 1, 11));
        assert!(window.contains(d(2024, 1, 11)));
        assert!(window.contains(d(2024, 4, 10)));
        assert!(!window.contains(d(2024, 1, 10)));
        assert!(!window.contains(d(2024, 4, 11)));
    }

    #[test]
    fn default_lookback_is_ninety_days() {
        assert_eq!(BacktestWindow::ending(d(2024, 6, 30)).lookback_days, 90);
    }

    #[test]
    fn negative_lookback_is_rejected() {
        let window = BacktestWindow::new(d(2024, 6, 30), -1);
        assert!(matches!(window.validate(), Err(ScreenError::InvalidWindow(_))));
        let err = backtest_rows(&[], &window, &ResonanceParams::default()).unwrap_err();
        assert!(matches!(err, ScreenError::InvalidWindow(_)));
    }

    #[test]
    fn oversized_lookback_is_rejected_not_panicking() {
        let window = BacktestWindow::new(d(2024, 6, 30), 100_000_000);
        assert!(matches!(window.validate(), Err(ScreenError::InvalidWindow(_))));
        assert_eq!(window.start(), NaiveDate::MIN);

        let rows = make_rows("AAA", &[10.0; 25], &[1.0; 25]);
        let err = backtest_rows(&rows, &window, &ResonanceParams::default()).unwrap_err();
        assert!(matches!(err, ScreenError::InvalidWindow(_)));

        let huge = BacktestWindow::new(d(2024, 6, 30), i64::MAX);
        assert!(matches!(huge.validate(), Err(ScreenError::InvalidWindow(_))));
    }

    #[test]
    fn day_100_window_excludes_days_before_day_10() {
        // Day k is base + (k - 1) days.
        let closes: Vec<f64> = (1..=100).map(|k| k as f64).collect();
        let rows = make_rows("AAA", &closes, &[1.0; 100]);
        let as_of = rows[99].date.unwrap();
        let window = BacktestWindow::new(as_of, 90);

        let selected = select_window(&rows, &window).unwrap();
        assert_eq!(selected.len(), 91);
        assert_eq!(selected.first().unwrap().close, 10.0);
        assert_eq!(selected.last().unwrap().close, 100.0);
    }

    #[test]
    fn undated_rows_are_rejected() {
        let rows = vec![Observation::new("AAA", None, 10.0, 1.0)];
        let window = BacktestWindow::ending(d(2024, 6, 30));
        let err = backtest_rows(&rows, &window, &ResonanceParams::default()).unwrap_err();
        assert!(matches!(err, ScreenError::InvalidValue { ref column, row: 0, .. } if column == "date"));
    }

    #[test]
    fn signals_are_ordered_by_date_then_input_order() {
        // Three instruments with identical rising series; rows shuffled so the
        // input holds later dates first and BBB before AAA.
        let closes: Vec<f64> = (0..22).map(|i| 10.0 + i as f64).collect();
        let volumes: Vec<f64> = (0..22).map(|i| 100.0 + 10.0 * i as f64).collect();
        let mut rows = Vec::new();
        for code in ["BBB", "AAA", "CCC"] {
            rows.extend(make_rows(code, &closes, &volumes));
        }
        rows.reverse();

        let as_of = d(2024, 1, 23);
        let log = backtest_rows(&rows, &BacktestWindow::ending(as_of), &ResonanceParams::default())
            .unwrap();

        // Days 20..=22 of each series match (index 19..=21).
        assert_eq!(log.len(), 9);
        let dates: Vec<NaiveDate> = log.iter().map(|s| s.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);

        // Within a day, input order: reversed input lists CCC, AAA, BBB.
        let first_day: Vec<&str> = log.signals_on(dates[0]).map(|s| s.code.as_str()).collect();
        assert_eq!(first_day, vec!["CCC", "AAA", "BBB"]);
    }

    #[test]
    fn indicators_only_see_windowed_history() {
        // 30 rising observations, window admits only the last 15: ma20 never fills.
        let closes: Vec<f64> = (0..30).map(|i| 10.0 + i as f64).collect();
        let volumes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let rows = make_rows("AAA", &closes, &volumes);
        let as_of = rows[29].date.unwrap();

        let log = backtest_rows(&rows, &BacktestWindow::new(as_of, 14), &ResonanceParams::default())
            .unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn rows_after_as_of_are_ignored() {
        let closes: Vec<f64> = (0..25).map(|i| 10.0 + i as f64).collect();
        let volumes: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let rows = make_rows("AAA", &closes, &volumes);
        let as_of = rows[21].date.unwrap();

        let log = backtest_rows(&rows, &BacktestWindow::ending(as_of), &ResonanceParams::default())
            .unwrap();
        assert!(log.iter().all(|s| s.date <= as_of));
        assert_eq!(log.len(), 3);
    }
}
