//! Indicator builder.
//!
//! Computes the three close-price moving averages and the volume baseline
//! for every observation. Windows are computed per instrument: a series
//! never borrows values from another `code`.

pub mod rolling;

pub use rolling::RollingMean;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::domain::{IndicatorSet, Observation};
use crate::error::ScreenError;

/// Window lengths for the resonance indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResonanceParams {
    pub short: usize,
    pub medium: usize,
    pub long: usize,
    pub volume: usize,
}

impl Default for ResonanceParams {
    fn default() -> Self {
        Self {
            short: 5,
            medium: 10,
            long: 20,
            volume: 5,
        }
    }
}

impl ResonanceParams {
    pub fn validate(&self) -> Result<(), ScreenError> {
        for (label, period) in [
            ("short", self.short),
            ("medium", self.medium),
            ("long", self.long),
            ("volume", self.volume),
        ] {
            if period == 0 {
                return Err(ScreenError::InvalidParams(format!(
                    "{label} window must be >= 1"
                )));
            }
        }
        Ok(())
    }

    /// Output column names: `ma{short}`, `ma{medium}`, `ma{long}`, `volAvg{volume}`.
    pub fn column_names(&self) -> [String; 4] {
        [
            RollingMean::close(self.short).name().to_string(),
            RollingMean::close(self.medium).name().to_string(),
            RollingMean::close(self.long).name().to_string(),
            RollingMean::volume(self.volume).name().to_string(),
        ]
    }

    /// Observations an instrument needs before it can match at all.
    pub fn warmup(&self) -> usize {
        self.short.max(self.medium).max(self.long).max(self.volume)
    }
}

/// Compute indicators for every row, returned in input row order.
///
/// Rows are grouped by `code` and each group is ordered by date before the
/// windows run. A group containing any undated row is taken in input order.
///
/// Panics if any window in `params` is zero; call `ResonanceParams::validate`
/// first.
pub fn build_indicators(rows: &[Observation], params: &ResonanceParams) -> Vec<IndicatorSet> {
    let short = RollingMean::close(params.short);
    let medium = RollingMean::close(params.medium);
    let long = RollingMean::close(params.long);
    let vol = RollingMean::volume(params.volume);

    let groups = group_by_code(rows);
    let mut result = vec![IndicatorSet::default(); rows.len()];

    for indices in groups.values() {
        let mut ordered = indices.clone();
        if ordered.iter().all(|&i| rows[i].date.is_some()) {
            ordered.sort_by_key(|&i| rows[i].date);
        }

        let closes: Vec<f64> = ordered.iter().map(|&i| rows[i].close).collect();
        let volumes: Vec<f64> = ordered.iter().map(|&i| rows[i].volume).collect();

        let ma_short = short.compute(&closes);
        let ma_medium = medium.compute(&closes);
        let ma_long = long.compute(&closes);
        let vol_avg = vol.compute(&volumes);

        for (pos, &row) in ordered.iter().enumerate() {
            result[row] = IndicatorSet {
                ma_short: ma_short[pos],
                ma_medium: ma_medium[pos],
                ma_long: ma_long[pos],
                vol_avg: vol_avg[pos],
            };
        }
    }

    debug!(
        rows = rows.len(),
        instruments = groups.len(),
        complete = result.iter().filter(|s| s.is_complete()).count(),
        "built indicators"
    );
    result
}

/// Row indices per instrument code.
fn group_by_code(rows: &[Observation]) -> HashMap<&str, Vec<usize>> {
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        groups.entry(row.code.as_str()).or_default().push(i);
    }
    groups
}

/// Create dated observations for one instrument from close prices.
///
/// Dates start at 2024-01-02 and advance one calendar day per row.
#[cfg(test)]
pub fn make_rows(code: &str, closes: &[f64], volumes: &[f64]) -> Vec<Observation> {
    assert_eq!(closes.len(), volumes.len());
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&close, &volume))| {
            Observation::new(
                code,
                Some(base_date + chrono::Duration::days(i as i64)),
                close,
                volume,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 10.0 + i as f64).collect()
    }

    #[test]
    fn default_params_match_classic_windows() {
        let params = ResonanceParams::default();
        assert_eq!(params.column_names(), ["ma5", "ma10", "ma20", "volAvg5"]);
        assert_eq!(params.warmup(), 20);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn zero_window_is_rejected() {
        let params = ResonanceParams {
            long: 0,
            ..ResonanceParams::default()
        };
        assert!(matches!(params.validate(), Err(ScreenError::InvalidParams(_))));
    }

    #[test]
    fn single_instrument_windows_fill_in_order() {
        let rows = make_rows("AAA", &rising(25), &[1000.0; 25]);
        let sets = build_indicators(&rows, &ResonanceParams::default());

        assert!(sets[3].ma_short.is_none());
        assert!(sets[4].ma_short.is_some());
        assert!(sets[8].ma_medium.is_none());
        assert!(sets[9].ma_medium.is_some());
        assert!(sets[18].ma_long.is_none());
        assert!(sets[19].is_complete());
        // ma20 at index 19 = mean(10..=29) = 19.5
        assert_approx(sets[19].ma_long.unwrap(), 19.5, DEFAULT_EPSILON);
        assert_approx(sets[24].vol_avg.unwrap(), 1000.0, DEFAULT_EPSILON);
    }

    #[test]
    fn interleaved_instruments_do_not_share_windows() {
        let a = make_rows("AAA", &rising(6), &[100.0; 6]);
        let b = make_rows("BBB", &[50.0; 6], &[7.0; 6]);
        let mut mixed = Vec::new();
        for (ra, rb) in a.iter().zip(&b) {
            mixed.push(ra.clone());
            mixed.push(rb.clone());
        }

        let sets = build_indicators(&mixed, &ResonanceParams::default());
        // Row 8 is AAA's 5th observation: mean(10..=14) = 12
        assert_approx(sets[8].ma_short.unwrap(), 12.0, DEFAULT_EPSILON);
        assert_approx(sets[9].ma_short.unwrap(), 50.0, DEFAULT_EPSILON);
        assert_approx(sets[9].vol_avg.unwrap(), 7.0, DEFAULT_EPSILON);
        assert!(sets[7].ma_short.is_none());
    }

    #[test]
    fn unsorted_dates_are_ordered_before_windowing() {
        let mut rows = make_rows("AAA", &rising(5), &[1.0; 5]);
        rows.reverse();
        let sets = build_indicators(&rows, &ResonanceParams::default());

        // After reversal the latest observation sits at row 0.
        assert_approx(sets[0].ma_short.unwrap(), 12.0, DEFAULT_EPSILON);
        assert!(sets[1..].iter().all(|s| s.ma_short.is_none()));
    }

    #[test]
    fn undated_rows_use_input_order() {
        let rows: Vec<Observation> = rising(5)
            .into_iter()
            .map(|c| Observation::new("AAA", None, c, 1.0))
            .collect();
        let sets = build_indicators(&rows, &ResonanceParams::default());
        assert_approx(sets[4].ma_short.unwrap(), 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn input_rows_are_not_mutated() {
        let rows = make_rows("AAA", &rising(10), &[1.0; 10]);
        let before = rows.clone();
        let _ = build_indicators(&rows, &ResonanceParams::default());
        assert_eq!(rows, before);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(build_indicators(&[], &ResonanceParams::default()).is_empty());
    }
}
