//! Resonance screener.
//!
//! A row resonates when its close is strictly above all three moving
//! averages and its volume is strictly above the volume baseline. Any
//! undefined indicator means no match. Ties never match.

use polars::prelude::*;
use std::collections::HashMap;
use tracing::debug;

use crate::domain::{IndicatorSet, Observation};
use crate::error::ScreenError;
use crate::indicators::{build_indicators, ResonanceParams};
use crate::table::{self, observations_from_frame, Mode, CLOSE, DATE, VOLUME};

/// The four-condition predicate on one row.
pub fn is_resonant(row: &Observation, indicators: &IndicatorSet) -> bool {
    resonates(
        Some(row.close),
        Some(row.volume),
        [
            indicators.ma_short,
            indicators.ma_medium,
            indicators.ma_long,
            indicators.vol_avg,
        ],
    )
}

fn resonates(close: Option<f64>, volume: Option<f64>, indicators: [Option<f64>; 4]) -> bool {
    // NaN compares false, so it falls out as no match as well.
    let above = |value: Option<f64>, baseline: Option<f64>| match (value, baseline) {
        (Some(v), Some(b)) => v > b,
        _ => false,
    };
    let [ma_short, ma_medium, ma_long, vol_avg] = indicators;
    above(close, ma_short)
        && above(close, ma_medium)
        && above(close, ma_long)
        && above(volume, vol_avg)
}

/// Typed screen: indices of matching rows, in input order, with their indicators.
pub fn screen_rows(
    rows: &[Observation],
    params: &ResonanceParams,
) -> Result<Vec<(usize, IndicatorSet)>, ScreenError> {
    params.validate()?;
    let sets = build_indicators(rows, params);
    Ok(rows
        .iter()
        .zip(sets)
        .enumerate()
        .filter(|(_, (row, set))| is_resonant(row, set))
        .map(|(i, (_, set))| (i, set))
        .collect())
}

/// Screen a snapshot table with the default 5/10/20/5 windows.
pub fn screen(df: &DataFrame) -> Result<DataFrame, ScreenError> {
    screen_with(df, &ResonanceParams::default())
}

/// Screen a snapshot table: all input columns plus the four indicator
/// columns, restricted to resonant rows in input order.
pub fn screen_with(df: &DataFrame, params: &ResonanceParams) -> Result<DataFrame, ScreenError> {
    let augmented = with_indicators(df, params)?;
    filter_resonant(&augmented, params)
}

/// Append the indicator columns to a copy of `df`. Undefined values are null.
/// Existing columns with the same names are replaced.
pub fn with_indicators(df: &DataFrame, params: &ResonanceParams) -> Result<DataFrame, ScreenError> {
    params.validate()?;
    let rows = observations_from_frame(df, Mode::Snapshot)?;
    with_row_indicators(df, &rows, params)
}

/// Like [`with_indicators`], for callers that already hold the typed rows
/// of `df` (one per table row, in table order).
pub fn with_row_indicators(
    df: &DataFrame,
    rows: &[Observation],
    params: &ResonanceParams,
) -> Result<DataFrame, ScreenError> {
    params.validate()?;
    if rows.len() != df.height() {
        return Err(ScreenError::InvalidParams(format!(
            "expected {} typed rows for the table, got {}",
            df.height(),
            rows.len()
        )));
    }
    let sets = build_indicators(rows, params);

    let [short, medium, long, vol] = params.column_names();
    let columns = [
        (short, sets.iter().map(|s| s.ma_short).collect::<Vec<_>>()),
        (medium, sets.iter().map(|s| s.ma_medium).collect()),
        (long, sets.iter().map(|s| s.ma_long).collect()),
        (vol, sets.iter().map(|s| s.vol_avg).collect()),
    ];

    let mut out = df.clone();
    for (name, values) in columns {
        out.with_column(Column::new(name.into(), values))?;
    }
    Ok(out)
}

/// Keep the rows of an indicator-augmented table that satisfy the predicate.
///
/// Indicators are read from the table, not recomputed, so applying this to
/// its own output returns the same table.
pub fn filter_resonant(df: &DataFrame, params: &ResonanceParams) -> Result<DataFrame, ScreenError> {
    let [short, medium, long, vol] = params.column_names();
    for name in [CLOSE, VOLUME, short.as_str(), medium.as_str(), long.as_str(), vol.as_str()] {
        if df.get_column_index(name).is_none() {
            return Err(ScreenError::MissingColumn(name.to_string()));
        }
    }

    let closes = table::optional_f64_column(df, CLOSE)?;
    let volumes = table::optional_f64_column(df, VOLUME)?;
    let ma_short = table::optional_f64_column(df, &short)?;
    let ma_medium = table::optional_f64_column(df, &medium)?;
    let ma_long = table::optional_f64_column(df, &long)?;
    let vol_avg = table::optional_f64_column(df, &vol)?;

    let mask: Vec<bool> = (0..df.height())
        .map(|i| {
            resonates(
                closes[i],
                volumes[i],
                [ma_short[i], ma_medium[i], ma_long[i], vol_avg[i]],
            )
        })
        .collect();

    let matched = mask.iter().filter(|m| **m).count();
    let out = df.filter(&BooleanChunked::from_slice("resonant".into(), &mask))?;
    debug!(rows = df.height(), matched, "applied resonance predicate");
    Ok(out)
}

/// Keep each instrument's latest-dated rows. Tables without a `date`
/// column are returned unchanged. Dates are read as in a snapshot screen:
/// rows whose date does not parse are dropped.
pub fn latest_only(df: &DataFrame) -> Result<DataFrame, ScreenError> {
    if df.get_column_index(DATE).is_none() {
        return Ok(df.clone());
    }

    let rows = observations_from_frame(df, Mode::Snapshot)?;
    let mut latest: HashMap<&str, chrono::NaiveDate> = HashMap::new();
    for row in &rows {
        if let Some(date) = row.date {
            latest
                .entry(row.code.as_str())
                .and_modify(|d| *d = (*d).max(date))
                .or_insert(date);
        }
    }

    let mask: Vec<bool> = rows
        .iter()
        .map(|row| row.date.is_some() && row.date == latest.get(row.code.as_str()).copied())
        .collect();
    Ok(df.filter(&BooleanChunked::from_slice("latest".into(), &mask))?)
}
