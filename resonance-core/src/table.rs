//! Table boundary: validates an input frame and extracts typed observations.
//!
//! Collaborators hand over a column-name → values table. All type checks
//! happen here, before any indicator is computed, so malformed input fails
//! fast with a precise row and column.

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::debug;

use crate::domain::Observation;
use crate::error::ScreenError;

pub const CODE: &str = "code";
pub const DATE: &str = "date";
pub const CLOSE: &str = "close";
pub const VOLUME: &str = "volume";

/// Text layouts accepted for the `date` column, tried in order. Compact
/// `YYYYMMDD` is handled separately.
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

/// Which entry point the table is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Single-instant screen; `date` is optional.
    Snapshot,
    /// Historical replay; `date` is required and must parse on every row.
    Backtest,
}

impl Mode {
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            Mode::Snapshot => &[CODE, CLOSE, VOLUME],
            Mode::Backtest => &[CODE, DATE, CLOSE, VOLUME],
        }
    }
}

/// Fail with `MissingColumn` for the first required column that is absent.
pub fn validate_columns(df: &DataFrame, mode: Mode) -> Result<(), ScreenError> {
    for name in mode.required_columns() {
        if df.get_column_index(name).is_none() {
            return Err(ScreenError::MissingColumn((*name).to_string()));
        }
    }
    Ok(())
}

/// Convert a frame into typed observations, one per row, in row order.
pub fn observations_from_frame(
    df: &DataFrame,
    mode: Mode,
) -> Result<Vec<Observation>, ScreenError> {
    validate_columns(df, mode)?;

    let codes = code_column(df)?;
    let closes = numeric_column(df, CLOSE)?;
    let volumes = numeric_column(df, VOLUME)?;
    let dates = match (mode, df.get_column_index(DATE).is_some()) {
        (Mode::Backtest, _) => date_column(df, true)?,
        (Mode::Snapshot, true) => date_column(df, false)?,
        (Mode::Snapshot, false) => vec![None; df.height()],
    };

    let mut rows = Vec::with_capacity(df.height());
    for (row, (((code, date), close), volume)) in codes
        .into_iter()
        .zip(dates)
        .zip(closes)
        .zip(volumes)
        .enumerate()
    {
        if close <= 0.0 {
            return Err(invalid(CLOSE, row, format!("close must be positive, got {close}")));
        }
        if volume < 0.0 {
            return Err(invalid(VOLUME, row, format!("volume must be non-negative, got {volume}")));
        }
        rows.push(Observation { code, date, close, volume });
    }

    debug!(rows = rows.len(), ?mode, "validated input table");
    Ok(rows)
}

fn invalid(column: &str, row: usize, reason: String) -> ScreenError {
    ScreenError::InvalidValue {
        column: column.to_string(),
        row,
        reason,
    }
}

fn code_column(df: &DataFrame) -> Result<Vec<String>, ScreenError> {
    let series = df.column(CODE)?.as_materialized_series().cast(&DataType::String)?;
    series
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value.map(str::trim) {
            Some(code) if !code.is_empty() => Ok(code.to_string()),
            _ => Err(invalid(CODE, row, "instrument code is empty".into())),
        })
        .collect()
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>, ScreenError> {
    let series = as_f64(df.column(name)?.as_materialized_series())?;
    series
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(v) if v.is_finite() => Ok(v),
            Some(v) => Err(invalid(name, row, format!("non-finite value {v}"))),
            None => Err(invalid(name, row, "missing or non-numeric value".into())),
        })
        .collect()
}

/// Cast to `Float64`. Text cells are trimmed first so padded cells like
/// " 12.5" still parse; anything non-numeric becomes null.
fn as_f64(source: &Series) -> PolarsResult<Series> {
    if source.dtype() == &DataType::String {
        let trimmed: StringChunked = source
            .str()?
            .into_iter()
            .map(|v| v.map(str::trim))
            .collect();
        trimmed.into_series().cast(&DataType::Float64)
    } else {
        source.cast(&DataType::Float64)
    }
}

/// Read a numeric column leniently: nulls and non-numeric cells become `None`.
pub(crate) fn optional_f64_column(
    df: &DataFrame,
    name: &str,
) -> Result<Vec<Option<f64>>, ScreenError> {
    let series = as_f64(df.column(name)?.as_materialized_series())?;
    Ok(series.f64()?.into_iter().collect())
}

/// Extract the `date` column. With `strict`, any unparsable cell is an error;
/// otherwise it becomes `None`.
fn date_column(df: &DataFrame, strict: bool) -> Result<Vec<Option<NaiveDate>>, ScreenError> {
    let series = df.column(DATE)?.as_materialized_series();

    let native = match series.dtype() {
        DataType::Date => Some(series.clone()),
        DataType::Datetime(_, _) => Some(series.cast(&DataType::Date)?),
        _ => None,
    };

    if let Some(dates) = native {
        return dates
            .date()?
            .as_date_iter()
            .enumerate()
            .map(|(row, value)| match value {
                Some(d) => Ok(Some(d)),
                None if strict => Err(ScreenError::UnparsableDate {
                    row,
                    value: String::new(),
                }),
                None => Ok(None),
            })
            .collect();
    }

    let text = series.cast(&DataType::String)?;
    text.str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            let raw = value.unwrap_or("").trim();
            match parse_date(raw) {
                Some(d) => Ok(Some(d)),
                None if strict => Err(ScreenError::UnparsableDate {
                    row,
                    value: raw.to_string(),
                }),
                None => Ok(None),
            }
        })
        .collect()
}

/// Parse a calendar date from the accepted text layouts. Datetimes are
/// truncated to their date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        let year = raw[..4].parse().ok()?;
        let month = raw[4..6].parse().ok()?;
        let day = raw[6..].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}
