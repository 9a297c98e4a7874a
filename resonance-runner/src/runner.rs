//! Screen and backtest runs: wires config, core pipeline and provenance.
//!
//! Two entry points, selected by the caller:
//! - `run_screen()`: snapshot screen of one table.
//! - `run_backtest()`: day-by-day replay over a trailing window.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::info;

use resonance_core::screen::{filter_resonant, latest_only, with_row_indicators};
use resonance_core::table::{observations_from_frame, Mode};
use resonance_core::{backtest_rows, select_window, BacktestWindow, ScreenError, SignalLog};

use crate::config::{ConfigError, ScreenerConfig};
use crate::data_loader::dataset_hash;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("screen error: {0}")]
    Screen(#[from] ScreenError),
    #[error("table error: {0}")]
    Frame(#[from] PolarsError),
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Serializable description of a snapshot screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreenSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config_id: String,
    pub dataset_hash: String,
    pub input_rows: usize,
    pub instruments: usize,
    /// Rows the predicate was applied to (fewer than `input_rows` with `latest_only`).
    pub screened_rows: usize,
    pub matched: usize,
    pub latest_only: bool,
}

/// Snapshot screen output: summary plus the filtered, indicator-augmented table.
#[derive(Debug, Clone)]
pub struct ScreenReport {
    pub summary: ScreenSummary,
    pub table: DataFrame,
}

/// Complete result of a backtest replay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config_id: String,
    pub dataset_hash: String,
    pub as_of: NaiveDate,
    pub window_start: NaiveDate,
    pub lookback_days: i64,
    pub input_rows: usize,
    pub window_rows: usize,
    pub trading_days: usize,
    pub instruments_signalled: usize,
    pub signals: SignalLog,
}

/// Run a snapshot screen over `df`.
pub fn run_screen(df: &DataFrame, config: &ScreenerConfig) -> Result<ScreenReport, RunError> {
    config.validate()?;
    let params = &config.indicators;

    // Validate first so malformed tables never reach the hash or indicators.
    let rows = observations_from_frame(df, Mode::Snapshot)?;
    let instruments = rows
        .iter()
        .map(|r| r.code.as_str())
        .collect::<BTreeSet<_>>()
        .len();

    let augmented = with_row_indicators(df, &rows, params)?;
    let candidates = if config.screen.latest_only {
        latest_only(&augmented)?
    } else {
        augmented
    };
    let table = filter_resonant(&candidates, params)?;

    let summary = ScreenSummary {
        schema_version: SCHEMA_VERSION,
        config_id: config.config_id(),
        dataset_hash: dataset_hash(df)?,
        input_rows: df.height(),
        instruments,
        screened_rows: candidates.height(),
        matched: table.height(),
        latest_only: config.screen.latest_only,
    };
    info!(
        matched = summary.matched,
        screened = summary.screened_rows,
        instruments = summary.instruments,
        "screen complete"
    );

    Ok(ScreenReport { summary, table })
}

/// Run a backtest ending at `as_of`, using the configured lookback.
pub fn run_backtest(
    df: &DataFrame,
    as_of: NaiveDate,
    config: &ScreenerConfig,
) -> Result<BacktestReport, RunError> {
    config.validate()?;
    let window = BacktestWindow::new(as_of, config.backtest.lookback_days);

    window.validate()?;
    let rows = observations_from_frame(df, Mode::Backtest)?;
    let windowed = select_window(&rows, &window)?;
    let trading_days = windowed
        .iter()
        .filter_map(|r| r.date)
        .collect::<BTreeSet<_>>()
        .len();

    let signals = backtest_rows(&rows, &window, &config.indicators)?;
    let instruments_signalled = signals.codes().len();

    let report = BacktestReport {
        schema_version: SCHEMA_VERSION,
        config_id: config.config_id(),
        dataset_hash: dataset_hash(df)?,
        as_of,
        window_start: window.start(),
        lookback_days: window.lookback_days,
        input_rows: rows.len(),
        window_rows: windowed.len(),
        trading_days,
        instruments_signalled,
        signals,
    };
    info!(
        signals = report.signals.len(),
        trading_days = report.trading_days,
        window_start = %report.window_start,
        as_of = %report.as_of,
        "backtest complete"
    );

    Ok(report)
}
