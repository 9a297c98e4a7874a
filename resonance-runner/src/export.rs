//! Reporting and export: CSV and JSON artifacts.
//!
//! - **CSV**: the screened table (all input columns plus indicators) and the
//!   signal log (`date,code,close`)
//! - **JSON**: schema-versioned run reports
//!
//! Unknown schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use polars::prelude::*;
use resonance_core::SignalLog;
use tracing::info;

use crate::runner::{BacktestReport, ScreenReport, SCHEMA_VERSION};

/// File names written into the output directory.
pub const SCREEN_TABLE_FILE: &str = "result.csv";
pub const BACKTEST_TABLE_FILE: &str = "backtest.csv";
pub const REPORT_FILE: &str = "report.json";

// ─── CSV export ─────────────────────────────────────────────────────

/// Export any table as CSV with a header row.
pub fn export_table_csv(df: &DataFrame) -> Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    let mut df = df.clone();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(&mut df)
        .context("failed to write table as CSV")?;
    String::from_utf8(buf).context("CSV output is not valid UTF-8")
}

/// Export a signal log as CSV. Columns: date, code, close.
pub fn export_signals_csv(log: &SignalLog) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "code", "close"])?;
    for s in log {
        wtr.write_record([&s.date.to_string(), &s.code, &format!("{:.4}", s.close)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_backtest_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

/// Deserialize a `BacktestReport`, rejecting unknown schema versions.
pub fn import_backtest_json(json: &str) -> Result<BacktestReport> {
    let report: BacktestReport =
        serde_json::from_str(json).context("failed to deserialize BacktestReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `result.csv` and `report.json` for a snapshot screen.
///
/// Returns the path of the CSV file.
pub fn save_screen_artifacts(report: &ScreenReport, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir {}", output_dir.display()))?;

    let table_path = output_dir.join(SCREEN_TABLE_FILE);
    write_file(&table_path, &export_table_csv(&report.table)?)?;

    let summary = serde_json::to_string_pretty(&report.summary)
        .context("failed to serialize ScreenSummary to JSON")?;
    write_file(&output_dir.join(REPORT_FILE), &summary)?;

    info!(path = %table_path.display(), rows = report.table.height(), "saved screen artifacts");
    Ok(table_path)
}

/// Write `backtest.csv` and `report.json` for a backtest.
///
/// Returns the path of the CSV file.
pub fn save_backtest_artifacts(report: &BacktestReport, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir {}", output_dir.display()))?;

    let table_path = output_dir.join(BACKTEST_TABLE_FILE);
    write_file(&table_path, &export_signals_csv(&report.signals)?)?;
    write_file(&output_dir.join(REPORT_FILE), &export_backtest_json(report)?)?;

    info!(path = %table_path.display(), signals = report.signals.len(), "saved backtest artifacts");
    Ok(table_path)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use resonance_core::Signal;

    fn sample_log() -> SignalLog {
        let mut log = SignalLog::new();
        log.push(Signal {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            code: "000001".into(),
            close: 9.87,
        });
        log.push(Signal {
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            code: "600519".into(),
            close: 1700.5,
        });
        log
    }

    fn sample_report() -> BacktestReport {
        BacktestReport {
            schema_version: SCHEMA_VERSION,
            config_id: "cfg".into(),
            dataset_hash: "hash".into(),
            as_of: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            window_start: NaiveDate::from_ymd_opt(2023, 12, 5).unwrap(),
            lookback_days: 90,
            input_rows: 100,
            window_rows: 80,
            trading_days: 40,
            instruments_signalled: 2,
            signals: sample_log(),
        }
    }

    #[test]
    fn signals_csv_has_header_and_rows() {
        let csv = export_signals_csv(&sample_log()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,code,close");
        assert_eq!(lines[1], "2024-03-01,000001,9.8700");
        assert_eq!(lines[2], "2024-03-04,600519,1700.5000");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn empty_log_exports_header_only() {
        let csv = export_signals_csv(&SignalLog::new()).unwrap();
        assert_eq!(csv.trim_end(), "date,code,close");
    }

    #[test]
    fn table_csv_keeps_column_order() {
        let df = df!("code" => &["AAA"], "close" => &[1.5], "ma5" => &[1.25]).unwrap();
        let csv = export_table_csv(&df).unwrap();
        assert_eq!(csv.lines().next(), Some("code,close,ma5"));
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn backtest_json_round_trip() {
        let report = sample_report();
        let json = export_backtest_json(&report).unwrap();
        let back = import_backtest_json(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn future_schema_version_is_rejected() {
        let mut report = sample_report();
        report.schema_version = SCHEMA_VERSION + 1;
        let json = export_backtest_json(&report).unwrap();
        assert!(import_backtest_json(&json).is_err());
    }

    #[test]
    fn missing_schema_version_defaults_to_current() {
        let json = export_backtest_json(&sample_report()).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value.as_object_mut().unwrap().remove("schema_version");
        let back = import_backtest_json(&value.to_string()).unwrap();
        assert_eq!(back.schema_version, SCHEMA_VERSION);
    }
}
