//! Resonance Runner: configuration, dataset loading, run orchestration, export.
//!
//! This crate builds on `resonance-core` to provide:
//! - TOML configuration with defaults for every section
//! - Delimited-file loading into text-typed tables
//! - Screen and backtest runs with provenance (config id, dataset hash)
//! - CSV and JSON artifacts for both modes

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;

pub use config::{BacktestSection, ConfigError, ScreenSection, ScreenerConfig};
pub use data_loader::{dataset_hash, load_table, LoadError, LoadOptions, LoadedTable};
pub use export::{
    export_signals_csv, export_table_csv, import_backtest_json, save_backtest_artifacts,
    save_screen_artifacts,
};
pub use runner::{
    run_backtest, run_screen, BacktestReport, RunError, ScreenReport, ScreenSummary,
    SCHEMA_VERSION,
};
