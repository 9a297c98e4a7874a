//! Resonance CLI: snapshot screening and historical backtests.
//!
//! Commands:
//! - `screen`: apply the resonance predicate to an uploaded table
//! - `backtest`: replay the predicate day by day over a trailing window

mod logging;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;

use resonance_runner::{
    load_table, run_backtest, run_screen, save_backtest_artifacts, save_screen_artifacts,
    BacktestReport, LoadOptions, ScreenReport, ScreenerConfig,
};

#[derive(Parser)]
#[command(
    name = "resonance",
    about = "Screen equities whose close clears three moving averages on above-baseline volume"
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen a snapshot table and write the matching rows.
    Screen {
        #[command(flatten)]
        input: InputArgs,

        /// Only screen each instrument's latest-dated row.
        #[arg(long, default_value_t = false)]
        latest_only: bool,

        /// Output directory for result.csv and report.json.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Replay the screen day by day over a trailing window.
    Backtest {
        #[command(flatten)]
        input: InputArgs,

        /// Last date of the window (YYYY-MM-DD). Defaults to the config value, then today.
        #[arg(long)]
        as_of: Option<String>,

        /// Window length in calendar days. Defaults to the config value (90).
        #[arg(long)]
        lookback_days: Option<i64>,

        /// Output directory for backtest.csv and report.json.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    /// Input table (CSV).
    #[arg(long)]
    input: PathBuf,

    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Field separator.
    #[arg(long, default_value_t = ',')]
    separator: char,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.json_logs);

    match cli.command {
        Commands::Screen {
            input,
            latest_only,
            output_dir,
        } => run_screen_cmd(&input, latest_only, &output_dir),
        Commands::Backtest {
            input,
            as_of,
            lookback_days,
            output_dir,
        } => run_backtest_cmd(&input, as_of.as_deref(), lookback_days, &output_dir),
    }
}

fn load_config(path: Option<&Path>) -> Result<ScreenerConfig> {
    match path {
        Some(p) => ScreenerConfig::from_file(p)
            .with_context(|| format!("failed to load config {}", p.display())),
        None => Ok(ScreenerConfig::default()),
    }
}

fn load_options(input: &InputArgs) -> Result<LoadOptions> {
    let separator = u8::try_from(input.separator)
        .ok()
        .filter(u8::is_ascii)
        .with_context(|| {
            format!(
                "separator must be a single ASCII character, got {:?}",
                input.separator
            )
        })?;
    Ok(LoadOptions { separator })
}

fn run_screen_cmd(input: &InputArgs, latest_only: bool, output_dir: &Path) -> Result<()> {
    let mut config = load_config(input.config.as_deref())?;
    if latest_only {
        config.screen.latest_only = true;
    }

    let loaded = load_table(&input.input, &load_options(input)?)?;
    let report = run_screen(&loaded.frame, &config)?;

    print_screen_summary(&report);
    let path = save_screen_artifacts(&report, output_dir)?;
    println!("Result saved to: {}", path.display());
    Ok(())
}

fn run_backtest_cmd(
    input: &InputArgs,
    as_of: Option<&str>,
    lookback_days: Option<i64>,
    output_dir: &Path,
) -> Result<()> {
    let mut config = load_config(input.config.as_deref())?;
    if let Some(days) = lookback_days {
        config.backtest.lookback_days = days;
    }

    let as_of = match as_of {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --as-of date '{s}', expected YYYY-MM-DD"))?,
        None => config
            .backtest
            .as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive()),
    };
    debug!(%as_of, lookback_days = config.backtest.lookback_days, "resolved backtest window");

    let loaded = load_table(&input.input, &load_options(input)?)?;
    let report = run_backtest(&loaded.frame, as_of, &config)?;

    print_backtest_summary(&report)?;
    let path = save_backtest_artifacts(&report, output_dir)?;
    println!("Backtest saved to: {}", path.display());
    Ok(())
}

fn print_screen_summary(report: &ScreenReport) {
    let s = &report.summary;
    println!();
    println!("=== Resonance Screen ===");
    println!("Rows:           {} ({} instruments)", s.input_rows, s.instruments);
    if s.latest_only {
        println!("Screened:       {} (latest row per instrument)", s.screened_rows);
    }
    println!("Matched:        {}", s.matched);
    println!("Dataset:        {}", &s.dataset_hash[..16.min(s.dataset_hash.len())]);
    println!();
    println!("{}", report.table);
}

fn print_backtest_summary(report: &BacktestReport) -> Result<()> {
    println!();
    println!("=== Resonance Backtest ===");
    println!(
        "Window:         {} to {} ({} days lookback)",
        report.window_start, report.as_of, report.lookback_days
    );
    println!(
        "Rows:           {} in window of {} ({} trading days)",
        report.window_rows, report.input_rows, report.trading_days
    );
    println!(
        "Signals:        {} across {} instruments",
        report.signals.len(),
        report.instruments_signalled
    );
    println!();
    println!("{}", report.signals.to_frame()?);
    Ok(())
}
