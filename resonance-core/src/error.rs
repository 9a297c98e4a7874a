//! Error taxonomy for the screening pipeline.
//!
//! Short histories and empty results are not errors: they surface as
//! "no match" rows and empty tables respectively.

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("unparsable date at row {row}: {value:?}")]
    UnparsableDate { row: usize, value: String },

    #[error("invalid value in column {column} at row {row}: {reason}")]
    InvalidValue {
        column: String,
        row: usize,
        reason: String,
    },

    #[error("invalid indicator parameters: {0}")]
    InvalidParams(String),

    #[error("invalid backtest window: {0}")]
    InvalidWindow(String),

    #[error("table error: {0}")]
    Frame(#[from] PolarsError),
}
