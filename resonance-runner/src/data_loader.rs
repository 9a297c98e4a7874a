//! Dataset loading for the runner.
//!
//! Reads a delimited text file into a table whose columns are all text.
//! Typing is left to the core boundary so instrument codes such as
//! `000001` keep their leading zeros and bad cells are reported with their
//! row and column.

use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("input file not found: {0}")]
    NotFound(PathBuf),

    #[error("unsupported input format '{extension}' for {path} (export it as CSV first)")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
}

/// Options controlling how a file is parsed.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Field separator byte.
    pub separator: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { separator: b',' }
    }
}

/// A loaded table with its provenance.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub frame: DataFrame,
    pub path: PathBuf,
    /// BLAKE3 over every cell, for fingerprinting reports.
    pub dataset_hash: String,
}

/// Load a delimited file into a text-typed table.
pub fn load_table(path: &Path, opts: &LoadOptions) -> Result<LoadedTable, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if matches!(extension.as_str(), "xlsx" | "xls") {
        return Err(LoadError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        });
    }

    let read_err = |source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    };

    let separator = opts.separator;
    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|p| p.with_separator(separator))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(read_err)?
        .finish()
        .map_err(read_err)?;

    let dataset_hash = dataset_hash(&frame).map_err(read_err)?;
    info!(
        path = %path.display(),
        rows = frame.height(),
        columns = frame.width(),
        "loaded input table"
    );

    Ok(LoadedTable {
        frame,
        path: path.to_path_buf(),
        dataset_hash,
    })
}

/// Deterministic BLAKE3 hash over column names and every cell's text form.
///
/// Column order and row order both feed the hash.
pub fn dataset_hash(df: &DataFrame) -> PolarsResult<String> {
    let mut hasher = blake3::Hasher::new();

    for column in df.get_columns() {
        hasher.update(column.name().as_bytes());
        hasher.update(&[0]);
        let text = column.as_materialized_series().cast(&DataType::String)?;
        for value in text.str()?.into_iter() {
            match value {
                Some(v) => {
                    hasher.update(&[1]);
                    hasher.update(v.as_bytes());
                }
                None => {
                    hasher.update(&[2]);
                }
            }
            hasher.update(&[0]);
        }
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!(rows = df.height(), %hash, "hashed dataset");
    Ok(hash)
}
