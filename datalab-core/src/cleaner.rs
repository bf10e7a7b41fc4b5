//! Missing-value handling for fetched tables.
//!
//! [`DataCleaner::handle_missing_values`] is the best-effort entry point:
//! unknown method names fall back to forward-fill and any failure hands back
//! the input unchanged. [`fill_missing`] is the typed core underneath it.

use crate::data::provider::DataError;
use crate::data::table;
use crate::logging::LogSink;
use crate::storage::StorageLayout;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CleanError {
    #[error("unknown fill method '{0}'")]
    UnknownMethod(String),

    #[error("fill failed: {0}")]
    Table(#[from] PolarsError),
}

/// Strategy for dealing with null cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    /// Carry the last non-null value down each column.
    #[default]
    ForwardFill,
    /// Carry the next non-null value up each column.
    BackwardFill,
    /// Remove every row holding a null.
    Drop,
    /// Replace nulls in numeric columns with 0.
    Zero,
}

impl FillMethod {
    pub const ALL: [FillMethod; 4] = [
        FillMethod::ForwardFill,
        FillMethod::BackwardFill,
        FillMethod::Drop,
        FillMethod::Zero,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FillMethod::ForwardFill => "forward_fill",
            FillMethod::BackwardFill => "backward_fill",
            FillMethod::Drop => "drop",
            FillMethod::Zero => "zero",
        }
    }
}

impl fmt::Display for FillMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FillMethod {
    type Err = CleanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FillMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| CleanError::UnknownMethod(s.to_string()))
    }
}

/// Apply `method` to every null in `df`, returning a new frame.
///
/// Fills run down each column in row order, so on a newest-first table a
/// forward fill copies newer values into older gaps.
pub fn fill_missing(df: &DataFrame, method: FillMethod) -> PolarsResult<DataFrame> {
    match method {
        FillMethod::ForwardFill => fill_columns(df, FillNullStrategy::Forward(None), |_| true),
        FillMethod::BackwardFill => fill_columns(df, FillNullStrategy::Backward(None), |_| true),
        FillMethod::Drop => df.drop_nulls::<String>(None),
        FillMethod::Zero => fill_columns(df, FillNullStrategy::Zero, |dtype| {
            dtype.is_float() || dtype.is_integer()
        }),
    }
}

fn fill_columns(
    df: &DataFrame,
    strategy: FillNullStrategy,
    applies_to: impl Fn(&DataType) -> bool,
) -> PolarsResult<DataFrame> {
    let columns = df
        .get_columns()
        .iter()
        .map(|c| {
            if c.null_count() == 0 || !applies_to(c.dtype()) {
                return Ok(c.clone());
            }
            Ok(c.as_materialized_series().fill_null(strategy)?.into_column())
        })
        .collect::<PolarsResult<Vec<_>>>()?;
    DataFrame::new(columns)
}

pub struct DataCleaner {
    layout: StorageLayout,
    log: LogSink,
}

impl DataCleaner {
    /// Provisions the storage layout, same as the loader.
    pub fn new(layout: StorageLayout, log: LogSink) -> Result<Self, DataError> {
        layout.ensure().map_err(|source| DataError::Io {
            path: layout.root().to_path_buf(),
            source,
        })?;
        Ok(Self { layout, log })
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Fill or drop nulls using the named method.
    ///
    /// Empty tables and tables without nulls come back unchanged. Unknown
    /// names are treated as `forward_fill` with a warning. If the fill itself
    /// fails the error is logged and the input is returned.
    pub fn handle_missing_values(&self, df: &DataFrame, method: &str) -> DataFrame {
        self.handle_with(df, method, fill_missing)
    }

    fn handle_with(
        &self,
        df: &DataFrame,
        method: &str,
        apply: impl Fn(&DataFrame, FillMethod) -> PolarsResult<DataFrame>,
    ) -> DataFrame {
        self.log.scope(|| {
            if df.height() == 0 {
                tracing::warn!("empty table provided, nothing to clean");
                return df.clone();
            }

            let missing = table::missing_count(df);
            if missing == 0 {
                tracing::info!("no missing values found");
                return df.clone();
            }

            tracing::info!(missing, method, "handling missing values");
            let fill = match method.parse::<FillMethod>() {
                Ok(fill) => fill,
                Err(_) => {
                    tracing::warn!(method, "unknown fill method, defaulting to forward_fill");
                    FillMethod::ForwardFill
                }
            };

            match apply(df, fill) {
                Ok(cleaned) => cleaned,
                Err(e) => {
                    tracing::error!(method = %fill, error = %e, "error handling missing values");
                    df.clone()
                }
            }
        })
    }

    /// Typed variant of [`handle_missing_values`](Self::handle_missing_values)
    /// with no fallback and no logging.
    pub fn fill(&self, df: &DataFrame, method: FillMethod) -> Result<DataFrame, CleanError> {
        Ok(fill_missing(df, method)?)
    }

    /// Write a cleaned table to `processed/{file_name}`.
    pub fn save_processed(&self, df: &DataFrame, file_name: &str) -> Result<PathBuf, DataError> {
        let path = self.layout.processed_path(file_name);
        let mut out = df.clone();
        table::write_csv(&mut out, &path)?;
        self.log.scope(|| {
            tracing::info!(path = %path.display(), rows = out.height(), "saved processed table");
        });
        Ok(path)
    }
}
