//! Provider traits, fetched series types and structured error types.
//!
//! The two provider traits abstract over the external sources (a price chart
//! API and a macroeconomic series API) so the loader can be driven by mocks in
//! tests. Providers know nothing about tables or storage.

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::PolarsError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Structured error types for data operations.
///
/// Displayable as-is in log lines and CLI output.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("{provider} is not configured: {reason}")]
    ProviderUnavailable {
        provider: &'static str,
        reason: String,
    },

    #[error("unsupported interval '{0}'")]
    InvalidInterval(String),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("table error: {0}")]
    Table(#[from] PolarsError),
}

/// Bar interval accepted by the price provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "2m")]
    TwoMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "60m")]
    SixtyMinutes,
    #[serde(rename = "90m")]
    NinetyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[default]
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1wk")]
    OneWeek,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
}

impl Interval {
    pub const ALL: [Interval; 13] = [
        Interval::OneMinute,
        Interval::TwoMinutes,
        Interval::FiveMinutes,
        Interval::FifteenMinutes,
        Interval::ThirtyMinutes,
        Interval::SixtyMinutes,
        Interval::NinetyMinutes,
        Interval::OneHour,
        Interval::OneDay,
        Interval::FiveDays,
        Interval::OneWeek,
        Interval::OneMonth,
        Interval::ThreeMonths,
    ];

    /// Wire form used in provider requests.
    pub fn as_str(self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::TwoMinutes => "2m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::SixtyMinutes => "60m",
            Interval::NinetyMinutes => "90m",
            Interval::OneHour => "1h",
            Interval::OneDay => "1d",
            Interval::FiveDays => "5d",
            Interval::OneWeek => "1wk",
            Interval::OneMonth => "1mo",
            Interval::ThreeMonths => "3mo",
        }
    }

    /// Sub-daily bars keep their time of day in the Date column.
    pub fn is_intraday(self) -> bool {
        matches!(
            self,
            Interval::OneMinute
                | Interval::TwoMinutes
                | Interval::FiveMinutes
                | Interval::FifteenMinutes
                | Interval::ThirtyMinutes
                | Interval::SixtyMinutes
                | Interval::NinetyMinutes
                | Interval::OneHour
        )
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Interval::ALL
            .into_iter()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| DataError::InvalidInterval(s.to_string()))
    }
}

/// One price bar as returned by a provider. Any field may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: NaiveDateTime,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

/// Result of a successful price fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub symbol: String,
    pub interval: Interval,
    pub bars: Vec<PriceBar>,
}

/// One dated observation of an economic series. `None` marks a missing value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// Result of a successful indicator fetch.
#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub code: String,
    pub observations: Vec<Observation>,
}

/// Source of security price series.
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch bars for `symbol` over `[start, end]` at `interval`.
    fn fetch_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<PriceSeries, DataError>;
}

/// Source of macroeconomic indicator series.
pub trait IndicatorProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch observations for `code` over `[start, end]`.
    fn fetch_series(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<IndicatorSeries, DataError>;
}

/// Outcome of a multi-identifier fetch.
///
/// `tables` holds every identifier that succeeded; `failures` every identifier
/// that did not, with its reason; `unavailable` is set when no identifier was
/// attempted because the provider itself is missing.
#[derive(Debug, Default)]
pub struct FetchReport<T> {
    pub tables: HashMap<String, T>,
    pub failures: Vec<(String, DataError)>,
    pub unavailable: Option<DataError>,
}

impl<T> FetchReport<T> {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            failures: Vec::new(),
            unavailable: None,
        }
    }

    pub fn unavailable(reason: DataError) -> Self {
        Self {
            unavailable: Some(reason),
            ..Self::new()
        }
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.tables.get(id)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn is_unavailable(&self) -> bool {
        self.unavailable.is_some()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty() && self.unavailable.is_none()
    }

    pub fn into_tables(self) -> HashMap<String, T> {
        self.tables
    }
}
