//! Data loader — fetches price and indicator series, normalizes them to
//! tables, optionally persists them under `raw/`, and reads them back.
//!
//! Every operation is best-effort: a failing identifier is logged and left
//! out of the report, a missing file loads as an empty table. Nothing here
//! panics or returns an error for per-item problems.

use super::fred::FredProvider;
use super::provider::{DataError, FetchReport, IndicatorProvider, Interval, PriceProvider};
use super::table;
use super::yahoo::YahooProvider;
use crate::config::DataConfig;
use crate::logging::LogSink;
use crate::storage::{output_file_name, StorageLayout};
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Major US equity indices.
pub const DEFAULT_TICKERS: [&str; 3] = ["^IXIC", "^DJI", "^GSPC"];
/// GDP, corporate profits, labor force participation.
pub const DEFAULT_INDICATORS: [&str; 3] = ["GDP", "CP", "CIVPART"];
pub const DEFAULT_START_DATE: &str = "2000-04-01";

/// [`DEFAULT_START_DATE`] as a date.
pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 4, 1).unwrap_or_default()
}

/// Today in local time; used when no end date is given.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub struct DataLoader {
    layout: StorageLayout,
    prices: Box<dyn PriceProvider>,
    indicators: Option<Box<dyn IndicatorProvider>>,
    log: LogSink,
}

impl DataLoader {
    /// Provision the storage layout and build the configured providers.
    ///
    /// The indicator provider is only built when a credential is present; if
    /// building it fails the loader still comes up with indicators disabled.
    pub fn new(config: &DataConfig, log: LogSink) -> Result<Self, DataError> {
        let layout = StorageLayout::new(&config.data_dir);
        ensure_layout(&layout)?;

        let prices: Box<dyn PriceProvider> = Box::new(YahooProvider::new(config)?);

        let indicators = log.scope(|| match config.fred_api_key() {
            Some(key) => match FredProvider::new(config, key) {
                Ok(p) => Some(Box::new(p) as Box<dyn IndicatorProvider>),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to initialize FRED client");
                    None
                }
            },
            None => None,
        });

        Ok(Self {
            layout,
            prices,
            indicators,
            log,
        })
    }

    /// Build a loader around caller-supplied providers. Provisions the layout.
    pub fn with_providers(
        layout: StorageLayout,
        prices: Box<dyn PriceProvider>,
        indicators: Option<Box<dyn IndicatorProvider>>,
        log: LogSink,
    ) -> Result<Self, DataError> {
        ensure_layout(&layout)?;
        Ok(Self {
            layout,
            prices,
            indicators,
            log,
        })
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn has_indicator_provider(&self) -> bool {
        self.indicators.is_some()
    }

    /// Fetch price tables for each ticker, in order.
    ///
    /// `end_date` defaults to today. With `save`, each table is written to
    /// `raw/{ticker}_{start}_{end}.csv`.
    pub fn fetch_stock_data<S: AsRef<str>>(
        &self,
        tickers: &[S],
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        interval: Interval,
        save: bool,
    ) -> FetchReport<DataFrame> {
        let end_date = end_date.unwrap_or_else(today);
        self.log.scope(|| {
            let mut report = FetchReport::new();
            for ticker in tickers {
                let ticker = ticker.as_ref();
                tracing::info!(ticker, %interval, "fetching price data");
                let result = self
                    .prices
                    .fetch_prices(ticker, start_date, end_date, interval)
                    .and_then(|series| table::price_table(&series).map_err(DataError::from));
                self.record(&mut report, ticker, result, start_date, end_date, save);
            }
            report
        })
    }

    /// Fetch indicator tables for each code, in order.
    ///
    /// Without a configured indicator provider this logs an error and returns
    /// an unavailable report without attempting any request.
    pub fn fetch_economic_indicators<S: AsRef<str>>(
        &self,
        indicators: &[S],
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        save: bool,
    ) -> FetchReport<DataFrame> {
        self.log.scope(|| {
            let Some(provider) = self.indicators.as_ref() else {
                tracing::error!("FRED client not initialized, provide a valid API key");
                return FetchReport::unavailable(DataError::ProviderUnavailable {
                    provider: "fred",
                    reason: "no API key configured".into(),
                });
            };

            let end_date = end_date.unwrap_or_else(today);
            let mut report = FetchReport::new();
            for code in indicators {
                let code = code.as_ref();
                tracing::info!(indicator = code, "fetching economic indicator");
                let result = provider
                    .fetch_series(code, start_date, end_date)
                    .and_then(|series| table::indicator_table(&series).map_err(DataError::from));
                self.record(&mut report, code, result, start_date, end_date, save);
            }
            report
        })
    }

    fn record(
        &self,
        report: &mut FetchReport<DataFrame>,
        id: &str,
        result: Result<DataFrame, DataError>,
        start: NaiveDate,
        end: NaiveDate,
        save: bool,
    ) {
        let persisted = result.and_then(|mut df| {
            if save {
                let path = self.layout.raw_path(&output_file_name(id, start, end));
                table::write_csv(&mut df, &path)?;
                tracing::info!(id, path = %path.display(), rows = df.height(), "saved table");
            }
            Ok(df)
        });

        match persisted {
            Ok(df) => {
                report.tables.insert(id.to_string(), df);
            }
            Err(e) => {
                tracing::error!(id, error = %e, "error fetching data");
                report.failures.push((id.to_string(), e));
            }
        }
    }

    /// Resolve `file_path` literally, then relative to `raw/`.
    pub fn resolve_path(&self, file_path: impl AsRef<Path>) -> Option<PathBuf> {
        let literal = file_path.as_ref();
        if literal.exists() {
            return Some(literal.to_path_buf());
        }
        let in_raw = self.layout.raw_dir().join(literal);
        in_raw.exists().then_some(in_raw)
    }

    /// Read a saved table, reporting why it could not be read.
    pub fn read_table(&self, file_path: impl AsRef<Path>) -> Result<DataFrame, DataError> {
        let file_path = file_path.as_ref();
        let path = self
            .resolve_path(file_path)
            .ok_or_else(|| DataError::FileNotFound(file_path.to_path_buf()))?;
        table::read_csv(&path)
    }

    /// Read a saved table; any failure is logged and yields an empty table.
    pub fn load_from_file(&self, file_path: impl AsRef<Path>) -> DataFrame {
        let file_path = file_path.as_ref();
        self.log.scope(|| match self.read_table(file_path) {
            Ok(df) => {
                tracing::info!(path = %file_path.display(), rows = df.height(), "loaded table");
                df
            }
            Err(DataError::FileNotFound(_)) => {
                tracing::error!(path = %file_path.display(), "file not found");
                DataFrame::empty()
            }
            Err(e) => {
                tracing::error!(path = %file_path.display(), error = %e, "error loading file");
                DataFrame::empty()
            }
        })
    }

    /// Names of non-hidden entries in `raw/`, sorted.
    pub fn list_available_files(&self) -> Vec<String> {
        self.log.scope(|| {
            let entries = match fs::read_dir(self.layout.raw_dir()) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::error!(
                        path = %self.layout.raw_dir().display(),
                        error = %e,
                        "cannot list raw directory"
                    );
                    return Vec::new();
                }
            };
            let mut names: Vec<String> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().to_string())
                .filter(|name| !name.starts_with('.'))
                .collect();
            names.sort();
            names
        })
    }
}

fn ensure_layout(layout: &StorageLayout) -> Result<(), DataError> {
    layout.ensure().map_err(|source| DataError::Io {
        path: layout.root().to_path_buf(),
        source,
    })
}
