//! Data fetching, normalization and persistence

pub mod fred;
pub mod loader;
pub mod provider;
pub mod table;
pub mod yahoo;

pub use fred::FredProvider;
pub use loader::{
    default_start_date, today, DataLoader, DEFAULT_INDICATORS, DEFAULT_START_DATE,
    DEFAULT_TICKERS,
};
pub use provider::{
    DataError, FetchReport, IndicatorProvider, IndicatorSeries, Interval, Observation, PriceBar,
    PriceProvider, PriceSeries,
};
pub use yahoo::YahooProvider;
