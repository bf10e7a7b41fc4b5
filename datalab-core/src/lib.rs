//! DataLab Core — fetch, store and clean market and economic time series.
//!
//! This crate contains the whole pipeline:
//! - Provider traits with Yahoo Finance (prices) and FRED (indicators) adapters
//! - Normalization of every series into a newest-first `DataFrame`
//! - `raw/` and `processed/` storage layout with CSV persistence
//! - Missing-value cleaning (forward/backward fill, drop, zero)
//! - Injected log sinks instead of a global subscriber

pub mod cleaner;
pub mod config;
pub mod data;
pub mod logging;
pub mod storage;

pub use cleaner::{fill_missing, CleanError, DataCleaner, FillMethod};
pub use config::{ConfigError, DataConfig};
pub use data::{DataError, DataLoader, FetchReport, Interval};
pub use logging::{LogBuffer, LogSink};
pub use storage::StorageLayout;

#[cfg(test)]
mod tests {
    use super::*;

    /// Loaders and cleaners can be handed to a worker thread.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<DataLoader>();
        require_sync::<DataLoader>();
        require_send::<DataCleaner>();
        require_sync::<DataCleaner>();
        require_send::<LogSink>();
        require_sync::<LogSink>();
        require_send::<DataError>();
        require_send::<data::YahooProvider>();
        require_sync::<data::FredProvider>();
    }
}
