//! DataLab CLI — fetch, list, show and clean commands.
//!
//! Commands:
//! - `stocks` — fetch price series from Yahoo Finance into `raw/`
//! - `indicators` — fetch economic series from FRED into `raw/`
//! - `list` — list files in `raw/`
//! - `show` — print a saved table
//! - `clean` — fill missing values in a saved table, optionally into `processed/`

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use datalab_core::data::{
    default_start_date, DataLoader, FetchReport, Interval, DEFAULT_INDICATORS, DEFAULT_TICKERS,
};
use datalab_core::logging::parse_level;
use datalab_core::{DataCleaner, DataConfig, LogSink};
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "datalab",
    about = "DataLab CLI — fetch, store and clean market and economic time series"
)]
struct Cli {
    /// Path to a TOML config file. Defaults to the user config dir if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data root holding raw/ and processed/. Overrides the config file.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch price series for one or more tickers.
    Stocks {
        /// Tickers to fetch (e.g., SPY ^GSPC AAPL). Defaults to the major US indices.
        tickers: Vec<String>,

        /// Start date (YYYY-MM-DD). Defaults to 2000-04-01.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Bar interval: 1m 2m 5m 15m 30m 60m 90m 1h 1d 5d 1wk 1mo 3mo.
        #[arg(long, default_value = "1d")]
        interval: String,

        /// Keep results in memory only; do not write raw/ files.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Fetch economic indicator series from FRED.
    Indicators {
        /// Series codes (e.g., GDP UNRATE). Defaults to GDP CP CIVPART.
        codes: Vec<String>,

        /// Start date (YYYY-MM-DD). Defaults to 2000-04-01.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Keep results in memory only; do not write raw/ files.
        #[arg(long, default_value_t = false)]
        no_save: bool,

        /// FRED API key. Overrides the config file.
        #[arg(long, env = "FRED_API_KEY", hide_env_values = true)]
        fred_api_key: Option<String>,
    },
    /// List files available in raw/.
    List,
    /// Print a saved table (path, or file name inside raw/).
    Show {
        file: PathBuf,

        /// Number of rows to print.
        #[arg(long, default_value_t = 10)]
        rows: usize,
    },
    /// Fill missing values in a saved table.
    Clean {
        /// Path, or file name inside raw/.
        file: PathBuf,

        /// forward_fill, backward_fill, drop or zero.
        #[arg(long, default_value = "forward_fill")]
        method: String,

        /// Write the cleaned table to processed/ under this file name.
        #[arg(long)]
        save: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = DataConfig::resolve(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    let level = match parse_level(&config.log_level) {
        Some(level) => level,
        None => bail!("unknown log level '{}'", config.log_level),
    };
    let log = LogSink::stderr(level);

    match cli.command {
        Commands::Stocks {
            tickers,
            start,
            end,
            interval,
            no_save,
        } => run_stocks(&config, log, tickers, start, end, &interval, !no_save),
        Commands::Indicators {
            codes,
            start,
            end,
            no_save,
            fred_api_key,
        } => {
            config.apply_env(fred_api_key);
            run_indicators(&config, log, codes, start, end, !no_save)
        }
        Commands::List => run_list(&config, log),
        Commands::Show { file, rows } => run_show(&config, log, &file, rows),
        Commands::Clean { file, method, save } => run_clean(&config, log, &file, &method, save),
    }
}

fn parse_date(value: Option<&str>, flag: &str) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("invalid {flag} date '{s}', expected YYYY-MM-DD"))
        })
        .transpose()
}

fn or_defaults(ids: Vec<String>, defaults: &[&str]) -> Vec<String> {
    if ids.is_empty() {
        defaults.iter().map(|s| s.to_string()).collect()
    } else {
        ids
    }
}

fn run_stocks(
    config: &DataConfig,
    log: LogSink,
    tickers: Vec<String>,
    start: Option<String>,
    end: Option<String>,
    interval: &str,
    save: bool,
) -> Result<()> {
    let start_date = parse_date(start.as_deref(), "--start")?.unwrap_or_else(default_start_date);
    let end_date = parse_date(end.as_deref(), "--end")?;
    let interval: Interval = interval.parse()?;
    let tickers = or_defaults(tickers, &DEFAULT_TICKERS);

    let loader = DataLoader::new(config, log)?;
    let report = loader.fetch_stock_data(&tickers, start_date, end_date, interval, save);
    finish(&tickers, report)
}

fn run_indicators(
    config: &DataConfig,
    log: LogSink,
    codes: Vec<String>,
    start: Option<String>,
    end: Option<String>,
    save: bool,
) -> Result<()> {
    let start_date = parse_date(start.as_deref(), "--start")?.unwrap_or_else(default_start_date);
    let end_date = parse_date(end.as_deref(), "--end")?;
    let codes = or_defaults(codes, &DEFAULT_INDICATORS);

    let loader = DataLoader::new(config, log)?;
    let report = loader.fetch_economic_indicators(&codes, start_date, end_date, save);
    finish(&codes, report)
}

/// Print one line per requested id and exit non-zero on any failure.
fn finish(ids: &[String], report: FetchReport<DataFrame>) -> Result<()> {
    if let Some(reason) = &report.unavailable {
        eprintln!("Unavailable: {reason}");
        std::process::exit(1);
    }

    for id in ids {
        if let Some(df) = report.get(id) {
            println!("  OK: {id} ({} rows)", df.height());
        }
    }
    for (id, err) in &report.failures {
        println!("  FAIL: {id}: {err}");
    }
    println!(
        "\nFetch complete: {}/{} succeeded, {} failed",
        report.len(),
        ids.len(),
        report.failures.len()
    );

    if !report.all_succeeded() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_list(config: &DataConfig, log: LogSink) -> Result<()> {
    let loader = DataLoader::new(config, log)?;
    let files = loader.list_available_files();
    if files.is_empty() {
        println!("No files in {}", loader.layout().raw_dir().display());
        return Ok(());
    }
    println!("{}:", loader.layout().raw_dir().display());
    for name in files {
        println!("  {name}");
    }
    Ok(())
}

fn run_show(config: &DataConfig, log: LogSink, file: &Path, rows: usize) -> Result<()> {
    let loader = DataLoader::new(config, log)?;
    let df = loader.read_table(file)?;
    println!("{}", df.head(Some(rows)));
    Ok(())
}

fn run_clean(
    config: &DataConfig,
    log: LogSink,
    file: &Path,
    method: &str,
    save: Option<String>,
) -> Result<()> {
    let loader = DataLoader::new(config, log.clone())?;
    let df = loader.read_table(file)?;

    let cleaner = DataCleaner::new(loader.layout().clone(), log)?;
    let cleaned = cleaner.handle_missing_values(&df, method);
    println!("{} rows in, {} rows out", df.height(), cleaned.height());

    if let Some(name) = save {
        let path = cleaner.save_processed(&cleaned, &name)?;
        println!("Saved to: {}", path.display());
    } else {
        println!("{}", cleaned.head(Some(10)));
    }
    Ok(())
}
