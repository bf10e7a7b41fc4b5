//! Table normalization and CSV persistence.
//!
//! Every fetched series becomes a `DataFrame` with a leading `Date` column,
//! sorted newest first. Missing values are nulls, never NaN.

use super::provider::{DataError, IndicatorSeries, PriceSeries};
use chrono::Datelike;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

pub const DATE_COLUMN: &str = "Date";
pub const PRICE_COLUMNS: [&str; 5] = ["Open", "High", "Low", "Close", "Volume"];

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn date_column(days: Vec<i32>) -> PolarsResult<Column> {
    Ok(Series::new(DATE_COLUMN.into(), days)
        .cast(&DataType::Date)?
        .into_column())
}

fn datetime_column(millis: Vec<i64>) -> PolarsResult<Column> {
    Ok(Series::new(DATE_COLUMN.into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        .into_column())
}

/// `Date, Open, High, Low, Close, Volume`, newest first.
///
/// Intraday intervals keep the bar timestamp; coarser ones keep only the date.
pub fn price_table(series: &PriceSeries) -> PolarsResult<DataFrame> {
    let bars = &series.bars;
    let date = if series.interval.is_intraday() {
        datetime_column(
            bars.iter()
                .map(|b| b.timestamp.and_utc().timestamp_millis())
                .collect(),
        )?
    } else {
        date_column(
            bars.iter()
                .map(|b| b.timestamp.date().num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
                .collect(),
        )?
    };

    let df = DataFrame::new(vec![
        date,
        Column::new("Open".into(), bars.iter().map(|b| b.open).collect::<Vec<_>>()),
        Column::new("High".into(), bars.iter().map(|b| b.high).collect::<Vec<_>>()),
        Column::new("Low".into(), bars.iter().map(|b| b.low).collect::<Vec<_>>()),
        Column::new("Close".into(), bars.iter().map(|b| b.close).collect::<Vec<_>>()),
        Column::new("Volume".into(), bars.iter().map(|b| b.volume).collect::<Vec<_>>()),
    ])?;
    sort_by_date_desc(&df)
}

/// `Date, {code}`, newest first.
pub fn indicator_table(series: &IndicatorSeries) -> PolarsResult<DataFrame> {
    let obs = &series.observations;
    let df = DataFrame::new(vec![
        date_column(
            obs.iter()
                .map(|o| o.date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
                .collect(),
        )?,
        Column::new(
            series.code.as_str().into(),
            obs.iter().map(|o| o.value).collect::<Vec<_>>(),
        ),
    ])?;
    sort_by_date_desc(&df)
}

pub fn sort_by_date_desc(df: &DataFrame) -> PolarsResult<DataFrame> {
    df.sort(
        [DATE_COLUMN],
        SortMultipleOptions::default()
            .with_order_descending(true)
            .with_maintain_order(true),
    )
}

/// Total null cells across all columns.
pub fn missing_count(df: &DataFrame) -> usize {
    df.get_columns().iter().map(|c| c.null_count()).sum()
}

/// Rows with at least one null cell.
pub fn rows_with_missing(df: &DataFrame) -> usize {
    let masks: Vec<BooleanChunked> = df
        .get_columns()
        .iter()
        .filter(|c| c.null_count() > 0)
        .map(|c| c.as_materialized_series().is_null())
        .collect();
    (0..df.height())
        .filter(|&row| masks.iter().any(|m| m.get(row) == Some(true)))
        .count()
}

/// Values of a float column in row order; non-float columns yield an error.
pub fn f64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    Ok(df
        .column(name)?
        .as_materialized_series()
        .f64()?
        .into_iter()
        .collect())
}

/// Write `df` as comma-delimited CSV with a header row.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let mut file = File::create(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(df)?;
    Ok(())
}

/// Read a CSV written by [`write_csv`] (or any headed CSV), parsing dates.
pub fn read_csv(path: &Path) -> Result<DataFrame, DataError> {
    if !path.is_file() {
        return Err(DataError::FileNotFound(path.to_path_buf()));
    }
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_try_parse_dates(true)
        .finish()?
        .collect()?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{Interval, Observation, PriceBar};
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bar(date: NaiveDate, close: Option<f64>) -> PriceBar {
        PriceBar {
            timestamp: date.and_hms_opt(14, 30, 0).unwrap(),
            open: Some(1.0),
            high: Some(2.0),
            low: Some(0.5),
            close,
            volume: Some(100),
        }
    }

    #[test]
    fn price_table_has_expected_columns_newest_first() {
        let series = PriceSeries {
            symbol: "SPY".into(),
            interval: Interval::OneDay,
            bars: vec![
                bar(day(2024, 1, 2), Some(10.0)),
                bar(day(2024, 1, 4), Some(12.0)),
                bar(day(2024, 1, 3), None),
            ],
        };
        let df = price_table(&series).unwrap();

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["Date", "Open", "High", "Low", "Close", "Volume"]);
        assert_eq!(df.column(DATE_COLUMN).unwrap().dtype(), &DataType::Date);

        let close = f64_values(&df, "Close").unwrap();
        assert_eq!(close, vec![Some(12.0), None, Some(10.0)]);
        assert_eq!(missing_count(&df), 1);
        assert_eq!(rows_with_missing(&df), 1);
    }

    #[test]
    fn intraday_price_table_keeps_timestamps() {
        let series = PriceSeries {
            symbol: "SPY".into(),
            interval: Interval::OneHour,
            bars: vec![bar(day(2024, 1, 2), Some(10.0))],
        };
        let df = price_table(&series).unwrap();
        assert!(matches!(
            df.column(DATE_COLUMN).unwrap().dtype(),
            DataType::Datetime(TimeUnit::Milliseconds, None)
        ));
    }

    #[test]
    fn indicator_table_names_value_column_after_code() {
        let series = IndicatorSeries {
            code: "GDP".into(),
            observations: vec![
                Observation {
                    date: day(2023, 1, 1),
                    value: Some(26_000.0),
                },
                Observation {
                    date: day(2023, 4, 1),
                    value: None,
                },
            ],
        };
        let df = indicator_table(&series).unwrap();
        assert_eq!(df.width(), 2);
        let gdp = f64_values(&df, "GDP").unwrap();
        assert_eq!(gdp, vec![None, Some(26_000.0)]);
    }

    #[test]
    fn csv_written_table_reads_back_with_dates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("GDP.csv");
        let series = IndicatorSeries {
            code: "GDP".into(),
            observations: vec![
                Observation {
                    date: day(2023, 1, 1),
                    value: Some(1.5),
                },
                Observation {
                    date: day(2023, 4, 1),
                    value: None,
                },
            ],
        };
        let mut df = indicator_table(&series).unwrap();
        write_csv(&mut df, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Date,GDP"));
        assert_eq!(lines.next(), Some("2023-04-01,"));
        assert_eq!(lines.next(), Some("2023-01-01,1.5"));

        let back = read_csv(&path).unwrap();
        assert_eq!(back.height(), 2);
        assert_eq!(back.column(DATE_COLUMN).unwrap().dtype(), &DataType::Date);
        assert_eq!(missing_count(&back), 1);
    }

    #[test]
    fn read_missing_file_is_not_found() {
        let result = read_csv(Path::new("/nonexistent/GDP.csv"));
        assert!(matches!(result, Err(DataError::FileNotFound(_))));
    }
}
