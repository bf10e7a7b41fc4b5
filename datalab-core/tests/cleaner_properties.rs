//! Property tests for the cleaner's fill strategies.
//!
//! Uses proptest to verify:
//! 1. Empty and null-free tables come back unchanged for every method name
//! 2. `zero` only touches null cells, and sets them to 0
//! 3. `drop` removes exactly the rows holding a null
//! 4. Unknown method names behave like `forward_fill`

use datalab_core::data::table::{f64_values, missing_count, rows_with_missing};
use datalab_core::{DataCleaner, LogSink, StorageLayout};
use polars::prelude::*;
use proptest::prelude::*;

const METHODS: [&str; 6] = [
    "forward_fill",
    "backward_fill",
    "drop",
    "zero",
    "median",
    "",
];

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_cell() -> impl Strategy<Value = Option<f64>> + Clone {
    prop_oneof![
        1 => Just(None),
        3 => (-1_000.0..1_000.0_f64).prop_map(|v| Some((v * 100.0).round() / 100.0)),
    ]
}

fn arb_complete_cell() -> impl Strategy<Value = Option<f64>> + Clone {
    (-1_000.0..1_000.0_f64).prop_map(Some)
}

fn frame(open: Vec<Option<f64>>, close: Vec<Option<f64>>) -> DataFrame {
    let days: Vec<i32> = (0..open.len() as i32).rev().map(|d| 19_000 + d).collect();
    DataFrame::new(vec![
        Series::new("Date".into(), days)
            .cast(&DataType::Date)
            .unwrap()
            .into_column(),
        Column::new("Open".into(), open),
        Column::new("Close".into(), close),
    ])
    .unwrap()
}

fn arb_frame(cell: impl Strategy<Value = Option<f64>> + Clone) -> impl Strategy<Value = DataFrame> {
    (1usize..40).prop_flat_map(move |rows| {
        (
            prop::collection::vec(cell.clone(), rows),
            prop::collection::vec(cell.clone(), rows),
        )
            .prop_map(|(open, close)| frame(open, close))
    })
}

fn cleaner() -> (DataCleaner, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let cleaner = DataCleaner::new(StorageLayout::new(dir.path()), LogSink::silent()).unwrap();
    (cleaner, dir)
}

// ── 1. Unchanged inputs ──────────────────────────────────────────────

#[test]
fn empty_table_is_unchanged_for_every_method() {
    let (cleaner, _dir) = cleaner();
    let empty = frame(vec![], vec![]);
    for method in METHODS {
        let out = cleaner.handle_missing_values(&empty, method);
        assert_eq!(out.height(), 0, "method {method}");
        assert!(out.equals_missing(&empty), "method {method}");
    }
}

proptest! {
    #[test]
    fn complete_table_is_unchanged(df in arb_frame(arb_complete_cell())) {
        let (cleaner, _dir) = cleaner();
        for method in METHODS {
            let out = cleaner.handle_missing_values(&df, method);
            prop_assert!(out.equals_missing(&df), "method {}", method);
        }
    }
}

// ── 2. Zero fill ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn zero_replaces_only_nulls(df in arb_frame(arb_cell())) {
        let (cleaner, _dir) = cleaner();
        let out = cleaner.handle_missing_values(&df, "zero");

        prop_assert_eq!(out.height(), df.height());
        prop_assert_eq!(missing_count(&out), 0);
        for name in ["Open", "Close"] {
            let before = f64_values(&df, name).unwrap();
            let after = f64_values(&out, name).unwrap();
            for (b, a) in before.iter().zip(after.iter()) {
                match b {
                    None => prop_assert_eq!(*a, Some(0.0)),
                    Some(v) => prop_assert_eq!(*a, Some(*v)),
                }
            }
        }
        let date_after = out.column("Date").unwrap().as_materialized_series();
        let date_before = df.column("Date").unwrap().as_materialized_series();
        prop_assert!(date_after.equals_missing(date_before));
    }
}

// ── 3. Drop ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn drop_removes_exactly_rows_with_nulls(df in arb_frame(arb_cell())) {
        let (cleaner, _dir) = cleaner();
        let out = cleaner.handle_missing_values(&df, "drop");

        prop_assert_eq!(out.height(), df.height() - rows_with_missing(&df));
        prop_assert_eq!(rows_with_missing(&out), 0);
    }
}

// ── 4. Fallback ──────────────────────────────────────────────────────

proptest! {
    #[test]
    fn unknown_method_matches_forward_fill(
        df in arb_frame(arb_cell()),
        name in "[a-z_]{1,12}",
    ) {
        prop_assume!(!["forward_fill", "backward_fill", "drop", "zero"].contains(&name.as_str()));
        let (cleaner, _dir) = cleaner();

        let fallback = cleaner.handle_missing_values(&df, &name);
        let forward = cleaner.handle_missing_values(&df, "forward_fill");
        prop_assert!(fallback.equals_missing(&forward));
    }

    #[test]
    fn forward_fill_only_leaves_leading_nulls(df in arb_frame(arb_cell())) {
        let (cleaner, _dir) = cleaner();
        let out = cleaner.handle_missing_values(&df, "forward_fill");

        for name in ["Open", "Close"] {
            let before = f64_values(&df, name).unwrap();
            let after = f64_values(&out, name).unwrap();
            let leading = before.iter().take_while(|v| v.is_none()).count();
            prop_assert!(after[..leading].iter().all(|v| v.is_none()));
            prop_assert!(after[leading..].iter().all(|v| v.is_some()));
        }
    }
}
