//! Storage layout under the data root.
//!
//! Layout: `{data_dir}/raw/` for tables as fetched, `{data_dir}/processed/`
//! for cleaned output written on request.

use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const RAW_DIR: &str = "raw";
pub const PROCESSED_DIR: &str = "processed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    root: PathBuf,
    raw_dir: PathBuf,
    processed_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            raw_dir: root.join(RAW_DIR),
            processed_dir: root.join(PROCESSED_DIR),
            root,
        }
    }

    /// Create both subdirectories. Safe to call repeatedly.
    pub fn ensure(&self) -> io::Result<()> {
        fs::create_dir_all(&self.raw_dir)?;
        fs::create_dir_all(&self.processed_dir)?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    pub fn raw_path(&self, file_name: &str) -> PathBuf {
        self.raw_dir.join(file_name)
    }

    pub fn processed_path(&self, file_name: &str) -> PathBuf {
        self.processed_dir.join(file_name)
    }
}

/// `{id}_{start}_{end}.csv`. The identifier is used verbatim.
pub fn output_file_name(id: &str, start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "{id}_{}_{}.csv",
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    )
}
