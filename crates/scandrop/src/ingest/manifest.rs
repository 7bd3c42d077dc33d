//! Append-only CSV store of accepted files.

use super::error::Result;
use super::types::ManifestRecord;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MANIFEST_HEADER: [&str; 5] = [
    "original_path",
    "new_path",
    "folder",
    "processed_date",
    "naming_flag",
];

/// Default manifest file name inside the destination directory.
pub const DEFAULT_MANIFEST_FILE: &str = "file_mappings.csv";

#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `records`, writing the header first if the file is new or
    /// empty. Appending nothing leaves the file untouched.
    pub fn append(&self, records: &[ManifestRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let needs_header = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(MANIFEST_HEADER)?;
        }
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        debug!(path = %self.path.display(), rows = records.len(), "Appended manifest records");
        Ok(())
    }

    /// All records currently in the store.
    pub fn read_all(&self) -> Result<Vec<ManifestRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let records = reader
            .deserialize()
            .collect::<std::result::Result<Vec<ManifestRecord>, csv::Error>>()?;
        Ok(records)
    }
}
