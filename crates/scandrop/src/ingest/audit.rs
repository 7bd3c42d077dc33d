//! Durable audit log of ingested folders.
//!
//! The log is a single CSV table. Reading it yields the set of folder names
//! already ingested; appending rewrites the whole table (existing rows plus
//! new ones) through a temp file and an atomic rename, retrying while
//! another process holds the file.

use super::error::{IngestError, Result};
use super::retry::{with_retry, RetryPolicy};
use super::types::AuditRow;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const AUDIT_HEADER: [&str; 6] = [
    "Folder Name",
    "Naming Flag",
    "Processed Date",
    "File Name",
    "File Path",
    "File Created Date",
];

/// Folder names already present in the audit log, captured once per pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedSet {
    names: HashSet<String>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ProcessedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
    retry: RetryPolicy,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>, retry: RetryPolicy) -> Self {
        Self {
            path: path.into(),
            retry,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of processed folder names.
    ///
    /// A missing or empty log is an empty set. A log that exists but cannot
    /// be parsed is an error: ingesting against it would archive folders
    /// that can never be recorded.
    pub fn processed_set(&self) -> Result<ProcessedSet> {
        if !self.path.exists() {
            return Ok(ProcessedSet::new());
        }
        with_retry(
            "audit log read",
            &self.retry,
            IngestError::is_lock_contention,
            || self.read_folder_names(),
        )
    }

    /// Fail unless the log is absent or a well-formed audit table.
    pub fn verify(&self) -> Result<()> {
        self.processed_set().map(|_| ())
    }

    fn read_folder_names(&self) -> Result<ProcessedSet> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Ok(ProcessedSet::new());
        }
        self.check_header(&headers)?;

        let mut names = HashSet::new();
        for row in reader.deserialize::<AuditRow>() {
            let row = row?;
            if !row.folder_name.is_empty() {
                names.insert(row.folder_name);
            }
        }
        Ok(ProcessedSet { names })
    }

    fn check_header(&self, headers: &csv::StringRecord) -> Result<()> {
        if headers.iter().eq(AUDIT_HEADER.iter().copied()) {
            return Ok(());
        }
        Err(IngestError::AuditFormat {
            path: self.path.clone(),
            reason: format!("unexpected header {:?}", headers.iter().collect::<Vec<_>>()),
        })
    }

    /// Every row currently in the log.
    pub fn read_rows(&self) -> Result<Vec<AuditRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let rows = reader
            .deserialize()
            .collect::<std::result::Result<Vec<AuditRow>, csv::Error>>()?;
        Ok(rows)
    }

    /// Add `rows` to the log, retrying while the file is locked.
    pub fn append(&self, rows: &[AuditRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        with_retry(
            "audit log write",
            &self.retry,
            IngestError::is_lock_contention,
            || self.rewrite_with(rows),
        )?;
        info!(path = %self.path.display(), rows = rows.len(), "Logged entries to audit log");
        Ok(())
    }

    fn rewrite_with(&self, rows: &[AuditRow]) -> Result<()> {
        let existing = self.read_existing_records()?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let temp_path = dir.join(format!(
            ".{}.tmp",
            self.path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "audit".to_string())
        ));

        let written = self.write_table(&temp_path, &existing, rows);
        if let Err(err) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(err);
        }

        if let Err(err) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(err.into());
        }
        debug!(
            path = %self.path.display(),
            existing = existing.len(),
            added = rows.len(),
            "Rewrote audit log"
        );
        Ok(())
    }

    fn read_existing_records(&self) -> Result<Vec<csv::StringRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        // Opening for write surfaces a lock held by another program before
        // anything is rewritten.
        fs::OpenOptions::new().append(true).open(&self.path)?;

        let mut reader = csv::Reader::from_path(&self.path)?;
        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Ok(Vec::new());
        }
        self.check_header(&headers)?;
        let records = reader
            .records()
            .collect::<std::result::Result<Vec<_>, csv::Error>>()?;
        Ok(records)
    }

    fn write_table(
        &self,
        temp_path: &Path,
        existing: &[csv::StringRecord],
        rows: &[AuditRow],
    ) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(temp_path)?;
        writer.write_record(AUDIT_HEADER)?;
        for record in existing {
            writer.write_record(record)?;
        }
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
