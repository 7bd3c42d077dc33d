//! Core types for the ingestion pipeline

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Prefix marking a file whose name violates the file grammar.
pub const RENAME_PREFIX: &str = "RENAME_";

/// Prefix marking a file whose extension is not allow-listed.
pub const UNSUPPORTED_PREFIX: &str = "UNSUPPORTED_";

/// File name written to the audit log for a folder with no files.
pub const EMPTY_FOLDER_SENTINEL: &str = "(empty)";

/// Timestamp format used in the manifest and the audit log.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Outcome of checking a folder name against the folder grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamingFlag {
    /// Name conforms, possibly after a deterministic repair.
    #[serde(rename = "OK")]
    Ok,
    /// No repair worked; manual review required.
    #[serde(rename = "X")]
    NeedsReview,
}

impl NamingFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamingFlag::Ok => "OK",
            NamingFlag::NeedsReview => "X",
        }
    }
}

impl fmt::Display for NamingFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which prefix a failed file receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagPrefix {
    Rename,
    Unsupported,
}

impl FlagPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagPrefix::Rename => RENAME_PREFIX,
            FlagPrefix::Unsupported => UNSUPPORTED_PREFIX,
        }
    }
}

/// Verdict on a single file name, before any action is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileVerdict {
    AlreadyFlagged,
    UnsupportedExtension,
    InvalidName,
    Valid,
}

impl FileVerdict {
    /// The prefix this verdict calls for, if any.
    pub fn flag_prefix(&self) -> Option<FlagPrefix> {
        match self {
            FileVerdict::UnsupportedExtension => Some(FlagPrefix::Unsupported),
            FileVerdict::InvalidName => Some(FlagPrefix::Rename),
            FileVerdict::AlreadyFlagged | FileVerdict::Valid => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileVerdict::AlreadyFlagged => "already-flagged",
            FileVerdict::UnsupportedExtension => "unsupported-extension",
            FileVerdict::InvalidName => "invalid-name",
            FileVerdict::Valid => "valid",
        }
    }
}

/// What happened to a file during folder processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileClassification {
    Valid,
    Renamed,
    Unsupported,
    SkippedAlreadyFlagged,
}

/// A file seen directly inside a delivery folder.
#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    /// Path after processing (differs from the original when flagged)
    pub path: PathBuf,
    /// File name as delivered
    pub name: String,
    /// Extension without the dot, empty when absent
    pub extension: String,
    pub classification: FileClassification,
    pub created: Option<DateTime<Local>>,
}

/// One row of the manifest store; only valid files produce one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub original_path: String,
    pub new_path: String,
    pub folder: String,
    pub processed_date: String,
    pub naming_flag: String,
}

impl ManifestRecord {
    pub fn new(
        original_path: String,
        new_path: String,
        folder: String,
        processed: DateTime<Local>,
    ) -> Self {
        Self {
            original_path,
            new_path,
            folder,
            processed_date: processed.format(TIMESTAMP_FORMAT).to_string(),
            naming_flag: NamingFlag::Ok.as_str().to_string(),
        }
    }
}

/// One row of the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRow {
    #[serde(rename = "Folder Name")]
    pub folder_name: String,
    #[serde(rename = "Naming Flag")]
    pub naming_flag: String,
    #[serde(rename = "Processed Date")]
    pub processed_date: String,
    #[serde(rename = "File Name")]
    pub file_name: String,
    #[serde(rename = "File Path")]
    pub file_path: String,
    #[serde(rename = "File Created Date")]
    pub file_created_date: String,
}

impl AuditRow {
    pub fn for_file(
        folder_name: &str,
        flag: NamingFlag,
        processed: DateTime<Local>,
        file_name: String,
        relative_path: String,
        created: Option<DateTime<Local>>,
    ) -> Self {
        Self {
            folder_name: folder_name.to_string(),
            naming_flag: flag.as_str().to_string(),
            processed_date: processed.format(TIMESTAMP_FORMAT).to_string(),
            file_name,
            file_path: relative_path,
            file_created_date: created
                .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_default(),
        }
    }

    /// Placeholder row recorded for a folder that held no files.
    pub fn empty_folder(folder_name: &str, flag: NamingFlag, processed: DateTime<Local>) -> Self {
        Self::for_file(
            folder_name,
            flag,
            processed,
            EMPTY_FOLDER_SENTINEL.to_string(),
            String::new(),
            None,
        )
    }
}
