//! Ingest - Folder Validation, Flagging & Archiving
//!
//! A pass walks the drop directory, repairs folder names, flags files that
//! break the file naming convention, moves each folder into the archive and
//! records what arrived in the audit log.
//!
//! Flags left on disk (`RENAME_`, `UNSUPPORTED_`) and the audit log are what
//! make repeated passes safe.

pub mod audit;
pub mod error;
pub mod grammar;
pub mod manifest;
pub mod normalize;
pub mod orchestrator;
pub mod processor;
pub mod rename;
pub mod retry;
pub mod types;
pub mod validate;

pub use audit::{AuditLog, ProcessedSet};
pub use error::{IngestError, Result};
pub use grammar::{matches, NamingGrammar};
pub use manifest::ManifestStore;
pub use normalize::normalize;
pub use orchestrator::{FileCounts, FolderOutcome, IngestionOrchestrator, PassReport, Stage};
pub use processor::{FolderFileProcessor, ProcessedFolder};
pub use rename::{Clock, ConflictSafeRenamer, SystemClock};
pub use retry::{with_retry, RetryPolicy};
pub use types::{
    AuditRow, FileClassification, FileEntry, FileVerdict, FlagPrefix, ManifestRecord, NamingFlag,
};
pub use validate::{classify, is_supported_extension, is_valid_filename};
