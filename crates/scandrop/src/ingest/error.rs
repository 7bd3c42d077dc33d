//! Error types for the ingestion pipeline

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Ingestion error type
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Pattern error: {0}")]
    Pattern(String),

    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Name is not valid UTF-8: {}", .0.display())]
    NonUtf8Name(PathBuf),

    #[error("Target already exists after timestamp suffix: {}", .0.display())]
    Collision(PathBuf),

    #[error("Rename target already exists: {}", .0.display())]
    TargetOccupied(PathBuf),

    #[error("Copy verification failed for {}: {reason}", .path.display())]
    CopyVerification { path: PathBuf, reason: String },

    #[error("Audit log format error in {}: {reason}", .path.display())]
    AuditFormat { path: PathBuf, reason: String },

    #[error("{operation} still locked after {attempts} attempts: {source}")]
    Locked {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<IngestError>,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, IngestError>;

impl IngestError {
    /// True when the error means another process holds the file open
    /// (spreadsheet viewer, sync client). Those are worth retrying.
    pub fn is_lock_contention(&self) -> bool {
        match self {
            IngestError::Io(err) => io_is_locked(err),
            IngestError::Csv(err) => match err.kind() {
                csv::ErrorKind::Io(inner) => io_is_locked(inner),
                _ => false,
            },
            _ => false,
        }
    }
}

#[cfg(windows)]
const SHARING_VIOLATION_CODES: &[i32] = &[32, 33];
#[cfg(not(windows))]
const SHARING_VIOLATION_CODES: &[i32] = &[];

fn io_is_locked(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::PermissionDenied
        || err
            .raw_os_error()
            .map_or(false, |code| SHARING_VIOLATION_CODES.contains(&code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_is_lock_contention() {
        let err = IngestError::from(io::Error::new(io::ErrorKind::PermissionDenied, "locked"));
        assert!(err.is_lock_contention());
    }

    #[test]
    fn other_io_errors_are_not_lock_contention() {
        let err = IngestError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(!err.is_lock_contention());
        assert!(!IngestError::Config("bad".into()).is_lock_contention());
    }

    #[test]
    fn csv_wrapped_permission_denied_is_lock_contention() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "locked");
        let err = IngestError::from(csv::Error::from(io_err));
        assert!(err.is_lock_contention());
    }
}
