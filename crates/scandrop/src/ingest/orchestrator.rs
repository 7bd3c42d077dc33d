//! One ingestion pass over the drop directory.
//!
//! Each candidate folder moves through
//! `Discovered -> NameNormalized -> FilesProcessed -> Relocated -> Logged`,
//! or stops early as skipped or failed. A failure is confined to its folder:
//! whatever stage it happened in, the pass carries on with the next one.
//!
//! Delivery is at-least-once. A folder relocated but not yet logged when the
//! process dies is caught on the next pass by the destination-existence check.

use super::audit::{AuditLog, ProcessedSet};
use super::error::{IngestError, Result};
use super::grammar::NamingGrammar;
use super::manifest::ManifestStore;
use super::normalize::normalize;
use super::processor::{created_time, rebase_manifest, FolderFileProcessor, ProcessedFolder};
use super::rename::{Clock, ConflictSafeRenamer, SystemClock};
use super::types::{AuditRow, FileClassification, NamingFlag};
use crate::config::IngestConfig;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Pipeline stage at which a folder failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Normalize,
    ProcessFiles,
    Relocate,
    Log,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Normalize => "normalize",
            Stage::ProcessFiles => "process files",
            Stage::Relocate => "relocate",
            Stage::Log => "log",
        };
        f.write_str(label)
    }
}

/// Per-folder file counts of an ingested folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileCounts {
    pub valid: usize,
    pub renamed: usize,
    pub unsupported: usize,
    pub already_flagged: usize,
    /// Rows written to the audit log (includes nested files)
    pub logged: usize,
}

impl FileCounts {
    fn from_processed(processed: &ProcessedFolder, logged: usize) -> Self {
        Self {
            valid: processed.count(FileClassification::Valid),
            renamed: processed.count(FileClassification::Renamed),
            unsupported: processed.count(FileClassification::Unsupported),
            already_flagged: processed.count(FileClassification::SkippedAlreadyFlagged),
            logged,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FolderOutcome {
    SkippedProcessed {
        name: String,
    },
    SkippedExists {
        name: String,
    },
    SkippedNonUtf8 {
        path: PathBuf,
    },
    Ingested {
        original_name: String,
        name: String,
        flag: NamingFlag,
        destination: PathBuf,
        files: FileCounts,
    },
    Failed {
        name: String,
        stage: Stage,
        error: String,
    },
}

impl FolderOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, FolderOutcome::Failed { .. })
    }
}

/// Everything one pass did, in candidate order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassReport {
    pub processed_before: usize,
    pub outcomes: Vec<FolderOutcome>,
}

impl PassReport {
    pub fn ingested(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FolderOutcome::Ingested { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o,
                    FolderOutcome::SkippedProcessed { .. }
                        | FolderOutcome::SkippedExists { .. }
                        | FolderOutcome::SkippedNonUtf8 { .. }
                )
            })
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

pub struct IngestionOrchestrator<C = SystemClock> {
    source_dir: PathBuf,
    destination_dir: PathBuf,
    folder_grammar: NamingGrammar,
    file_grammar: NamingGrammar,
    supported_extensions: Vec<String>,
    audit_log: AuditLog,
    manifest: ManifestStore,
    renamer: ConflictSafeRenamer<C>,
}

impl IngestionOrchestrator<SystemClock> {
    /// Build an orchestrator from a validated configuration.
    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> IngestionOrchestrator<C> {
    pub fn with_clock(config: &IngestConfig, clock: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source_dir: config.source_dir.clone(),
            destination_dir: config.destination_dir.clone(),
            folder_grammar: config.folder_grammar()?,
            file_grammar: config.file_grammar()?,
            supported_extensions: config.supported_extensions.clone(),
            audit_log: AuditLog::new(config.excel_log_path.clone(), config.retry_policy()),
            manifest: ManifestStore::new(config.manifest_path()),
            renamer: ConflictSafeRenamer::with_clock(clock),
        })
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit_log
    }

    pub fn manifest(&self) -> &ManifestStore {
        &self.manifest
    }

    /// Load the processed-set snapshot and run one pass.
    pub fn run(&self) -> Result<PassReport> {
        self.check_environment()?;
        let processed = self.audit_log.processed_set()?;
        info!(count = processed.len(), "Loaded already processed folders from log");
        self.pass(&processed)
    }

    /// Run one pass against an explicit snapshot of processed folders.
    ///
    /// Environment problems (missing source directory, unusable audit log,
    /// uncreatable destination) abort before any folder is touched.
    pub fn run_with(&self, processed: &ProcessedSet) -> Result<PassReport> {
        self.check_environment()?;
        self.pass(processed)
    }

    fn pass(&self, processed: &ProcessedSet) -> Result<PassReport> {
        let candidates = self.candidates()?;
        let mut report = PassReport {
            processed_before: processed.len(),
            outcomes: Vec::with_capacity(candidates.len()),
        };
        if candidates.is_empty() {
            info!(source = %self.source_dir.display(), "No subfolders found in source directory");
            return Ok(report);
        }
        info!(count = candidates.len(), "Found subfolders to process");

        for folder in candidates {
            let outcome = self.ingest_folder(&folder, processed);
            match &outcome {
                FolderOutcome::Failed { name, stage: Stage::Log, error } => {
                    error!(folder = %name, error = %error, "Folder archived but missing from audit log");
                }
                FolderOutcome::Failed { name, stage, error } => {
                    error!(folder = %name, stage = %stage, error = %error, "Folder left in place for a later pass");
                }
                _ => {}
            }
            report.outcomes.push(outcome);
        }

        info!(
            ingested = report.ingested(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Pass complete"
        );
        Ok(report)
    }

    fn check_environment(&self) -> Result<()> {
        if !self.source_dir.is_dir() {
            return Err(IngestError::SourceNotFound(self.source_dir.clone()));
        }
        self.audit_log.verify()?;
        fs::create_dir_all(&self.destination_dir)?;
        Ok(())
    }

    /// Immediate subdirectories of the source, in name order.
    fn candidates(&self) -> Result<Vec<PathBuf>> {
        let mut folders = Vec::new();
        let walker = WalkDir::new(&self.source_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_dir() {
                folders.push(entry.into_path());
            }
        }
        Ok(folders)
    }

    fn ingest_folder(&self, folder: &Path, processed: &ProcessedSet) -> FolderOutcome {
        // Discovered
        let Some(name) = folder.file_name().and_then(|n| n.to_str()) else {
            warn!(path = %folder.display(), "Skipping folder with non UTF-8 name");
            return FolderOutcome::SkippedNonUtf8 {
                path: folder.to_path_buf(),
            };
        };

        if processed.contains(name) {
            info!(folder = name, "Skipping, already processed");
            return FolderOutcome::SkippedProcessed {
                name: name.to_string(),
            };
        }
        if self.destination_dir.join(name).exists() {
            info!(folder = name, "Skipping, already exists in destination");
            return FolderOutcome::SkippedExists {
                name: name.to_string(),
            };
        }

        info!(folder = name, "Processing folder");
        let failed = |stage: Stage, err: IngestError| FolderOutcome::Failed {
            name: name.to_string(),
            stage,
            error: err.to_string(),
        };

        // NameNormalized
        let (normalized, flag) = normalize(name, &self.folder_grammar);
        match flag {
            NamingFlag::Ok => debug!(folder = name, "Name validated"),
            NamingFlag::NeedsReview => warn!(
                folder = name,
                "Folder name does not match convention, flagged for review"
            ),
        }
        let folder = if normalized != name {
            match self.renamer.rename_in_place(folder, &normalized) {
                Ok(renamed) => {
                    info!(from = name, to = %normalized, "Renamed folder");
                    renamed
                }
                Err(err) => return failed(Stage::Normalize, err),
            }
        } else {
            folder.to_path_buf()
        };

        // FilesProcessed
        let processor = FolderFileProcessor::new(&self.supported_extensions, &self.file_grammar);
        let mut files = match processor.process(&folder, &self.renamer) {
            Ok(files) => files,
            Err(err) => return failed(Stage::ProcessFiles, err),
        };

        // Relocated
        let moved = match self.renamer.move_dir(&folder, &self.destination_dir) {
            Ok(moved) => moved,
            Err(err) => return failed(Stage::Relocate, err),
        };
        info!(folder = %normalized, destination = %moved.display(), "Moved folder");

        // Logged
        let processed_at = self.renamer.clock().now();
        let rows = match audit_rows(&moved, &normalized, flag, processed_at) {
            Ok(rows) => rows,
            Err(err) => return failed(Stage::Log, err),
        };
        if let Err(err) = self.audit_log.append(&rows) {
            return failed(Stage::Log, err);
        }

        rebase_manifest(&mut files.manifest, &moved);
        if let Err(err) = self.manifest.append(&files.manifest) {
            // The folder is already archived and logged; only the mapping
            // rows are missing.
            warn!(folder = %normalized, error = %err, "Could not write file mappings");
        }

        FolderOutcome::Ingested {
            original_name: name.to_string(),
            name: normalized,
            flag,
            destination: moved,
            files: FileCounts::from_processed(&files, rows.len()),
        }
    }
}

/// One audit row per file anywhere under `folder`, or a single placeholder
/// row when it holds none.
pub fn audit_rows(
    folder: &Path,
    folder_name: &str,
    flag: NamingFlag,
    processed_at: DateTime<Local>,
) -> Result<Vec<AuditRow>> {
    let mut rows = Vec::new();
    for entry in WalkDir::new(folder).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(folder)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();
        let created = entry.metadata().ok().as_ref().and_then(created_time);
        rows.push(AuditRow::for_file(
            folder_name,
            flag,
            processed_at,
            entry.file_name().to_string_lossy().into_owned(),
            relative,
            created,
        ));
    }

    if rows.is_empty() {
        rows.push(AuditRow::empty_folder(folder_name, flag, processed_at));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::EMPTY_FOLDER_SENTINEL;
    use tempfile::TempDir;

    #[test]
    fn audit_rows_cover_nested_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("top.las"), "a").unwrap();
        fs::write(dir.path().join("sub/low.laz"), "b").unwrap();

        let rows = audit_rows(dir.path(), "2586 Town Hall", NamingFlag::Ok, Local::now()).unwrap();

        assert_eq!(rows.len(), 2);
        let paths: Vec<_> = rows.iter().map(|r| PathBuf::from(&r.file_path)).collect();
        assert!(paths.contains(&PathBuf::from("top.las")));
        assert!(paths.contains(&Path::new("sub").join("low.laz")));
        assert!(rows.iter().all(|r| !r.file_created_date.is_empty()));
    }

    #[test]
    fn empty_folder_gets_one_placeholder_row() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("only_dirs")).unwrap();

        let rows = audit_rows(dir.path(), "2586 Town Hall", NamingFlag::NeedsReview, Local::now())
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].file_name, EMPTY_FOLDER_SENTINEL);
        assert_eq!(rows[0].file_path, "");
        assert_eq!(rows[0].naming_flag, "X");
    }

    #[test]
    fn report_counts() {
        let report = PassReport {
            processed_before: 1,
            outcomes: vec![
                FolderOutcome::SkippedProcessed { name: "a".into() },
                FolderOutcome::Failed {
                    name: "b".into(),
                    stage: Stage::Relocate,
                    error: "boom".into(),
                },
                FolderOutcome::Ingested {
                    original_name: "2586_c".into(),
                    name: "2586 c".into(),
                    flag: NamingFlag::Ok,
                    destination: PathBuf::from("/archive/2586 c"),
                    files: FileCounts::default(),
                },
            ],
        };
        assert_eq!(report.ingested(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.has_failures());
    }
}
