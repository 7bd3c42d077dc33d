//! Per-folder file validation and flagging.

use super::error::Result;
use super::grammar::NamingGrammar;
use super::rename::{Clock, ConflictSafeRenamer};
use super::types::{FileClassification, FileEntry, FileVerdict, ManifestRecord};
use super::validate::{classify, extension_of};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs::Metadata;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Files seen directly inside one folder and the manifest of accepted ones.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessedFolder {
    pub entries: Vec<FileEntry>,
    pub manifest: Vec<ManifestRecord>,
}

impl ProcessedFolder {
    pub fn count(&self, classification: FileClassification) -> usize {
        self.entries
            .iter()
            .filter(|e| e.classification == classification)
            .count()
    }
}

pub struct FolderFileProcessor<'a> {
    supported_extensions: &'a [String],
    grammar: &'a NamingGrammar,
}

impl<'a> FolderFileProcessor<'a> {
    pub fn new(supported_extensions: &'a [String], grammar: &'a NamingGrammar) -> Self {
        Self {
            supported_extensions,
            grammar,
        }
    }

    /// Validate every regular file directly inside `folder`, flagging the
    /// ones that fail. Subdirectories are left alone.
    ///
    /// Manifest records point at the file's current location; the caller
    /// rebases `new_path` once the folder has been relocated.
    pub fn process<C: Clock>(
        &self,
        folder: &Path,
        renamer: &ConflictSafeRenamer<C>,
    ) -> Result<ProcessedFolder> {
        let folder_name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let processed_at = renamer.clock().now();
        let mut result = ProcessedFolder::default();

        let walker = WalkDir::new(folder)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                warn!(path = %path.display(), "Skipping file with non UTF-8 name");
                continue;
            };
            let created = entry.metadata().ok().as_ref().and_then(created_time);
            let extension = extension_of(name).unwrap_or_default().to_string();

            let verdict = classify(name, self.supported_extensions, self.grammar);
            let (classification, current_path) = match verdict.flag_prefix() {
                Some(prefix) => {
                    let flagged = renamer.rename(path, prefix)?;
                    match verdict {
                        FileVerdict::UnsupportedExtension => warn!(
                            file = name,
                            renamed = %flagged.display(),
                            "Unsupported extension, flagged"
                        ),
                        _ => warn!(
                            file = name,
                            renamed = %flagged.display(),
                            "File name does not match convention, flagged"
                        ),
                    }
                    let classification = if verdict == FileVerdict::UnsupportedExtension {
                        FileClassification::Unsupported
                    } else {
                        FileClassification::Renamed
                    };
                    (classification, flagged)
                }
                None if verdict == FileVerdict::AlreadyFlagged => {
                    debug!(file = name, "Already flagged by an earlier pass, skipping");
                    (FileClassification::SkippedAlreadyFlagged, path.to_path_buf())
                }
                None => {
                    result.manifest.push(ManifestRecord::new(
                        path.to_string_lossy().into_owned(),
                        path.to_string_lossy().into_owned(),
                        folder_name.clone(),
                        processed_at,
                    ));
                    (FileClassification::Valid, path.to_path_buf())
                }
            };

            result.entries.push(FileEntry {
                path: current_path,
                name: name.to_string(),
                extension,
                classification,
                created,
            });
        }

        debug!(
            folder = %folder.display(),
            files = result.entries.len(),
            valid = result.manifest.len(),
            "Processed folder files"
        );
        Ok(result)
    }
}

/// Creation time, falling back to modification time on filesystems that
/// do not record it.
pub fn created_time(metadata: &Metadata) -> Option<DateTime<Local>> {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .ok()
        .map(DateTime::<Local>::from)
}

/// Point `new_path` of each record at the same file inside `moved_folder`.
pub fn rebase_manifest(records: &mut [ManifestRecord], moved_folder: &Path) {
    for record in records.iter_mut() {
        let name = Path::new(&record.original_path)
            .file_name()
            .map(|n| n.to_os_string());
        if let Some(name) = name {
            record.new_path = moved_folder.join(name).to_string_lossy().into_owned();
        }
    }
}
