//! Collision-safe renames and folder relocation.
//!
//! Both operations compute a natural target, fall back once to a
//! `_YYYYMMDD_HHMMSS` suffixed target when it is occupied, and give up if
//! that is occupied too. Existing entries are never replaced.

use super::error::{IngestError, Result};
use super::types::FlagPrefix;
use chrono::{DateTime, Local};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const SUFFIX_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Source of the collision suffix timestamp.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

impl<F> Clock for F
where
    F: Fn() -> DateTime<Local>,
{
    fn now(&self) -> DateTime<Local> {
        self()
    }
}

pub struct ConflictSafeRenamer<C = SystemClock> {
    clock: C,
}

impl Default for ConflictSafeRenamer<SystemClock> {
    fn default() -> Self {
        Self { clock: SystemClock }
    }
}

impl ConflictSafeRenamer<SystemClock> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: Clock> ConflictSafeRenamer<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Prefix a file's name in place: `survey.las` -> `RENAME_survey.las`.
    pub fn rename(&self, path: &Path, prefix: FlagPrefix) -> Result<PathBuf> {
        let name = file_name_str(path)?;
        let parent = parent_dir(path);
        let flagged = format!("{}{}", prefix.as_str(), name);

        let target = self.free_target(&parent, &flagged, true)?;
        fs::rename(path, &target)?;
        debug!(from = %path.display(), to = %target.display(), "Flagged file");
        Ok(target)
    }

    /// Rename `path` within its parent directory to exactly `new_name`.
    ///
    /// Fails with [`IngestError::TargetOccupied`] instead of replacing an
    /// existing entry.
    pub fn rename_in_place(&self, path: &Path, new_name: &str) -> Result<PathBuf> {
        let target = parent_dir(path).join(new_name);
        if entry_exists(&target) {
            return Err(IngestError::TargetOccupied(target));
        }
        fs::rename(path, &target)?;
        Ok(target)
    }

    /// Move a folder into `destination_root`, keeping its name unless that
    /// name is taken there.
    pub fn move_dir(&self, source: &Path, destination_root: &Path) -> Result<PathBuf> {
        let name = file_name_str(source)?;
        let target = self.free_target(destination_root, name, false)?;

        match fs::rename(source, &target) {
            Ok(()) => {}
            Err(err) if is_cross_device(&err) => {
                info!(
                    from = %source.display(),
                    to = %target.display(),
                    "Source and destination are on different volumes, copying"
                );
                copy_verify_replace(source, &target)?;
            }
            Err(err) => return Err(err.into()),
        }

        Ok(target)
    }

    /// `dir/name`, or `dir/<stem>_<timestamp>[.ext]` when that is taken.
    fn free_target(&self, dir: &Path, name: &str, keep_extension: bool) -> Result<PathBuf> {
        let natural = dir.join(name);
        if !entry_exists(&natural) {
            return Ok(natural);
        }

        let stamp = self.clock.now().format(SUFFIX_FORMAT).to_string();
        let suffixed = if keep_extension {
            suffix_before_extension(name, &stamp)
        } else {
            format!("{}_{}", name, stamp)
        };
        let fallback = dir.join(suffixed);
        if entry_exists(&fallback) {
            return Err(IngestError::Collision(fallback));
        }

        warn!(
            natural = %natural.display(),
            fallback = %fallback.display(),
            "Target already exists, using timestamped name"
        );
        Ok(fallback)
    }
}

fn suffix_before_extension(name: &str, stamp: &str) -> String {
    let path = Path::new(name);
    match (
        path.file_stem().and_then(|s| s.to_str()),
        path.extension().and_then(|e| e.to_str()),
    ) {
        (Some(stem), Some(ext)) => format!("{}_{}.{}", stem, stamp, ext),
        _ => format!("{}_{}", name, stamp),
    }
}

fn file_name_str(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| IngestError::NonUtf8Name(path.to_path_buf()))
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Existence without following symlinks, so a dangling link still counts.
fn entry_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

#[cfg(unix)]
fn is_cross_device(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EXDEV)
}

#[cfg(windows)]
fn is_cross_device(err: &io::Error) -> bool {
    const ERROR_NOT_SAME_DEVICE: i32 = 17;
    err.raw_os_error() == Some(ERROR_NOT_SAME_DEVICE)
}

#[cfg(not(any(unix, windows)))]
fn is_cross_device(_err: &io::Error) -> bool {
    false
}

/// Cross-volume move: copy into a hidden staging directory beside the
/// target, verify, rename the staging directory onto the target, and only
/// then remove the source.
fn copy_verify_replace(source: &Path, target: &Path) -> Result<()> {
    let root = parent_dir(target);
    let staging_name = format!(
        ".{}.partial",
        target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    );
    let staging = root.join(staging_name);
    if entry_exists(&staging) {
        fs::remove_dir_all(&staging)?;
    }

    let staged = copy_dir_all(source, &staging).and_then(|_| verify_copy(source, &staging));
    if let Err(err) = staged {
        let _ = fs::remove_dir_all(&staging);
        return Err(err);
    }

    if entry_exists(target) {
        let _ = fs::remove_dir_all(&staging);
        return Err(IngestError::TargetOccupied(target.to_path_buf()));
    }
    fs::rename(&staging, target)?;

    // The verified copy is in place; a leftover source must not turn the
    // move into a failure, or the folder would never be logged.
    if let Err(err) = fs::remove_dir_all(source) {
        warn!(
            source = %source.display(),
            target = %target.display(),
            error = %err,
            "Folder copied but the source could not be removed"
        );
    }
    Ok(())
}

fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;
    for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| IngestError::Config(e.to_string()))?;
        let to = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&to)?;
        } else {
            fs::copy(entry.path(), &to)?;
        }
    }
    Ok(())
}

fn verify_copy(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| IngestError::Config(e.to_string()))?;
        let copied = dst.join(rel);
        let expected = entry.metadata()?.len();
        let actual = fs::metadata(&copied)
            .map(|m| m.len())
            .map_err(|e| IngestError::CopyVerification {
                path: copied.clone(),
                reason: e.to_string(),
            })?;
        if expected != actual {
            return Err(IngestError::CopyVerification {
                path: copied,
                reason: format!("expected {} bytes, found {}", expected, actual),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_clock() -> impl Fn() -> DateTime<Local> {
        || Local.with_ymd_and_hms(2026, 1, 8, 9, 30, 15).unwrap()
    }

    #[test]
    fn rename_adds_prefix() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("survey_data.las");
        fs::write(&file, "points").unwrap();

        let renamed = ConflictSafeRenamer::new()
            .rename(&file, FlagPrefix::Rename)
            .unwrap();

        assert_eq!(renamed, dir.path().join("RENAME_survey_data.las"));
        assert!(!file.exists());
        assert_eq!(fs::read_to_string(renamed).unwrap(), "points");
    }

    #[test]
    fn rename_collision_appends_timestamp_before_extension() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.txt");
        let occupied = dir.path().join("UNSUPPORTED_file.txt");
        fs::write(&file, "new").unwrap();
        fs::write(&occupied, "old").unwrap();

        let renamer = ConflictSafeRenamer::with_clock(fixed_clock());
        let renamed = renamer.rename(&file, FlagPrefix::Unsupported).unwrap();

        assert_eq!(
            renamed,
            dir.path().join("UNSUPPORTED_file_20260108_093015.txt")
        );
        assert_ne!(renamed, occupied);
        assert_ne!(renamed, file);
        assert_eq!(fs::read_to_string(&occupied).unwrap(), "old");
        assert_eq!(fs::read_to_string(&renamed).unwrap(), "new");
    }

    #[test]
    fn second_collision_is_fatal_and_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.txt");
        fs::write(&file, "new").unwrap();
        fs::write(dir.path().join("UNSUPPORTED_file.txt"), "old").unwrap();
        fs::write(dir.path().join("UNSUPPORTED_file_20260108_093015.txt"), "older").unwrap();

        let renamer = ConflictSafeRenamer::with_clock(fixed_clock());
        let err = renamer.rename(&file, FlagPrefix::Unsupported).unwrap_err();

        assert!(matches!(err, IngestError::Collision(_)));
        assert_eq!(fs::read_to_string(&file).unwrap(), "new");
    }

    #[test]
    fn move_dir_keeps_name_when_free() {
        let src_root = TempDir::new().unwrap();
        let dst_root = TempDir::new().unwrap();
        let folder = src_root.path().join("2586 Town Hall");
        fs::create_dir_all(folder.join("sub")).unwrap();
        fs::write(folder.join("sub/a.las"), "a").unwrap();

        let moved = ConflictSafeRenamer::new()
            .move_dir(&folder, dst_root.path())
            .unwrap();

        assert_eq!(moved, dst_root.path().join("2586 Town Hall"));
        assert!(!folder.exists());
        assert!(moved.join("sub/a.las").exists());
    }

    #[test]
    fn move_dir_collision_suffixes_folder_name() {
        let src_root = TempDir::new().unwrap();
        let dst_root = TempDir::new().unwrap();
        let folder = src_root.path().join("2586 Town Hall");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("new.las"), "new").unwrap();
        let existing = dst_root.path().join("2586 Town Hall");
        fs::create_dir(&existing).unwrap();
        fs::write(existing.join("old.las"), "old").unwrap();

        let renamer = ConflictSafeRenamer::with_clock(fixed_clock());
        let moved = renamer.move_dir(&folder, dst_root.path()).unwrap();

        assert_eq!(
            moved,
            dst_root.path().join("2586 Town Hall_20260108_093015")
        );
        assert!(existing.join("old.las").exists());
        assert!(!existing.join("new.las").exists());
        assert!(moved.join("new.las").exists());
    }

    #[test]
    fn rename_in_place_refuses_occupied_target() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("2586_Town Hall");
        fs::create_dir(&folder).unwrap();
        fs::create_dir(dir.path().join("2586 Town Hall")).unwrap();

        let err = ConflictSafeRenamer::new()
            .rename_in_place(&folder, "2586 Town Hall")
            .unwrap_err();

        assert!(matches!(err, IngestError::TargetOccupied(_)));
        assert!(folder.exists());
    }

    #[test]
    fn copy_verify_replace_moves_tree() {
        let src_root = TempDir::new().unwrap();
        let dst_root = TempDir::new().unwrap();
        let folder = src_root.path().join("2586 Town Hall");
        fs::create_dir_all(folder.join("nested/deeper")).unwrap();
        fs::write(folder.join("top.las"), "top").unwrap();
        fs::write(folder.join("nested/deeper/low.laz"), "low").unwrap();
        let target = dst_root.path().join("2586 Town Hall");

        copy_verify_replace(&folder, &target).unwrap();

        assert!(!folder.exists());
        assert_eq!(fs::read_to_string(target.join("top.las")).unwrap(), "top");
        assert_eq!(
            fs::read_to_string(target.join("nested/deeper/low.laz")).unwrap(),
            "low"
        );
        assert!(!dst_root.path().join(".2586 Town Hall.partial").exists());
    }

    #[cfg(unix)]
    #[test]
    fn copy_verify_replace_succeeds_when_source_cannot_be_removed() {
        use std::os::unix::fs::PermissionsExt;

        let src_root = TempDir::new().unwrap();
        let dst_root = TempDir::new().unwrap();
        let parent = src_root.path().join("locked");
        let folder = parent.join("2586 Town Hall");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("top.las"), "top").unwrap();
        fs::set_permissions(&parent, fs::Permissions::from_mode(0o555)).unwrap();
        let target = dst_root.path().join("2586 Town Hall");

        let result = copy_verify_replace(&folder, &target);

        fs::set_permissions(&parent, fs::Permissions::from_mode(0o755)).unwrap();
        result.unwrap();
        assert_eq!(fs::read_to_string(target.join("top.las")).unwrap(), "top");
        assert!(!dst_root.path().join(".2586 Town Hall.partial").exists());
        // Permission bits do not stop root from removing the source.
        if unsafe { libc::geteuid() } != 0 {
            assert!(folder.exists());
        }
    }

    #[cfg(unix)]
    #[test]
    fn copy_verify_replace_follows_file_symlinks() {
        let src_root = TempDir::new().unwrap();
        let dst_root = TempDir::new().unwrap();
        let folder = src_root.path().join("2586 Town Hall");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("data.las"), "points and more points").unwrap();
        std::os::unix::fs::symlink("data.las", folder.join("alias.las")).unwrap();
        let target = dst_root.path().join("2586 Town Hall");

        copy_verify_replace(&folder, &target).unwrap();

        assert_eq!(
            fs::read_to_string(target.join("alias.las")).unwrap(),
            "points and more points"
        );
        assert!(!folder.exists());
    }

    #[test]
    fn suffix_handles_names_without_extension() {
        assert_eq!(suffix_before_extension("notes", "20260108_093015"), "notes_20260108_093015");
        assert_eq!(
            suffix_before_extension("a.b.las", "20260108_093015"),
            "a.b_20260108_093015.las"
        );
    }
}
