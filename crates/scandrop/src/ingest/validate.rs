//! File name checks and the precedence between them.

use super::grammar::NamingGrammar;
use super::types::{FileVerdict, RENAME_PREFIX, UNSUPPORTED_PREFIX};
use std::path::Path;

/// Default allow-list of point-cloud extensions.
pub const DEFAULT_SUPPORTED_EXTENSIONS: &[&str] = &["las", "laz", "pcd", "ply", "xyz", "rcp", "rcs"];

/// Extension of `filename` without the dot, if any.
pub fn extension_of(filename: &str) -> Option<&str> {
    Path::new(filename).extension().and_then(|e| e.to_str())
}

/// `filename` without its extension.
pub fn stem_of(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

/// True when the name carries a flag from an earlier pass.
pub fn is_already_flagged(filename: &str) -> bool {
    filename.starts_with(RENAME_PREFIX) || filename.starts_with(UNSUPPORTED_PREFIX)
}

/// Case-insensitive membership of the extension in `supported_exts`.
///
/// Entries in `supported_exts` are bare extensions; a stray leading dot is
/// tolerated.
pub fn is_supported_extension<S: AsRef<str>>(filename: &str, supported_exts: &[S]) -> bool {
    let Some(ext) = extension_of(filename) else {
        return false;
    };
    supported_exts
        .iter()
        .any(|allowed| allowed.as_ref().trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// Whether the stem of `filename` satisfies the file grammar.
///
/// Stems already carrying a flag prefix never validate.
pub fn is_valid_filename(filename: &str, grammar: &NamingGrammar) -> bool {
    let stem = stem_of(filename);
    if is_already_flagged(stem) {
        return false;
    }
    grammar.matches(stem)
}

/// Classify a file name. First match wins: already flagged, unsupported
/// extension, invalid name, valid.
pub fn classify<S: AsRef<str>>(
    filename: &str,
    supported_exts: &[S],
    grammar: &NamingGrammar,
) -> FileVerdict {
    if is_already_flagged(filename) {
        FileVerdict::AlreadyFlagged
    } else if !is_supported_extension(filename, supported_exts) {
        FileVerdict::UnsupportedExtension
    } else if !is_valid_filename(filename, grammar) {
        FileVerdict::InvalidName
    } else {
        FileVerdict::Valid
    }
}
