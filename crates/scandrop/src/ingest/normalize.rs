//! Folder name repair.
//!
//! Repairs are plain string rewrites tried in a fixed order; the first one
//! whose result satisfies the folder grammar wins. A name no rewrite can fix
//! is returned untouched with [`NamingFlag::NeedsReview`].

use super::grammar::NamingGrammar;
use super::types::NamingFlag;
use once_cell::sync::Lazy;
use regex::Regex;

/// Project number followed by a hyphen or underscore.
static PROJECT_THEN_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4}(?:\.\d{2})?)[-_]").expect("separator repair pattern compiles")
});

/// Leading project number glued to the description.
static LEADING_PROJECT_GLUED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}(?:\.\d{2})?)(\S)").expect("glued repair pattern compiles")
});

/// Normalize a folder name against `grammar`.
pub fn normalize(name: &str, grammar: &NamingGrammar) -> (String, NamingFlag) {
    if grammar.matches(name) {
        return (name.to_string(), NamingFlag::Ok);
    }

    let separated = PROJECT_THEN_SEPARATOR.replace_all(name, "${1} ");
    if grammar.matches(&separated) {
        return (separated.into_owned(), NamingFlag::Ok);
    }

    let spaced = LEADING_PROJECT_GLUED.replace(name, "${1} ${2}");
    if grammar.matches(&spaced) {
        return (spaced.into_owned(), NamingFlag::Ok);
    }

    (name.to_string(), NamingFlag::NeedsReview)
}
