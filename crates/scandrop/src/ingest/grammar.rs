//! Naming grammars for folder names and file stems.

use super::error::{IngestError, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

/// Default grammar for delivery folder names: project number, optional
/// two-digit sub-index, a space, then free text.
pub const DEFAULT_FOLDER_PATTERN: &str = r"^\d{4}(\.\d{2})?[ ].+";

/// Default grammar for file stems (file name without extension).
pub const DEFAULT_FILE_PATTERN: &str = r"^(?P<project>\d{4})_(?P<date>\d{6})_(?P<floor>Floor\s*\d+|Exterior|Basement)(_(?P<scope>.+))?$";

/// A compiled naming grammar.
///
/// Matching always covers the whole string, whether or not the configured
/// pattern carries its own `^`/`$` anchors.
#[derive(Clone)]
pub struct NamingGrammar {
    source: String,
    regex: Regex,
}

impl NamingGrammar {
    pub fn new(pattern: &str) -> Result<Self> {
        let anchored = format!("^(?:{})$", pattern);
        let regex = Regex::new(&anchored)
            .map_err(|e| IngestError::Pattern(format!("invalid pattern '{}': {}", pattern, e)))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn default_folder() -> Self {
        Self::new(DEFAULT_FOLDER_PATTERN).expect("default folder pattern compiles")
    }

    pub fn default_file() -> Self {
        Self::new(DEFAULT_FILE_PATTERN).expect("default file pattern compiles")
    }

    /// The pattern as configured.
    pub fn pattern(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// Named groups that participated in a whole-string match.
    pub fn captures(&self, name: &str) -> Option<BTreeMap<String, String>> {
        let caps = self.regex.captures(name)?;
        let fields = self
            .regex
            .capture_names()
            .flatten()
            .filter_map(|group| {
                caps.name(group)
                    .map(|m| (group.to_string(), m.as_str().to_string()))
            })
            .collect();
        Some(fields)
    }
}

impl fmt::Debug for NamingGrammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamingGrammar").field(&self.source).finish()
    }
}

/// Test `name` against `grammar` as a whole-string match.
pub fn matches(name: &str, grammar: &NamingGrammar) -> bool {
    grammar.matches(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_grammar_requires_space_separated_description() {
        let grammar = NamingGrammar::default_folder();
        assert!(matches("2586 Town Hall", &grammar));
        assert!(matches("2586.01 Town Hall", &grammar));
        assert!(!matches("2586_Town Hall", &grammar));
        assert!(!matches("2586", &grammar));
        assert!(!matches("Town Hall 2586", &grammar));
    }

    #[test]
    fn matching_is_anchored_at_both_ends() {
        let grammar = NamingGrammar::new(r"\d{4}").unwrap();
        assert!(grammar.matches("2586"));
        assert!(!grammar.matches("x2586"));
        assert!(!grammar.matches("25867"));
    }

    #[test]
    fn captures_expose_named_fields() {
        let grammar = NamingGrammar::default_file();
        let fields = grammar.captures("2586_251231_Floor 1_Wing P").unwrap();
        assert_eq!(fields["project"], "2586");
        assert_eq!(fields["date"], "251231");
        assert_eq!(fields["floor"], "Floor 1");
        assert_eq!(fields["scope"], "Wing P");

        let fields = grammar.captures("2635_240502_Exterior").unwrap();
        assert_eq!(fields["floor"], "Exterior");
        assert!(!fields.contains_key("scope"));

        assert!(grammar.captures("survey_data").is_none());
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = NamingGrammar::new(r"(\d{4}").unwrap_err();
        assert!(matches!(err, IngestError::Pattern(_)));
    }
}
