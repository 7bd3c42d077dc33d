//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(
        mut self,
        suggestions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.suggestions
            .extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// Configuration file does not exist
    pub fn config_not_found(path: &Path) -> Self {
        Self::new(format!("Configuration not found: {}", path.display()))
            .with_context("scandrop reads its settings from a YAML file")
            .with_suggestions([
                "TRY: Pass the file explicitly: scandrop --config /path/to/config.yaml run"
                    .to_string(),
                "TRY: Set SCANDROP_CONFIG to the configuration path".to_string(),
                "TRY: Required keys are source_dir, destination_dir and excel_log_path"
                    .to_string(),
            ])
    }

    /// Configuration parsed but is unusable
    pub fn invalid_config(path: &Path, reason: &str) -> Self {
        Self::new(format!("Invalid configuration: {}", path.display()))
            .with_context(reason.to_string())
            .with_suggestions([
                "TRY: Check the YAML syntax and key names".to_string(),
                "TRY: Quote regex patterns with single quotes so backslashes survive"
                    .to_string(),
            ])
    }

    /// File cannot be read (permission or encoding error)
    pub fn cannot_read_file(path: &Path, reason: &str) -> Self {
        Self::new(format!("Cannot read file: {}", path.display()))
            .with_context(reason.to_string())
            .with_suggestions([
                format!("TRY: Check file permissions: ls -la {}", path.display()),
                "TRY: Ensure the file is not open in another program".to_string(),
            ])
    }

    /// Drop directory is missing
    pub fn source_not_found(path: &Path) -> Self {
        Self::new(format!("Source directory does not exist: {}", path.display()))
            .with_context("Nothing was moved or renamed")
            .with_suggestions([
                format!("TRY: Check that the path exists: ls -la {}", path.display()),
                "TRY: Check that network shares are mounted".to_string(),
                "TRY: Fix source_dir in the configuration".to_string(),
            ])
    }

    /// Audit log exists but cannot be read as an audit table
    pub fn audit_log_unusable(path: &Path, reason: &str) -> Self {
        Self::new(format!("Audit log cannot be used: {}", path.display()))
            .with_context(format!("{}. Nothing was moved or renamed", reason))
            .with_suggestions([
                "TRY: Close the log if it is open in a spreadsheet program".to_string(),
                "TRY: Repair or restore the log from backup; its columns must be \
                 Folder Name, Naming Flag, Processed Date, File Name, File Path, File Created Date"
                    .to_string(),
                "TRY: Point excel_log_path at a new file to start a fresh log".to_string(),
            ])
    }

    /// Some folders failed during a pass
    pub fn folders_failed(failed: usize) -> Self {
        Self::new(format!(
            "{} folder{} could not be ingested",
            failed,
            if failed == 1 { "" } else { "s" }
        ))
        .with_context("Failed folders were left in the source directory")
        .with_suggestions([
            "TRY: Inspect the errors above, fix the cause and run again".to_string(),
            "TRY: Close the audit log if it is open in a spreadsheet program".to_string(),
        ])
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

/// Print an error as a JSON object on stdout for `--json` callers.
pub fn print_json_error(err: &anyhow::Error) {
    let value = match err.downcast_ref::<HelpfulError>() {
        Some(helpful) => serde_json::json!({
            "error": helpful.message,
            "context": helpful.context,
            "suggestions": helpful.suggestions,
        }),
        None => serde_json::json!({ "error": format!("{:#}", err) }),
    };
    println!("{}", value);
}
