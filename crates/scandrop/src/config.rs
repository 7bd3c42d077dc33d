//! Configuration for an ingestion pass

use crate::ingest::grammar::{NamingGrammar, DEFAULT_FILE_PATTERN, DEFAULT_FOLDER_PATTERN};
use crate::ingest::manifest::DEFAULT_MANIFEST_FILE;
use crate::ingest::retry::RetryPolicy;
use crate::ingest::validate::DEFAULT_SUPPORTED_EXTENSIONS;
use crate::ingest::{IngestError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Main configuration, usually read from `config.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Drop directory scanned for new delivery folders
    pub source_dir: PathBuf,

    /// Archive root the folders are moved into
    pub destination_dir: PathBuf,

    /// Audit log table
    pub excel_log_path: PathBuf,

    /// Folder name grammar
    #[serde(default = "default_naming_pattern")]
    pub naming_pattern: String,

    /// File stem grammar
    #[serde(default = "default_file_naming_pattern")]
    pub file_naming_pattern: String,

    /// Allow-listed extensions, without the dot
    #[serde(default = "default_supported_extensions")]
    pub supported_extensions: Vec<String>,

    /// Manifest of accepted files; `<destination_dir>/file_mappings.csv` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_mapping_csv: Option<PathBuf>,

    /// Attempts at writing the audit log while it is locked
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Pause between audit log attempts
    #[serde(default = "default_retry_delay_seconds")]
    pub retry_delay_seconds: u64,
}

fn default_naming_pattern() -> String {
    DEFAULT_FOLDER_PATTERN.to_string()
}

fn default_file_naming_pattern() -> String {
    DEFAULT_FILE_PATTERN.to_string()
}

fn default_supported_extensions() -> Vec<String> {
    DEFAULT_SUPPORTED_EXTENSIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_seconds() -> u64 {
    5
}

impl IngestConfig {
    /// Configuration with every optional setting at its default.
    pub fn new(
        source_dir: impl Into<PathBuf>,
        destination_dir: impl Into<PathBuf>,
        excel_log_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            destination_dir: destination_dir.into(),
            excel_log_path: excel_log_path.into(),
            naming_pattern: default_naming_pattern(),
            file_naming_pattern: default_file_naming_pattern(),
            supported_extensions: default_supported_extensions(),
            file_mapping_csv: None,
            retry_attempts: default_retry_attempts(),
            retry_delay_seconds: default_retry_delay_seconds(),
        }
    }

    /// Load and validate configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut config: IngestConfig = serde_yaml::from_str(content)?;
        config.expand_paths();
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings that would only fail halfway through a pass.
    pub fn validate(&self) -> Result<()> {
        self.folder_grammar()?;
        self.file_grammar()?;
        if self.supported_extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(IngestError::Config(
                "supported_extensions must list at least one extension".to_string(),
            ));
        }
        if self.retry_attempts == 0 {
            return Err(IngestError::Config(
                "retry_attempts must be at least 1".to_string(),
            ));
        }

        // Anything under the drop is a candidate for ingestion, including
        // an archive or log kept there.
        let source = absolute(&self.source_dir)?;
        let destination = absolute(&self.destination_dir)?;
        if source.starts_with(&destination) || destination.starts_with(&source) {
            return Err(IngestError::Config(format!(
                "source_dir ({}) and destination_dir ({}) must not contain one another",
                self.source_dir.display(),
                self.destination_dir.display()
            )));
        }
        let manifest = self.manifest_path();
        for (key, path) in [
            ("excel_log_path", &self.excel_log_path),
            ("file_mapping_csv", &manifest),
        ] {
            if absolute(path)?.starts_with(&source) {
                return Err(IngestError::Config(format!(
                    "{} ({}) must be outside source_dir",
                    key,
                    path.display()
                )));
            }
        }
        Ok(())
    }

    pub fn folder_grammar(&self) -> Result<NamingGrammar> {
        NamingGrammar::new(&self.naming_pattern)
    }

    pub fn file_grammar(&self) -> Result<NamingGrammar> {
        NamingGrammar::new(&self.file_naming_pattern)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.file_mapping_csv
            .clone()
            .unwrap_or_else(|| self.destination_dir.join(DEFAULT_MANIFEST_FILE))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_secs(self.retry_delay_seconds),
        )
    }

    fn expand_paths(&mut self) {
        self.source_dir = expand_home(&self.source_dir);
        self.destination_dir = expand_home(&self.destination_dir);
        self.excel_log_path = expand_home(&self.excel_log_path);
        if let Some(path) = self.file_mapping_csv.take() {
            self.file_mapping_csv = Some(expand_home(&path));
        }
    }
}

/// Absolute, lexically normalized form of `path`. Does not touch the
/// filesystem beyond reading the working directory.
fn absolute(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
source_dir: /data/drop
destination_dir: /data/archive
excel_log_path: /data/ingest_log.csv
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = IngestConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.source_dir, PathBuf::from("/data/drop"));
        assert_eq!(config.naming_pattern, DEFAULT_FOLDER_PATTERN);
        assert_eq!(config.file_naming_pattern, DEFAULT_FILE_PATTERN);
        assert_eq!(
            config.supported_extensions,
            vec!["las", "laz", "pcd", "ply", "xyz", "rcp", "rcs"]
        );
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_delay_seconds, 5);
        assert_eq!(
            config.manifest_path(),
            PathBuf::from("/data/archive/file_mappings.csv")
        );
    }

    #[test]
    fn explicit_settings_override_defaults() {
        let yaml = r#"
source_dir: /data/drop
destination_dir: /data/archive
excel_log_path: /data/ingest_log.csv
naming_pattern: '^\d{4} .+'
supported_extensions: [las, e57]
file_mapping_csv: /data/mappings.csv
retry_attempts: 5
retry_delay_seconds: 1
"#;
        let config = IngestConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.naming_pattern, r"^\d{4} .+");
        assert_eq!(config.supported_extensions, vec!["las", "e57"]);
        assert_eq!(config.manifest_path(), PathBuf::from("/data/mappings.csv"));
        assert_eq!(
            config.retry_policy(),
            RetryPolicy::new(5, Duration::from_secs(1))
        );
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let err = IngestConfig::from_yaml("source_dir: /data/drop\n").unwrap_err();
        assert!(matches!(err, IngestError::Yaml(_)));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let yaml = format!("{MINIMAL}naming_pattern: '(unclosed'\n");
        let err = IngestConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, IngestError::Pattern(_)));
    }

    #[test]
    fn zero_retry_attempts_is_rejected() {
        let yaml = format!("{MINIMAL}retry_attempts: 0\n");
        assert!(matches!(
            IngestConfig::from_yaml(&yaml).unwrap_err(),
            IngestError::Config(_)
        ));
    }

    #[test]
    fn nested_directories_are_rejected() {
        let cases = [
            ("/data/drop", "/data/drop/archive"),
            ("/data/archive/drop", "/data/archive"),
            ("/data/drop", "/data/drop"),
            ("drop", "./drop/../drop/archive"),
        ];
        for (source, destination) in cases {
            let config = IngestConfig::new(source, destination, "/logs/ingest_log.csv");
            assert!(
                matches!(config.validate(), Err(IngestError::Config(_))),
                "{source} / {destination} accepted"
            );
        }
    }

    #[test]
    fn sibling_directories_with_shared_prefix_are_accepted() {
        let config = IngestConfig::new("/data/drop", "/data/drop_archive", "/data/log.csv");
        config.validate().unwrap();
    }

    #[test]
    fn log_and_manifest_must_live_outside_source() {
        let config = IngestConfig::new("/data/drop", "/data/archive", "/data/drop/log.csv");
        assert!(matches!(config.validate(), Err(IngestError::Config(_))));

        let mut config = IngestConfig::new("/data/drop", "/data/archive", "/data/log.csv");
        config.file_mapping_csv = Some(PathBuf::from("/data/drop/maps/file_mappings.csv"));
        assert!(matches!(config.validate(), Err(IngestError::Config(_))));
    }

    #[test]
    fn save_and_load_roundtrip_keeps_settings() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        let mut config = IngestConfig::new("/data/drop", "/data/archive", "/data/log.csv");
        config.supported_extensions = vec!["las".to_string()];
        config.save(&path).unwrap();

        let loaded = IngestConfig::load(&path).unwrap();
        assert_eq!(loaded.supported_extensions, vec!["las"]);
        assert_eq!(loaded.file_mapping_csv, None);
    }

    #[test]
    fn tilde_expands_to_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/drop")), home.join("drop"));
        }
        assert_eq!(expand_home(Path::new("/abs/drop")), PathBuf::from("/abs/drop"));
    }
}
