//! CLI module for scandrop
//!
//! Commands load the YAML configuration themselves so that configuration
//! problems surface as [`error::HelpfulError`]s before any folder is touched.

pub mod check;
pub mod error;
pub mod output;
pub mod run;

use error::HelpfulError;
use scandrop::ingest::IngestError;
use scandrop::IngestConfig;
use std::path::Path;

/// Load and validate the configuration at `path`.
pub fn load_config(path: &Path) -> anyhow::Result<IngestConfig> {
    if !path.exists() {
        return Err(HelpfulError::config_not_found(path).into());
    }
    IngestConfig::load(path).map_err(|err| match err {
        IngestError::Io(io) => HelpfulError::cannot_read_file(path, &io.to_string()).into(),
        other => HelpfulError::invalid_config(path, &other.to_string()).into(),
    })
}
