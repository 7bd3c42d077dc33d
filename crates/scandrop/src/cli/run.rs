//! Run and watch commands - ingestion passes over the drop directory

use crate::cli::error::HelpfulError;
use crate::cli::{load_config, output};
use scandrop::ingest::IngestError;
use scandrop::{IngestionOrchestrator, PassReport};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug)]
pub struct RunArgs {
    pub config: PathBuf,
    pub json: bool,
}

#[derive(Debug)]
pub struct WatchArgs {
    pub config: PathBuf,
    pub interval_secs: u64,
}

/// Execute one pass and report it.
pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    info!(
        source = %config.source_dir.display(),
        destination = %config.destination_dir.display(),
        log = %config.excel_log_path.display(),
        "Configuration loaded"
    );

    let orchestrator = IngestionOrchestrator::from_config(&config)?;
    let report = run_pass(&orchestrator)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_report(&report);
    }

    if report.has_failures() {
        return Err(HelpfulError::folders_failed(report.failed()).into());
    }
    Ok(())
}

/// Execute passes every `interval_secs` until the process is stopped.
///
/// Configuration is loaded once; a pass that fails for environmental
/// reasons (source share offline) is logged and retried on the next tick.
pub fn watch(args: WatchArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let orchestrator = IngestionOrchestrator::from_config(&config)?;
    let interval = Duration::from_secs(args.interval_secs.max(1));
    info!(interval_secs = interval.as_secs(), "Watching source directory");

    loop {
        match run_pass(&orchestrator) {
            Ok(report) => info!("{}", output::summary_line(&report)),
            Err(err) => error!(error = %err, "Pass aborted"),
        }
        std::thread::sleep(interval);
    }
}

fn run_pass(orchestrator: &IngestionOrchestrator) -> anyhow::Result<PassReport> {
    orchestrator.run().map_err(|err| match err {
        IngestError::SourceNotFound(path) => HelpfulError::source_not_found(&path).into(),
        err @ (IngestError::AuditFormat { .. } | IngestError::Csv(_) | IngestError::Locked { .. }) => {
            HelpfulError::audit_log_unusable(orchestrator.audit_log().path(), &err.to_string()).into()
        }
        other => anyhow::Error::new(other).context("Ingestion pass aborted"),
    })
}
