//! Scandrop - scan-data delivery ingestion
//!
//! Library side of the `scandrop` binary: configuration and the ingestion
//! pipeline.

pub mod config;
pub mod ingest;

pub use config::IngestConfig;
pub use ingest::{IngestError, IngestionOrchestrator, PassReport};
