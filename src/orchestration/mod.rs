//! Event handling on top of the valuation engine: per-event processing and
//! batched, exactly-once ingestion into SQLite.

pub mod ingest;
pub mod processor;

pub use ingest::{IngestionError, IngestionResult, Ingestor};
pub use processor::{EventError, EventOutcome, EventProcessor};
