use crate::datasource::{EventSource, EventSourceError};
use crate::db::{EventStatus, ProcessedEvent, Repository};
use crate::domain::{BlockNumber, VaultEvent};
use crate::orchestration::processor::EventProcessor;
use crate::store::MemoryStore;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Feeds vault events through the processor and persists the result.
///
/// The store is loaded once and then kept in memory; the mutex serializes
/// every mutation. Between calls it always mirrors what SQLite holds.
pub struct Ingestor {
    repo: Arc<Repository>,
    processor: EventProcessor,
    store: Mutex<MemoryStore>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionResult {
    pub events_seen: usize,
    pub events_applied: usize,
    pub duplicates_skipped: usize,
    pub invalid_skipped: usize,
    pub liquidity_rejections: usize,
}

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error(transparent)]
    Source(#[from] EventSourceError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl Ingestor {
    /// Hydrate the in-memory store from the repository.
    pub async fn open(
        repo: Arc<Repository>,
        processor: EventProcessor,
    ) -> Result<Self, IngestionError> {
        let store = repo.load_store().await?;
        Ok(Self {
            repo,
            processor,
            store: Mutex::new(store),
        })
    }

    /// Fetch `from..=to` from `source` and ingest it.
    pub async fn sync(
        &self,
        source: &dyn EventSource,
        from: BlockNumber,
        to: BlockNumber,
    ) -> Result<IngestionResult, IngestionError> {
        let events = source.fetch_events(from, to).await?;
        self.ingest(&events).await
    }

    /// Apply each event not seen before, in order, and persist the batch.
    ///
    /// Events already in the processed-event ledger, or repeated within the
    /// batch, are skipped. Invalid events are logged, recorded and skipped.
    /// If the batch cannot be persisted, the in-memory store is rolled back
    /// to its state before the call.
    pub async fn ingest(&self, events: &[VaultEvent]) -> Result<IngestionResult, IngestionError> {
        let mut store = self.store.lock().await;

        let keys: Vec<_> = events.iter().map(|e| e.key.clone()).collect();
        let fresh = self.repo.unprocessed_keys(&keys).await?;
        let committed = store.clone();

        let mut result = IngestionResult {
            events_seen: events.len(),
            ..IngestionResult::default()
        };
        let mut seen = HashSet::new();
        let mut processed = Vec::new();

        for event in events {
            if !fresh.contains(&event.key) || !seen.insert(event.key.clone()) {
                result.duplicates_skipped += 1;
                continue;
            }

            let status = match self.processor.process(&mut *store, event) {
                Ok(outcome) => {
                    result.events_applied += 1;
                    if outcome.liquidity_committed == Some(false) {
                        result.liquidity_rejections += 1;
                    }
                    EventStatus::Applied
                }
                Err(err) => {
                    warn!(
                        key = %event.key,
                        kind = event.kind.name(),
                        block = %event.block,
                        error = %err,
                        "Skipping invalid event"
                    );
                    result.invalid_skipped += 1;
                    EventStatus::Invalid
                }
            };
            processed.push(ProcessedEvent {
                key: event.key.clone(),
                block: event.block,
                kind: event.kind.name(),
                status,
            });
        }

        let changes = store.take_changes();
        if let Err(err) = self.repo.persist_batch(&changes, &processed).await {
            warn!(error = %err, "Persisting batch failed, rolling back store");
            *store = committed;
            return Err(err.into());
        }

        info!(
            seen = result.events_seen,
            applied = result.events_applied,
            duplicates = result.duplicates_skipped,
            invalid = result.invalid_skipped,
            rejections = result.liquidity_rejections,
            rows = changes.len(),
            "Ingested event batch"
        );
        Ok(result)
    }

    /// Run `f` against the current in-memory state.
    pub async fn with_store<R>(&self, f: impl FnOnce(&MemoryStore) -> R) -> R {
        let store = self.store.lock().await;
        f(&store)
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }
}
