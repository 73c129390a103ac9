//! Event source abstraction for fetching vault events from an indexer or node.

use crate::domain::{BlockNumber, VaultEvent};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod mock;

pub use mock::MockEventSource;

/// Source of vault events.
///
/// Implementations handle pagination, retry and rate limiting themselves.
#[async_trait]
pub trait EventSource: Send + Sync + fmt::Debug {
    /// Fetch events emitted in `from_block..=to_block`.
    ///
    /// # Returns
    /// Events ordered by block, then by log position within the block.
    async fn fetch_events(
        &self,
        from_block: BlockNumber,
        to_block: BlockNumber,
    ) -> Result<Vec<VaultEvent>, EventSourceError>;
}

/// Error type for event source operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    #[error("Network error: {0}")]
    NetworkError(String),
    /// Requested range is past the source's head
    #[error("Block {requested} is ahead of source head {head}")]
    AheadOfHead { requested: u64, head: u64 },
    #[error("Error: {0}")]
    Other(String),
}
