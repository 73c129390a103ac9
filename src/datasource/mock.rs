//! Mock event source for testing without network calls.

use super::{EventSource, EventSourceError};
use crate::domain::{BlockNumber, VaultEvent};
use async_trait::async_trait;

/// Mock event source that returns predefined events.
#[derive(Debug, Clone, Default)]
pub struct MockEventSource {
    events: Vec<VaultEvent>,
    error: Option<EventSourceError>,
    head: Option<BlockNumber>,
}

impl MockEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event; events in the same block keep insertion order.
    pub fn with_event(mut self, event: VaultEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_events(mut self, events: Vec<VaultEvent>) -> Self {
        self.events.extend(events);
        self
    }

    /// Make every fetch fail with `error`.
    pub fn with_error(mut self, error: EventSourceError) -> Self {
        self.error = Some(error);
        self
    }

    /// Latest block the source has seen; ranges ending past it are refused.
    pub fn with_head(mut self, head: BlockNumber) -> Self {
        self.head = Some(head);
        self
    }
}

#[async_trait]
impl EventSource for MockEventSource {
    async fn fetch_events(
        &self,
        from_block: BlockNumber,
        to_block: BlockNumber,
    ) -> Result<Vec<VaultEvent>, EventSourceError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if let Some(head) = self.head {
            if to_block > head {
                return Err(EventSourceError::AheadOfHead {
                    requested: to_block.as_u64(),
                    head: head.as_u64(),
                });
            }
        }

        let mut events: Vec<VaultEvent> = self
            .events
            .iter()
            .filter(|e| e.block >= from_block && e.block <= to_block)
            .cloned()
            .collect();
        // Stable sort keeps in-block log order.
        events.sort_by_key(|e| e.block);
        Ok(events)
    }
}
