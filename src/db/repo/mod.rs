//! Repository layer for database operations.
//!
//! `Repository` persists the entity store and the processed-event ledger.
//! Methods are organized across submodules by entity:
//! - `tokens.rs` - Token and latest price rows
//! - `pools.rs` - Pools, pool balances, historical liquidity, vault and snapshots

mod pools;
mod tokens;

use crate::domain::{BlockNumber, Decimal, EventKey};
use crate::store::{ChangeSet, MemoryStore};
use sqlx::sqlite::SqlitePool;
use std::collections::HashSet;
use std::str::FromStr;
use tracing::{debug, warn};

/// How an ingested event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Applied,
    /// Rejected by validation; recorded so it is never retried.
    Invalid,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Applied => "applied",
            EventStatus::Invalid => "invalid",
        }
    }
}

/// Ledger entry for an event that has been handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedEvent {
    pub key: EventKey,
    pub block: BlockNumber,
    pub kind: &'static str,
    pub status: EventStatus,
}

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Load every persisted entity into a fresh store with no pending changes.
    ///
    /// # Errors
    /// Returns an error if a query fails or a stored id no longer parses.
    pub async fn load_store(&self) -> Result<MemoryStore, sqlx::Error> {
        let mut store = MemoryStore::new();

        for token in self.load_tokens().await? {
            store.hydrate(token);
        }
        for price in self.load_latest_prices().await? {
            store.hydrate(price);
        }
        for pool in self.load_pools().await? {
            store.hydrate(pool);
        }
        for balance in self.load_pool_tokens().await? {
            store.hydrate(balance);
        }
        for row in self.load_pool_historical_liquidity().await? {
            store.hydrate(row);
        }
        for vault in self.load_balancers().await? {
            store.hydrate(vault);
        }
        for snapshot in self.load_balancer_snapshots().await? {
            store.hydrate(snapshot);
        }
        for snapshot in self.load_pool_snapshots().await? {
            store.hydrate(snapshot);
        }

        debug!(
            pools = store.table::<crate::domain::Pool>().len(),
            tokens = store.table::<crate::domain::Token>().len(),
            "Loaded entity store"
        );
        Ok(store)
    }

    /// Write a change set and its ledger entries in a single transaction.
    ///
    /// Either every row lands or none does, so a replay after a failure
    /// starts from the state before the batch.
    ///
    /// # Errors
    /// Returns an error if any database operation fails.
    pub async fn persist_batch(
        &self,
        changes: &ChangeSet,
        events: &[ProcessedEvent],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Parents before children for the pool foreign keys.
        for token in &changes.tokens {
            tokens::upsert_token(&mut tx, token).await?;
        }
        for price in &changes.latest_prices {
            tokens::upsert_latest_price(&mut tx, price).await?;
        }
        for pool in &changes.pools {
            pools::upsert_pool(&mut tx, pool).await?;
        }
        for balance in &changes.pool_tokens {
            pools::upsert_pool_token(&mut tx, balance).await?;
        }
        for row in &changes.pool_historical_liquidity {
            pools::upsert_pool_historical_liquidity(&mut tx, row).await?;
        }
        for vault in &changes.balancers {
            pools::upsert_balancer(&mut tx, vault).await?;
        }
        for snapshot in &changes.balancer_snapshots {
            pools::upsert_balancer_snapshot(&mut tx, snapshot).await?;
        }
        for snapshot in &changes.pool_snapshots {
            pools::upsert_pool_snapshot(&mut tx, snapshot).await?;
        }

        let processed_at = chrono::Utc::now().to_rfc3339();
        for event in events {
            sqlx::query(
                r#"
                INSERT INTO processed_events (event_key, block, kind, status, processed_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(event_key) DO NOTHING
                "#,
            )
            .bind(event.key.as_str())
            .bind(to_sql_int(event.block.as_u64())?)
            .bind(event.kind)
            .bind(event.status.as_str())
            .bind(&processed_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(
            rows = changes.len(),
            events = events.len(),
            "Persisted change set"
        );
        Ok(())
    }

    /// The subset of `keys` not yet in the processed-event ledger.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn unprocessed_keys(
        &self,
        keys: &[EventKey],
    ) -> Result<HashSet<EventKey>, sqlx::Error> {
        let mut fresh = HashSet::new();
        for key in keys {
            let exists: Option<(i64,)> =
                sqlx::query_as("SELECT 1 FROM processed_events WHERE event_key = ?")
                    .bind(key.as_str())
                    .fetch_optional(&self.pool)
                    .await?;
            if exists.is_none() {
                fresh.insert(key.clone());
            }
        }
        Ok(fresh)
    }

    /// Number of ledger entries with the given status.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn count_processed_events(&self, status: EventStatus) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM processed_events WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}

/// Parse a stored decimal column, falling back to zero on corrupt text.
fn parse_decimal(value: &str, column: &'static str, id: &str) -> Decimal {
    Decimal::from_str(value).unwrap_or_else(|e| {
        warn!(
            id = %id,
            column,
            value = %value,
            error = %e,
            "Failed to parse stored decimal, using zero"
        );
        Decimal::zero()
    })
}

fn decode_err<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

fn encode_err<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Encode(Box::new(err))
}

/// Block numbers and counters are stored in signed INTEGER columns.
fn to_sql_int(value: u64) -> Result<i64, sqlx::Error> {
    i64::try_from(value).map_err(encode_err)
}

/// A stored block number or counter; negative values are corrupt.
fn from_sql_int(value: i64) -> Result<u64, sqlx::Error> {
    u64::try_from(value).map_err(decode_err)
}
