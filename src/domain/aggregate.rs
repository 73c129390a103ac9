//! Vault-wide aggregate and time-bucketed snapshots.

use crate::domain::{Decimal, PoolId, Timestamp};
use serde::{Deserialize, Serialize};

/// Fixed id of the vault aggregate row.
pub const VAULT_ID: &str = "2";

/// Process-wide totals across all pools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balancer {
    pub id: String,
    pub total_liquidity: Decimal,
    pub total_swap_volume: Decimal,
    pub total_swap_count: u64,
}

impl Balancer {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            total_liquidity: Decimal::zero(),
            total_swap_volume: Decimal::zero(),
            total_swap_count: 0,
        }
    }
}

/// Key of a vault snapshot: `{vaultId}-{bucketIndex}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BalancerSnapshotId(String);

impl BalancerSnapshotId {
    pub fn new(vault_id: &str, bucket_index: i64) -> Self {
        BalancerSnapshotId(format!("{}-{}", vault_id, bucket_index))
    }

    pub fn from_stored(value: String) -> Self {
        BalancerSnapshotId(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BalancerSnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancerSnapshot {
    pub id: BalancerSnapshotId,
    pub vault_id: String,
    /// Start of the bucket.
    pub timestamp: Timestamp,
    pub total_liquidity: Decimal,
    pub total_swap_volume: Decimal,
    pub total_swap_count: u64,
}

/// Key of a pool snapshot: `{poolId}-{bucketStart}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolSnapshotId(String);

impl PoolSnapshotId {
    pub fn new(pool_id: &PoolId, bucket_start: Timestamp) -> Self {
        PoolSnapshotId(format!("{}-{}", pool_id, bucket_start.as_secs()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PoolSnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub id: PoolSnapshotId,
    pub pool_id: PoolId,
    pub timestamp: Timestamp,
    /// Balances in `tokens_list` order.
    pub amounts: Vec<Decimal>,
    pub total_shares: Decimal,
    pub liquidity: Decimal,
    pub swap_volume: Decimal,
    pub swaps_count: u64,
}
