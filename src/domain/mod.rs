//! Domain types for pool and token valuation.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: Address, PoolId, BlockNumber, Timestamp
//! - Entities: Token, LatestPrice, Pool, PoolToken, PoolHistoricalLiquidity
//! - Vault aggregate and snapshot rows
//! - Vault events consumed by the orchestration layer

pub mod aggregate;
pub mod decimal;
pub mod event;
pub mod pool;
pub mod primitives;
pub mod token;

pub use aggregate::{
    Balancer, BalancerSnapshot, BalancerSnapshotId, PoolSnapshot, PoolSnapshotId, VAULT_ID,
};
pub use decimal::Decimal;
pub use event::{EventKey, EventKind, VaultEvent};
pub use pool::{
    Pool, PoolHistoricalLiquidity, PoolHistoricalLiquidityId, PoolToken, PoolTokenId, PoolType,
    UnknownPoolType,
};
pub use primitives::{Address, AddressParseError, BlockNumber, PoolId, Timestamp};
pub use token::{LatestPrice, LatestPriceId, Token, TokenPrice};
