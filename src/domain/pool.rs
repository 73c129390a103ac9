//! Pools, per-pool token balances and the historical liquidity log.

use crate::domain::{Address, BlockNumber, Decimal, PoolId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Pool variant tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolType {
    Weighted,
    Stable,
    MetaStable,
    LiquidityBootstrapping,
    Investment,
    Element,
    StablePhantom,
    ComposableStable,
    Linear,
    AaveLinear,
    ERC4626Linear,
    Gyro2,
    Gyro3,
    GyroE,
    FX,
    Managed,
}

/// Capability row for one pool variant.
struct PoolCapabilities {
    pool_type: PoolType,
    virtual_supply: bool,
}

impl PoolCapabilities {
    const fn new(pool_type: PoolType, virtual_supply: bool) -> Self {
        Self {
            pool_type,
            virtual_supply,
        }
    }
}

const CAPABILITIES: &[PoolCapabilities] = &[
    PoolCapabilities::new(PoolType::Weighted, false),
    PoolCapabilities::new(PoolType::Stable, false),
    PoolCapabilities::new(PoolType::MetaStable, false),
    PoolCapabilities::new(PoolType::LiquidityBootstrapping, false),
    PoolCapabilities::new(PoolType::Investment, false),
    PoolCapabilities::new(PoolType::Element, false),
    PoolCapabilities::new(PoolType::StablePhantom, true),
    PoolCapabilities::new(PoolType::ComposableStable, true),
    PoolCapabilities::new(PoolType::Linear, true),
    PoolCapabilities::new(PoolType::AaveLinear, true),
    PoolCapabilities::new(PoolType::ERC4626Linear, true),
    PoolCapabilities::new(PoolType::Gyro2, false),
    PoolCapabilities::new(PoolType::Gyro3, false),
    PoolCapabilities::new(PoolType::GyroE, false),
    PoolCapabilities::new(PoolType::FX, false),
    PoolCapabilities::new(PoolType::Managed, false),
];

impl PoolType {
    /// Whether the pool lists its own share token and represents supply
    /// virtually, so that balance must be left out of self-valuation.
    pub fn has_virtual_supply(&self) -> bool {
        CAPABILITIES
            .iter()
            .find(|c| c.pool_type == *self)
            .map(|c| c.virtual_supply)
            .unwrap_or(false)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PoolType::Weighted => "Weighted",
            PoolType::Stable => "Stable",
            PoolType::MetaStable => "MetaStable",
            PoolType::LiquidityBootstrapping => "LiquidityBootstrapping",
            PoolType::Investment => "Investment",
            PoolType::Element => "Element",
            PoolType::StablePhantom => "StablePhantom",
            PoolType::ComposableStable => "ComposableStable",
            PoolType::Linear => "Linear",
            PoolType::AaveLinear => "AaveLinear",
            PoolType::ERC4626Linear => "ERC4626Linear",
            PoolType::Gyro2 => "Gyro2",
            PoolType::Gyro3 => "Gyro3",
            PoolType::GyroE => "GyroE",
            PoolType::FX => "FX",
            PoolType::Managed => "Managed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown pool type: {0}")]
pub struct UnknownPoolType(pub String);

impl FromStr for PoolType {
    type Err = UnknownPoolType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CAPABILITIES
            .iter()
            .map(|c| c.pool_type)
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownPoolType(s.to_string()))
    }
}

impl std::fmt::Display for PoolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A liquidity pool and its running valuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    /// Address of the pool's own share token (BPT).
    pub address: Address,
    pub pool_type: PoolType,
    pub tokens_list: Vec<Address>,
    pub total_shares: Decimal,
    /// USD value at the last committed valuation.
    pub total_liquidity: Decimal,
    pub total_swap_volume: Decimal,
    pub swaps_count: u64,
}

impl Pool {
    pub fn new(id: PoolId, pool_type: PoolType, tokens_list: Vec<Address>) -> Self {
        Self {
            address: id.pool_address(),
            id,
            pool_type,
            tokens_list,
            total_shares: Decimal::zero(),
            total_liquidity: Decimal::zero(),
            total_swap_volume: Decimal::zero(),
            swaps_count: 0,
        }
    }

    pub fn has_virtual_supply(&self) -> bool {
        self.pool_type.has_virtual_supply()
    }

    pub fn contains_token(&self, token: &Address) -> bool {
        self.tokens_list.contains(token)
    }
}

/// Key of a PoolToken record: `{poolId}-{token}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolTokenId(String);

impl PoolTokenId {
    pub fn new(pool_id: &PoolId, token: &Address) -> Self {
        PoolTokenId(format!("{}-{}", pool_id, token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PoolTokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Balance of one token held by one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolToken {
    pub pool_id: PoolId,
    pub address: Address,
    pub balance: Decimal,
}

impl PoolToken {
    pub fn new(pool_id: PoolId, address: Address) -> Self {
        Self {
            pool_id,
            address,
            balance: Decimal::zero(),
        }
    }

    pub fn id(&self) -> PoolTokenId {
        PoolTokenId::new(&self.pool_id, &self.address)
    }
}

/// Key of a PoolHistoricalLiquidity row: `{poolId}-{pricingAsset}-{block}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolHistoricalLiquidityId(String);

impl PoolHistoricalLiquidityId {
    pub fn new(pool_id: &PoolId, pricing_asset: &Address, block: BlockNumber) -> Self {
        PoolHistoricalLiquidityId(format!("{}-{}-{}", pool_id, pricing_asset, block))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PoolHistoricalLiquidityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Valuation snapshot written once per committed pool valuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolHistoricalLiquidity {
    pub pool_id: PoolId,
    pub pricing_asset: Address,
    pub block: BlockNumber,
    pub pool_total_shares: Decimal,
    pub pool_liquidity: Decimal,
    pub pool_share_value: Decimal,
}

impl PoolHistoricalLiquidity {
    pub fn id(&self) -> PoolHistoricalLiquidityId {
        PoolHistoricalLiquidityId::new(&self.pool_id, &self.pricing_asset, self.block)
    }
}
