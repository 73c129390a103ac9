//! Token valuation state and price observations.

use crate::domain::{Address, BlockNumber, Decimal, PoolId};
use serde::{Deserialize, Serialize};

/// A priceable asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    /// Absent until the first price observation (or BPT valuation) lands.
    pub latest_usd_price: Option<Decimal>,
    /// The LatestPrice record that produced `latest_usd_price`, if any.
    pub latest_price: Option<LatestPriceId>,
}

impl Token {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            latest_usd_price: None,
            latest_price: None,
        }
    }
}

/// Composite key of a LatestPrice record: `{asset}-{pricingAsset}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LatestPriceId(String);

impl LatestPriceId {
    pub fn new(asset: &Address, pricing_asset: &Address) -> Self {
        LatestPriceId(format!("{}-{}", asset, pricing_asset))
    }

    /// Wrap an id read back from storage.
    pub fn from_stored(value: String) -> Self {
        LatestPriceId(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LatestPriceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Most recent observed rate of `asset` denominated in `pricing_asset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestPrice {
    pub asset: Address,
    pub pricing_asset: Address,
    pub block: BlockNumber,
    pub pool_id: Option<PoolId>,
    pub price: Decimal,
}

impl LatestPrice {
    /// A fresh record with only its identity fields set.
    pub fn new(asset: Address, pricing_asset: Address) -> Self {
        Self {
            asset,
            pricing_asset,
            block: BlockNumber::default(),
            pool_id: None,
            price: Decimal::zero(),
        }
    }

    pub fn id(&self) -> LatestPriceId {
        LatestPriceId::new(&self.asset, &self.pricing_asset)
    }
}

/// An externally produced price observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPrice {
    pub asset: Address,
    pub pricing_asset: Address,
    pub block: BlockNumber,
    pub pool_id: PoolId,
    pub price: Decimal,
}
