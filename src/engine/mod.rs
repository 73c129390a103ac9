//! Valuation engine: pricing-asset policy, USD conversion, latest-price
//! tracking and pool liquidity valuation.
//!
//! Every operation here is synchronous and runs against an
//! [`EntityStore`](crate::store::EntityStore). None of them fail: missing
//! data values to zero and inconsistent pool valuations are reported as a
//! `false` return with no state change.

pub mod latest_price;
pub mod liquidity;
pub mod registry;
pub mod snapshots;
pub mod valuation;

pub use latest_price::LatestPriceTracker;
pub use liquidity::{LiquiditySanityCheck, PoolLiquidityValuator};
pub use registry::{PricingAssetRegistry, RegistryError};
pub use snapshots::{Snapshotter, DEFAULT_SNAPSHOT_PERIOD_SECS};
pub use valuation::UsdValuator;
