pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod orchestration;
pub mod store;

pub use config::{Config, ConfigError};
pub use datasource::{EventSource, EventSourceError, MockEventSource};
pub use db::{init_db, Repository};
pub use domain::{
    Address, BlockNumber, Decimal, EventKey, EventKind, Pool, PoolId, PoolType, Timestamp, Token,
    TokenPrice, VaultEvent,
};
pub use engine::{
    LatestPriceTracker, LiquiditySanityCheck, PoolLiquidityValuator, PricingAssetRegistry,
    UsdValuator,
};
pub use orchestration::{EventProcessor, IngestionResult, Ingestor};
pub use store::{EntityStore, MemoryStore};
