use crate::domain::{Address, LatestPrice, LatestPriceId, Token, TokenPrice};
use crate::engine::UsdValuator;
use crate::store::EntityStore;
use tracing::debug;

/// Maintains one LatestPrice record per (asset, pricing asset) pair and the
/// asset's derived USD price.
#[derive(Debug, Clone)]
pub struct LatestPriceTracker {
    valuator: UsdValuator,
}

impl LatestPriceTracker {
    pub fn new(valuator: UsdValuator) -> Self {
        Self { valuator }
    }

    pub fn latest_price_id(asset: &Address, pricing_asset: &Address) -> LatestPriceId {
        LatestPriceId::new(asset, pricing_asset)
    }

    /// Record `observation` as the latest price for its pair and reprice the asset.
    ///
    /// Last write wins: an observation from an older block still replaces a
    /// newer one.
    pub fn update_latest_price<S: EntityStore>(&self, store: &mut S, observation: &TokenPrice) {
        let id = Self::latest_price_id(&observation.asset, &observation.pricing_asset);
        let mut latest = store.get_or_create(&id, || {
            LatestPrice::new(
                observation.asset.clone(),
                observation.pricing_asset.clone(),
            )
        });
        latest.block = observation.block;
        latest.pool_id = Some(observation.pool_id.clone());
        latest.price = observation.price;
        store.save(latest);

        let usd_price =
            self.valuator
                .value_in_usd(&*store, observation.price, &observation.pricing_asset);
        let mut token = store.get_or_create(&observation.asset, || {
            Token::new(observation.asset.clone())
        });
        token.latest_usd_price = Some(usd_price);
        token.latest_price = Some(id);
        store.save(token);

        debug!(
            asset = %observation.asset,
            pricing_asset = %observation.pricing_asset,
            block = %observation.block,
            usd_price = %usd_price,
            "Updated latest price"
        );
    }
}
