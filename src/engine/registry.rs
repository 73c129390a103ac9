use crate::domain::Address;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("at least one USD-stable asset is required")]
    NoUsdStableAssets,
}

/// Immutable asset universe used for valuation.
///
/// `pricing_assets` is ordered by preference: earlier entries are trusted
/// more when several candidates could price the same asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingAssetRegistry {
    pricing_assets: Vec<Address>,
    usd_stable_assets: Vec<Address>,
}

impl PricingAssetRegistry {
    /// Build a registry. Duplicate entries keep their first position.
    ///
    /// # Errors
    /// Returns [`RegistryError::NoUsdStableAssets`] if `usd_stable_assets` is empty;
    /// the first stable asset keys the historical liquidity log.
    pub fn new(
        pricing_assets: Vec<Address>,
        usd_stable_assets: Vec<Address>,
    ) -> Result<Self, RegistryError> {
        if usd_stable_assets.is_empty() {
            return Err(RegistryError::NoUsdStableAssets);
        }
        Ok(Self {
            pricing_assets: dedup_in_order(pricing_assets),
            usd_stable_assets: dedup_in_order(usd_stable_assets),
        })
    }

    pub fn is_pricing_asset(&self, asset: &Address) -> bool {
        self.pricing_assets.contains(asset)
    }

    pub fn is_usd_stable(&self, asset: &Address) -> bool {
        self.usd_stable_assets.contains(asset)
    }

    /// First pricing asset, in preference order, present among `candidates`.
    pub fn preferential_pricing_asset<'a, I>(&self, candidates: I) -> Option<&Address>
    where
        I: IntoIterator<Item = &'a Address>,
    {
        let candidates: Vec<&Address> = candidates.into_iter().collect();
        self.pricing_assets
            .iter()
            .find(|asset| candidates.contains(asset))
    }

    /// Stable asset whose address keys historical liquidity rows.
    pub fn primary_usd_stable(&self) -> &Address {
        // Non-empty by construction.
        &self.usd_stable_assets[0]
    }

    pub fn pricing_assets(&self) -> &[Address] {
        &self.pricing_assets
    }

    pub fn usd_stable_assets(&self) -> &[Address] {
        &self.usd_stable_assets
    }
}

fn dedup_in_order(assets: Vec<Address>) -> Vec<Address> {
    let mut out: Vec<Address> = Vec::with_capacity(assets.len());
    for asset in assets {
        if !out.contains(&asset) {
            out.push(asset);
        }
    }
    out
}
