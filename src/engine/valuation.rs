//! Conversion of token quantities into USD.

use crate::domain::{Address, Decimal, Token};
use crate::engine::PricingAssetRegistry;
use crate::store::EntityStore;
use std::sync::Arc;
use tracing::warn;

/// Values token amounts in USD from each token's last recorded USD price.
#[derive(Debug, Clone)]
pub struct UsdValuator {
    registry: Arc<PricingAssetRegistry>,
}

impl UsdValuator {
    pub fn new(registry: Arc<PricingAssetRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PricingAssetRegistry {
        &self.registry
    }

    /// USD value of `amount` units of `asset`.
    ///
    /// Stable assets are worth their face amount. An asset with no recorded
    /// USD price is worth zero, as is a product too large to represent.
    pub fn value_in_usd<S: EntityStore>(
        &self,
        store: &S,
        amount: Decimal,
        asset: &Address,
    ) -> Decimal {
        if self.registry.is_usd_stable(asset) {
            return amount;
        }

        let Some(price) = store.load::<Token>(asset).and_then(|t| t.latest_usd_price) else {
            return Decimal::zero();
        };
        amount.checked_mul(price).unwrap_or_else(|| {
            warn!(
                asset = %asset,
                amount = %amount,
                price = %price,
                "USD value overflowed, counting it as zero"
            );
            Decimal::zero()
        })
    }

    /// USD value of a two-sided swap.
    ///
    /// Precedence: a stable output, then a stable input, then the single
    /// pricing-asset side. Otherwise both sides are valued and averaged when
    /// both are positive; a lone positive side is not diluted by a zero.
    pub fn swap_value_in_usd<S: EntityStore>(
        &self,
        store: &S,
        token_in: &Address,
        amount_in: Decimal,
        token_out: &Address,
        amount_out: Decimal,
    ) -> Decimal {
        if self.registry.is_usd_stable(token_out) {
            return self.value_in_usd(store, amount_out, token_out);
        }
        if self.registry.is_usd_stable(token_in) {
            return self.value_in_usd(store, amount_in, token_in);
        }

        let in_is_pricing = self.registry.is_pricing_asset(token_in);
        let out_is_pricing = self.registry.is_pricing_asset(token_out);
        match (in_is_pricing, out_is_pricing) {
            (true, false) => self.value_in_usd(store, amount_in, token_in),
            (false, true) => self.value_in_usd(store, amount_out, token_out),
            _ => {
                let value_in = self.value_in_usd(store, amount_in, token_in);
                let value_out = self.value_in_usd(store, amount_out, token_out);
                let divisor = if value_in.is_positive() && value_out.is_positive() {
                    Decimal::from(2)
                } else {
                    Decimal::one()
                };
                let Some(sum) = value_in.checked_add(value_out) else {
                    warn!(
                        token_in = %token_in,
                        token_out = %token_out,
                        "Swap value overflowed, counting it as zero"
                    );
                    return Decimal::zero();
                };
                sum.checked_div(divisor).unwrap_or_else(Decimal::zero)
            }
        }
    }
}
