//! Pool liquidity valuation.
//!
//! A valuation pass sums the USD value of every constituent balance, checks
//! the result against a sanity rule, and only then commits: historical row,
//! pool total, BPT price, pool snapshot and the vault aggregate delta. A
//! rejected pass leaves every entity untouched.
//!
//! The vault aggregate accumulates deltas, so applying the same pass twice
//! counts its change twice. Callers must deliver each event once; the
//! ingestion layer enforces this with a processed-event ledger.

use crate::domain::{
    Balancer, BlockNumber, Decimal, Pool, PoolHistoricalLiquidity, PoolId, PoolToken,
    PoolTokenId, Timestamp, Token, VAULT_ID,
};
use crate::engine::{Snapshotter, UsdValuator};
use crate::store::EntityStore;
use tracing::{debug, warn};

/// Rule deciding whether a freshly computed pool total may be committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LiquiditySanityCheck {
    /// Reject when positivity of the new total differs from positivity of
    /// the pool's previously committed total.
    #[default]
    PriorLiquiditySign,
    /// Reject when the pool holds a positive raw token quantity but values to
    /// zero (or the reverse). Lets a freshly funded pool commit its first value.
    NonEmptyPool,
}

#[derive(Debug, Clone)]
pub struct PoolLiquidityValuator {
    valuator: UsdValuator,
    snapshots: Snapshotter,
    sanity_check: LiquiditySanityCheck,
}

struct Accumulated {
    usd_total: Decimal,
    raw_quantity: Decimal,
}

impl PoolLiquidityValuator {
    pub fn new(
        valuator: UsdValuator,
        snapshots: Snapshotter,
        sanity_check: LiquiditySanityCheck,
    ) -> Self {
        Self {
            valuator,
            snapshots,
            sanity_check,
        }
    }

    /// Revalue `pool_id` and commit the result.
    ///
    /// Returns false without mutating anything when the pool is unknown, has
    /// fewer than two tokens, or the new total fails the sanity check.
    pub fn update_pool_liquidity<S: EntityStore>(
        &self,
        store: &mut S,
        pool_id: &PoolId,
        block: BlockNumber,
        timestamp: Timestamp,
    ) -> bool {
        let Some(mut pool) = store.load::<Pool>(pool_id) else {
            debug!(pool_id = %pool_id, "Skipping liquidity update for unknown pool");
            return false;
        };
        if pool.tokens_list.len() < 2 {
            debug!(
                pool_id = %pool_id,
                tokens = pool.tokens_list.len(),
                "Skipping liquidity update for pool with fewer than two tokens"
            );
            return false;
        }

        let accumulated = self.accumulate(&*store, &pool);
        let new_total = accumulated.usd_total;
        let old_total = pool.total_liquidity;

        if !self.passes_sanity_check(&accumulated, old_total) {
            warn!(
                pool_id = %pool_id,
                block = %block,
                old_liquidity = %old_total,
                new_liquidity = %new_total,
                "Rejected pool valuation: likely missing or bad pricing asset"
            );
            return false;
        }

        let vault_id = VAULT_ID.to_string();
        let vault_total = store
            .load::<Balancer>(&vault_id)
            .map(|v| v.total_liquidity)
            .unwrap_or_default();
        let change = new_total.checked_sub(old_total);
        let vault_after = change.and_then(|c| vault_total.checked_add(c));
        let (Some(liquidity_change), Some(new_vault_total)) = (change, vault_after) else {
            warn!(
                pool_id = %pool_id,
                block = %block,
                old_liquidity = %old_total,
                new_liquidity = %new_total,
                "Rejected pool valuation: vault liquidity overflowed"
            );
            return false;
        };

        let share_value = if pool.total_shares.is_positive() {
            new_total.checked_div(pool.total_shares).unwrap_or_default()
        } else {
            Decimal::zero()
        };
        store.save(PoolHistoricalLiquidity {
            pool_id: pool.id.clone(),
            pricing_asset: self.valuator.registry().primary_usd_stable().clone(),
            block,
            pool_total_shares: pool.total_shares,
            pool_liquidity: new_total,
            pool_share_value: share_value,
        });

        pool.total_liquidity = new_total;
        store.save(pool.clone());

        self.update_bpt_price(store, &pool);
        self.snapshots.create_pool_snapshot(store, &pool, timestamp);

        let mut vault = store.get_or_create(&vault_id, || Balancer::new(VAULT_ID));
        vault.total_liquidity = new_vault_total;
        store.save(vault.clone());
        self.snapshots.refresh_balancer_snapshot(store, &vault, timestamp);

        debug!(
            pool_id = %pool_id,
            block = %block,
            liquidity = %new_total,
            change = %liquidity_change,
            "Committed pool valuation"
        );
        true
    }

    /// Price the pool's own share token at liquidity per share.
    pub fn update_bpt_price<S: EntityStore>(&self, store: &mut S, pool: &Pool) {
        if !pool.total_shares.is_positive() {
            return;
        }
        let Some(price) = pool.total_liquidity.checked_div(pool.total_shares) else {
            return;
        };
        let mut token = store.get_or_create(&pool.address, || Token::new(pool.address.clone()));
        token.latest_usd_price = Some(price);
        store.save(token);
    }

    fn accumulate<S: EntityStore>(&self, store: &S, pool: &Pool) -> Accumulated {
        let mut acc = Accumulated {
            usd_total: Decimal::zero(),
            raw_quantity: Decimal::zero(),
        };
        for token in &pool.tokens_list {
            let Some(pool_token) = store.load::<PoolToken>(&PoolTokenId::new(&pool.id, token))
            else {
                continue;
            };
            if pool.has_virtual_supply() && *token == pool.address {
                continue;
            }
            let value = self.valuator.value_in_usd(store, pool_token.balance, token);
            match (
                acc.raw_quantity.checked_add(pool_token.balance),
                acc.usd_total.checked_add(value),
            ) {
                (Some(raw_quantity), Some(usd_total)) => {
                    acc.raw_quantity = raw_quantity;
                    acc.usd_total = usd_total;
                }
                _ => warn!(
                    pool_id = %pool.id,
                    token = %token,
                    balance = %pool_token.balance,
                    "Pool total overflowed, leaving token out"
                ),
            }
        }
        acc
    }

    fn passes_sanity_check(&self, accumulated: &Accumulated, old_total: Decimal) -> bool {
        let new_positive = accumulated.usd_total.is_positive();
        match self.sanity_check {
            LiquiditySanityCheck::PriorLiquiditySign => new_positive == old_total.is_positive(),
            LiquiditySanityCheck::NonEmptyPool => {
                new_positive == accumulated.raw_quantity.is_positive()
            }
        }
    }
}
