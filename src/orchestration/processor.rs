//! Applies vault events to the entity store.
//!
//! Handlers validate an event completely before touching the store, so an
//! `EventError` never leaves a partial write behind.

use crate::config::{Config, ConfigError};
use crate::domain::{
    Address, Balancer, Decimal, EventKind, Pool, PoolId, PoolToken, PoolTokenId, Token,
    VaultEvent, VAULT_ID,
};
use crate::engine::{
    LatestPriceTracker, LiquiditySanityCheck, PoolLiquidityValuator, PricingAssetRegistry,
    Snapshotter, UsdValuator,
};
use crate::store::EntityStore;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("pool {0} is not registered")]
    UnknownPool(PoolId),
    #[error("pool {0} is already registered")]
    PoolAlreadyRegistered(PoolId),
    #[error("token {token} is not in pool {pool_id}")]
    TokenNotInPool { pool_id: PoolId, token: Address },
    #[error("amounts for pool {0} overflow")]
    AmountOverflow(PoolId),
}

/// What applying one event did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventOutcome {
    /// Result of the liquidity revaluation, for events that trigger one.
    pub liquidity_committed: Option<bool>,
    /// USD value credited to swap volume.
    pub swap_value_usd: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct EventProcessor {
    valuator: UsdValuator,
    prices: LatestPriceTracker,
    liquidity: PoolLiquidityValuator,
    snapshots: Snapshotter,
}

impl EventProcessor {
    pub fn new(
        registry: Arc<PricingAssetRegistry>,
        snapshots: Snapshotter,
        sanity_check: LiquiditySanityCheck,
    ) -> Self {
        let valuator = UsdValuator::new(registry);
        Self {
            prices: LatestPriceTracker::new(valuator.clone()),
            liquidity: PoolLiquidityValuator::new(valuator.clone(), snapshots, sanity_check),
            valuator,
            snapshots,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(
            Arc::new(config.registry()?),
            Snapshotter::new(config.snapshot_period_secs),
            config.liquidity_sanity_check,
        ))
    }

    pub fn registry(&self) -> &PricingAssetRegistry {
        self.valuator.registry()
    }

    pub fn process<S: EntityStore>(
        &self,
        store: &mut S,
        event: &VaultEvent,
    ) -> Result<EventOutcome, EventError> {
        debug!(
            key = %event.key,
            kind = event.kind.name(),
            block = %event.block,
            "Processing event"
        );
        match &event.kind {
            EventKind::PoolRegistered {
                pool_id,
                pool_type,
                tokens,
            } => {
                if store.load::<Pool>(pool_id).is_some() {
                    return Err(EventError::PoolAlreadyRegistered(pool_id.clone()));
                }
                let mut tokens_list: Vec<Address> = Vec::with_capacity(tokens.len());
                for token in tokens {
                    if !tokens_list.contains(token) {
                        tokens_list.push(token.clone());
                    }
                }
                for token in &tokens_list {
                    if store.load::<Token>(token).is_none() {
                        store.save(Token::new(token.clone()));
                    }
                    store.save(PoolToken::new(pool_id.clone(), token.clone()));
                }
                store.save(Pool::new(pool_id.clone(), *pool_type, tokens_list));
                Ok(EventOutcome::default())
            }
            EventKind::PriceObserved(observation) => {
                self.prices.update_latest_price(store, observation);
                Ok(EventOutcome::default())
            }
            EventKind::PoolBalanceChanged {
                pool_id,
                deltas,
                shares_delta,
            } => {
                let mut pool = load_pool(&*store, pool_id)?;
                let balances = shifted_balances(&*store, &pool, deltas)?;
                pool.total_shares = pool
                    .total_shares
                    .checked_add(*shares_delta)
                    .ok_or_else(|| EventError::AmountOverflow(pool_id.clone()))?;

                for balance in balances {
                    store.save(balance);
                }
                store.save(pool);

                let committed = self.liquidity.update_pool_liquidity(
                    store,
                    pool_id,
                    event.block,
                    event.timestamp,
                );
                Ok(EventOutcome {
                    liquidity_committed: Some(committed),
                    swap_value_usd: None,
                })
            }
            EventKind::Swap {
                pool_id,
                token_in,
                amount_in,
                token_out,
                amount_out,
            } => {
                let mut pool = load_pool(&*store, pool_id)?;
                let balances = shifted_balances(
                    &*store,
                    &pool,
                    &[
                        (token_in.clone(), *amount_in),
                        (token_out.clone(), -*amount_out),
                    ],
                )?;
                let overflow = || EventError::AmountOverflow(pool_id.clone());

                let value = self.valuator.swap_value_in_usd(
                    &*store, token_in, *amount_in, token_out, *amount_out,
                );
                let vault_id = VAULT_ID.to_string();
                let mut vault = store.get_or_create(&vault_id, || Balancer::new(VAULT_ID));
                pool.total_swap_volume = pool
                    .total_swap_volume
                    .checked_add(value)
                    .ok_or_else(overflow)?;
                vault.total_swap_volume = vault
                    .total_swap_volume
                    .checked_add(value)
                    .ok_or_else(overflow)?;
                pool.swaps_count += 1;
                vault.total_swap_count += 1;

                for balance in balances {
                    store.save(balance);
                }
                store.save(pool.clone());
                store.save(vault.clone());
                self.snapshots
                    .refresh_balancer_snapshot(store, &vault, event.timestamp);
                self.snapshots
                    .create_pool_snapshot(store, &pool, event.timestamp);

                let committed = self.liquidity.update_pool_liquidity(
                    store,
                    pool_id,
                    event.block,
                    event.timestamp,
                );
                Ok(EventOutcome {
                    liquidity_committed: Some(committed),
                    swap_value_usd: Some(value),
                })
            }
        }
    }
}

fn load_pool<S: EntityStore>(store: &S, pool_id: &PoolId) -> Result<Pool, EventError> {
    store
        .load::<Pool>(pool_id)
        .ok_or_else(|| EventError::UnknownPool(pool_id.clone()))
}

fn ensure_in_pool(pool: &Pool, token: &Address) -> Result<(), EventError> {
    if pool.contains_token(token) {
        Ok(())
    } else {
        Err(EventError::TokenNotInPool {
            pool_id: pool.id.clone(),
            token: token.clone(),
        })
    }
}

/// New balance records after applying `deltas`, without saving them.
///
/// Repeated tokens accumulate. Fails on a foreign token or an overflowing sum.
fn shifted_balances<S: EntityStore>(
    store: &S,
    pool: &Pool,
    deltas: &[(Address, Decimal)],
) -> Result<Vec<PoolToken>, EventError> {
    let mut balances: Vec<PoolToken> = Vec::with_capacity(deltas.len());
    for (token, delta) in deltas {
        ensure_in_pool(pool, token)?;
        let index = match balances.iter().position(|b| b.address == *token) {
            Some(index) => index,
            None => {
                let balance = store
                    .load::<PoolToken>(&PoolTokenId::new(&pool.id, token))
                    .unwrap_or_else(|| PoolToken::new(pool.id.clone(), token.clone()));
                balances.push(balance);
                balances.len() - 1
            }
        };
        let entry = &mut balances[index];
        entry.balance = entry
            .balance
            .checked_add(*delta)
            .ok_or_else(|| EventError::AmountOverflow(pool.id.clone()))?;
    }
    Ok(balances)
}
