//! In-memory entity store with change tracking.

use super::{Entity, EntityStore};
use crate::domain::{
    Address, Balancer, BalancerSnapshot, BalancerSnapshotId, LatestPrice, LatestPriceId, Pool,
    PoolHistoricalLiquidity, PoolHistoricalLiquidityId, PoolId, PoolSnapshot, PoolSnapshotId,
    PoolToken, PoolTokenId, Token,
};
use std::collections::{BTreeSet, HashMap};

/// Rows of one entity kind plus the ids written since the last drain.
#[derive(Debug, Clone)]
pub struct Table<E: Entity> {
    rows: HashMap<E::Id, E>,
    dirty: BTreeSet<E::Id>,
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
            dirty: BTreeSet::new(),
        }
    }
}

impl<E: Entity> Table<E> {
    pub fn get(&self, id: &E::Id) -> Option<&E> {
        self.rows.get(id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &E> {
        self.rows.values()
    }

    fn upsert(&mut self, entity: E) {
        let id = entity.entity_id();
        self.dirty.insert(id.clone());
        self.rows.insert(id, entity);
    }

    fn hydrate(&mut self, entity: E) {
        self.rows.insert(entity.entity_id(), entity);
    }

    fn drain_dirty(&mut self) -> Vec<E> {
        let ids = std::mem::take(&mut self.dirty);
        ids.into_iter()
            .filter_map(|id| self.rows.get(&id).cloned())
            .collect()
    }
}

/// Entities saved since the last call to [`MemoryStore::take_changes`],
/// in id order per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub tokens: Vec<Token>,
    pub latest_prices: Vec<LatestPrice>,
    pub pools: Vec<Pool>,
    pub pool_tokens: Vec<PoolToken>,
    pub pool_historical_liquidity: Vec<PoolHistoricalLiquidity>,
    pub balancers: Vec<Balancer>,
    pub balancer_snapshots: Vec<BalancerSnapshot>,
    pub pool_snapshots: Vec<PoolSnapshot>,
}

impl ChangeSet {
    pub fn len(&self) -> usize {
        self.tokens.len()
            + self.latest_prices.len()
            + self.pools.len()
            + self.pool_tokens.len()
            + self.pool_historical_liquidity.len()
            + self.balancers.len()
            + self.balancer_snapshots.len()
            + self.pool_snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tokens: Table<Token>,
    latest_prices: Table<LatestPrice>,
    pools: Table<Pool>,
    pool_tokens: Table<PoolToken>,
    pool_historical_liquidity: Table<PoolHistoricalLiquidity>,
    balancers: Table<Balancer>,
    balancer_snapshots: Table<BalancerSnapshot>,
    pool_snapshots: Table<PoolSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row already known to be persisted; it is not reported as a change.
    pub fn hydrate<E: Entity>(&mut self, entity: E) {
        E::table_mut(self).hydrate(entity);
    }

    pub fn table<E: Entity>(&self) -> &Table<E> {
        E::table(self)
    }

    pub fn take_changes(&mut self) -> ChangeSet {
        ChangeSet {
            tokens: self.tokens.drain_dirty(),
            latest_prices: self.latest_prices.drain_dirty(),
            pools: self.pools.drain_dirty(),
            pool_tokens: self.pool_tokens.drain_dirty(),
            pool_historical_liquidity: self.pool_historical_liquidity.drain_dirty(),
            balancers: self.balancers.drain_dirty(),
            balancer_snapshots: self.balancer_snapshots.drain_dirty(),
            pool_snapshots: self.pool_snapshots.drain_dirty(),
        }
    }
}

impl EntityStore for MemoryStore {
    fn load<E: Entity>(&self, id: &E::Id) -> Option<E> {
        E::table(self).get(id).cloned()
    }

    fn save<E: Entity>(&mut self, entity: E) {
        E::table_mut(self).upsert(entity);
    }
}

macro_rules! memory_entity {
    ($entity:ty, $id:ty, $field:ident, |$row:ident| $key:expr) => {
        impl Entity for $entity {
            type Id = $id;

            fn entity_id(&self) -> $id {
                let $row = self;
                $key
            }

            fn table(store: &MemoryStore) -> &Table<Self> {
                &store.$field
            }

            fn table_mut(store: &mut MemoryStore) -> &mut Table<Self> {
                &mut store.$field
            }
        }
    };
}

memory_entity!(Token, Address, tokens, |t| t.address.clone());
memory_entity!(LatestPrice, LatestPriceId, latest_prices, |p| p.id());
memory_entity!(Pool, PoolId, pools, |p| p.id.clone());
memory_entity!(PoolToken, PoolTokenId, pool_tokens, |t| t.id());
memory_entity!(
    PoolHistoricalLiquidity,
    PoolHistoricalLiquidityId,
    pool_historical_liquidity,
    |h| h.id()
);
memory_entity!(Balancer, String, balancers, |b| b.id.clone());
memory_entity!(BalancerSnapshot, BalancerSnapshotId, balancer_snapshots, |s| {
    s.id.clone()
});
memory_entity!(PoolSnapshot, PoolSnapshotId, pool_snapshots, |s| s.id.clone());

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Decimal;

    fn token(addr: &str) -> Token {
        Token::new(Address::parse(addr).unwrap())
    }

    const WETH: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";
    const BAL: &str = "0xba100000625a3754423978a60c9317c58a424e3d";

    #[test]
    fn test_save_then_load_reads_own_write() {
        let mut store = MemoryStore::new();
        let mut t = token(WETH);
        t.latest_usd_price = Some(Decimal::from(2000));
        store.save(t.clone());

        let loaded: Option<Token> = store.load(&t.address);
        assert_eq!(loaded, Some(t));
    }

    #[test]
    fn test_get_or_create_does_not_save() {
        let store = MemoryStore::new();
        let id = Address::parse(BAL).unwrap();
        let created = store.get_or_create(&id, || Token::new(id.clone()));
        assert_eq!(created.address, id);
        assert!(store.load::<Token>(&id).is_none());
    }

    #[test]
    fn test_take_changes_reports_saved_rows_once() {
        let mut store = MemoryStore::new();
        store.hydrate(token(BAL));
        store.save(token(WETH));
        store.save(token(WETH));

        let changes = store.take_changes();
        assert_eq!(changes.tokens.len(), 1);
        assert_eq!(changes.tokens[0].address.as_str(), WETH);
        assert_eq!(changes.len(), 1);

        assert!(store.take_changes().is_empty());
        assert_eq!(store.table::<Token>().len(), 2);
    }

    #[test]
    fn test_changes_carry_latest_version_of_row() {
        let mut store = MemoryStore::new();
        let mut t = token(WETH);
        store.save(t.clone());
        t.latest_usd_price = Some(Decimal::from(3));
        store.save(t);

        let changes = store.take_changes();
        assert_eq!(changes.tokens[0].latest_usd_price, Some(Decimal::from(3)));
    }
}
