use crate::domain::{
    Balancer, BalancerSnapshot, BalancerSnapshotId, Pool, PoolSnapshot, PoolSnapshotId, PoolToken,
    PoolTokenId, Timestamp,
};
use crate::store::EntityStore;

pub const DEFAULT_SNAPSHOT_PERIOD_SECS: i64 = 86_400;

/// Time-bucketed copies of pool and vault totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshotter {
    period_secs: i64,
}

impl Default for Snapshotter {
    fn default() -> Self {
        Self {
            period_secs: DEFAULT_SNAPSHOT_PERIOD_SECS,
        }
    }
}

impl Snapshotter {
    /// `period_secs` must be positive; non-positive values fall back to the default.
    pub fn new(period_secs: i64) -> Self {
        if period_secs > 0 {
            Self { period_secs }
        } else {
            Self::default()
        }
    }

    pub fn period_secs(&self) -> i64 {
        self.period_secs
    }

    /// Upsert the bucket row for `pool` at `timestamp` from its current state.
    pub fn create_pool_snapshot<S: EntityStore>(
        &self,
        store: &mut S,
        pool: &Pool,
        timestamp: Timestamp,
    ) {
        let bucket_start = timestamp.bucket_start(self.period_secs);
        let amounts = pool
            .tokens_list
            .iter()
            .map(|token| {
                store
                    .load::<PoolToken>(&PoolTokenId::new(&pool.id, token))
                    .map(|t| t.balance)
                    .unwrap_or_default()
            })
            .collect();

        store.save(PoolSnapshot {
            id: PoolSnapshotId::new(&pool.id, bucket_start),
            pool_id: pool.id.clone(),
            timestamp: bucket_start,
            amounts,
            total_shares: pool.total_shares,
            liquidity: pool.total_liquidity,
            swap_volume: pool.total_swap_volume,
            swaps_count: pool.swaps_count,
        });
    }

    /// Load the vault snapshot for the bucket containing `timestamp`, or a new
    /// one seeded from the vault's current totals. The caller saves it.
    pub fn balancer_snapshot<S: EntityStore>(
        &self,
        store: &S,
        vault_id: &str,
        timestamp: Timestamp,
    ) -> BalancerSnapshot {
        let id = BalancerSnapshotId::new(vault_id, timestamp.bucket_index(self.period_secs));
        store.get_or_create(&id, || {
            let vault = store
                .load::<Balancer>(&vault_id.to_string())
                .unwrap_or_else(|| Balancer::new(vault_id));
            BalancerSnapshot {
                id: id.clone(),
                vault_id: vault_id.to_string(),
                timestamp: timestamp.bucket_start(self.period_secs),
                total_liquidity: vault.total_liquidity,
                total_swap_volume: vault.total_swap_volume,
                total_swap_count: vault.total_swap_count,
            }
        })
    }

    /// Copy the vault's current totals into its bucket row and save it.
    pub fn refresh_balancer_snapshot<S: EntityStore>(
        &self,
        store: &mut S,
        vault: &Balancer,
        timestamp: Timestamp,
    ) {
        let mut snapshot = self.balancer_snapshot(&*store, &vault.id, timestamp);
        snapshot.total_liquidity = vault.total_liquidity;
        snapshot.total_swap_volume = vault.total_swap_volume;
        snapshot.total_swap_count = vault.total_swap_count;
        store.save(snapshot);
    }
}
