//! Pool, vault and snapshot operations for the repository.

use crate::domain::{
    Address, Balancer, BalancerSnapshot, BalancerSnapshotId, BlockNumber, Decimal, Pool,
    PoolHistoricalLiquidity, PoolId, PoolSnapshot, PoolSnapshotId, PoolToken, PoolType, Timestamp,
};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

use super::{decode_err, encode_err, from_sql_int, parse_decimal, to_sql_int, Repository};

pub(super) async fn upsert_pool(
    conn: &mut SqliteConnection,
    pool: &Pool,
) -> Result<(), sqlx::Error> {
    let tokens_list = serde_json::to_string(&pool.tokens_list).map_err(encode_err)?;
    sqlx::query(
        r#"
        INSERT INTO pools (
            id, address, pool_type, tokens_list, total_shares,
            total_liquidity, total_swap_volume, swaps_count
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            tokens_list = excluded.tokens_list,
            total_shares = excluded.total_shares,
            total_liquidity = excluded.total_liquidity,
            total_swap_volume = excluded.total_swap_volume,
            swaps_count = excluded.swaps_count
        "#,
    )
    .bind(pool.id.as_str())
    .bind(pool.address.as_str())
    .bind(pool.pool_type.as_str())
    .bind(tokens_list)
    .bind(pool.total_shares.to_canonical_string())
    .bind(pool.total_liquidity.to_canonical_string())
    .bind(pool.total_swap_volume.to_canonical_string())
    .bind(to_sql_int(pool.swaps_count)?)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(super) async fn upsert_pool_token(
    conn: &mut SqliteConnection,
    balance: &PoolToken,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO pool_tokens (id, pool_id, address, balance)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET balance = excluded.balance
        "#,
    )
    .bind(balance.id().as_str())
    .bind(balance.pool_id.as_str())
    .bind(balance.address.as_str())
    .bind(balance.balance.to_canonical_string())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(super) async fn upsert_pool_historical_liquidity(
    conn: &mut SqliteConnection,
    row: &PoolHistoricalLiquidity,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO pool_historical_liquidity (
            id, pool_id, pricing_asset, block,
            pool_total_shares, pool_liquidity, pool_share_value
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            pool_total_shares = excluded.pool_total_shares,
            pool_liquidity = excluded.pool_liquidity,
            pool_share_value = excluded.pool_share_value
        "#,
    )
    .bind(row.id().as_str())
    .bind(row.pool_id.as_str())
    .bind(row.pricing_asset.as_str())
    .bind(to_sql_int(row.block.as_u64())?)
    .bind(row.pool_total_shares.to_canonical_string())
    .bind(row.pool_liquidity.to_canonical_string())
    .bind(row.pool_share_value.to_canonical_string())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(super) async fn upsert_balancer(
    conn: &mut SqliteConnection,
    vault: &Balancer,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO balancers (id, total_liquidity, total_swap_volume, total_swap_count)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            total_liquidity = excluded.total_liquidity,
            total_swap_volume = excluded.total_swap_volume,
            total_swap_count = excluded.total_swap_count
        "#,
    )
    .bind(&vault.id)
    .bind(vault.total_liquidity.to_canonical_string())
    .bind(vault.total_swap_volume.to_canonical_string())
    .bind(to_sql_int(vault.total_swap_count)?)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(super) async fn upsert_balancer_snapshot(
    conn: &mut SqliteConnection,
    snapshot: &BalancerSnapshot,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO balancer_snapshots (
            id, vault_id, timestamp, total_liquidity, total_swap_volume, total_swap_count
        ) VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            total_liquidity = excluded.total_liquidity,
            total_swap_volume = excluded.total_swap_volume,
            total_swap_count = excluded.total_swap_count
        "#,
    )
    .bind(snapshot.id.as_str())
    .bind(&snapshot.vault_id)
    .bind(snapshot.timestamp.as_secs())
    .bind(snapshot.total_liquidity.to_canonical_string())
    .bind(snapshot.total_swap_volume.to_canonical_string())
    .bind(to_sql_int(snapshot.total_swap_count)?)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(super) async fn upsert_pool_snapshot(
    conn: &mut SqliteConnection,
    snapshot: &PoolSnapshot,
) -> Result<(), sqlx::Error> {
    // Amounts are stored as canonical strings to keep full precision.
    let amounts: Vec<String> = snapshot
        .amounts
        .iter()
        .map(|a| a.to_canonical_string())
        .collect();
    let amounts = serde_json::to_string(&amounts).map_err(encode_err)?;
    sqlx::query(
        r#"
        INSERT INTO pool_snapshots (
            id, pool_id, timestamp, amounts, total_shares,
            liquidity, swap_volume, swaps_count
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            amounts = excluded.amounts,
            total_shares = excluded.total_shares,
            liquidity = excluded.liquidity,
            swap_volume = excluded.swap_volume,
            swaps_count = excluded.swaps_count
        "#,
    )
    .bind(snapshot.id.as_str())
    .bind(snapshot.pool_id.as_str())
    .bind(snapshot.timestamp.as_secs())
    .bind(amounts)
    .bind(snapshot.total_shares.to_canonical_string())
    .bind(snapshot.liquidity.to_canonical_string())
    .bind(snapshot.swap_volume.to_canonical_string())
    .bind(to_sql_int(snapshot.swaps_count)?)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn pool_from_row(row: &SqliteRow) -> Result<Pool, sqlx::Error> {
    let id: String = row.get("id");
    let pool_type: String = row.get("pool_type");
    let tokens_list: String = row.get("tokens_list");
    let total_shares: String = row.get("total_shares");
    let total_liquidity: String = row.get("total_liquidity");
    let total_swap_volume: String = row.get("total_swap_volume");
    let swaps_count: i64 = row.get("swaps_count");

    let tokens_list: Vec<Address> = serde_json::from_str(&tokens_list).map_err(decode_err)?;
    let mut pool = Pool::new(
        PoolId::parse(&id).map_err(decode_err)?,
        pool_type.parse::<PoolType>().map_err(decode_err)?,
        tokens_list,
    );
    pool.total_shares = parse_decimal(&total_shares, "total_shares", &id);
    pool.total_liquidity = parse_decimal(&total_liquidity, "total_liquidity", &id);
    pool.total_swap_volume = parse_decimal(&total_swap_volume, "total_swap_volume", &id);
    pool.swaps_count = from_sql_int(swaps_count)?;
    Ok(pool)
}

fn pool_token_from_row(row: &SqliteRow) -> Result<PoolToken, sqlx::Error> {
    let id: String = row.get("id");
    let pool_id: String = row.get("pool_id");
    let address: String = row.get("address");
    let balance: String = row.get("balance");

    Ok(PoolToken {
        pool_id: PoolId::parse(&pool_id).map_err(decode_err)?,
        address: Address::parse(&address).map_err(decode_err)?,
        balance: parse_decimal(&balance, "balance", &id),
    })
}

fn historical_liquidity_from_row(row: &SqliteRow) -> Result<PoolHistoricalLiquidity, sqlx::Error> {
    let id: String = row.get("id");
    let pool_id: String = row.get("pool_id");
    let pricing_asset: String = row.get("pricing_asset");
    let block: i64 = row.get("block");
    let shares: String = row.get("pool_total_shares");
    let liquidity: String = row.get("pool_liquidity");
    let share_value: String = row.get("pool_share_value");

    Ok(PoolHistoricalLiquidity {
        pool_id: PoolId::parse(&pool_id).map_err(decode_err)?,
        pricing_asset: Address::parse(&pricing_asset).map_err(decode_err)?,
        block: BlockNumber::new(from_sql_int(block)?),
        pool_total_shares: parse_decimal(&shares, "pool_total_shares", &id),
        pool_liquidity: parse_decimal(&liquidity, "pool_liquidity", &id),
        pool_share_value: parse_decimal(&share_value, "pool_share_value", &id),
    })
}

fn balancer_from_row(row: &SqliteRow) -> Result<Balancer, sqlx::Error> {
    let id: String = row.get("id");
    let total_liquidity: String = row.get("total_liquidity");
    let total_swap_volume: String = row.get("total_swap_volume");
    let total_swap_count: i64 = row.get("total_swap_count");

    Ok(Balancer {
        total_liquidity: parse_decimal(&total_liquidity, "total_liquidity", &id),
        total_swap_volume: parse_decimal(&total_swap_volume, "total_swap_volume", &id),
        total_swap_count: from_sql_int(total_swap_count)?,
        id,
    })
}

fn balancer_snapshot_from_row(row: &SqliteRow) -> Result<BalancerSnapshot, sqlx::Error> {
    let id: String = row.get("id");
    let vault_id: String = row.get("vault_id");
    let timestamp: i64 = row.get("timestamp");
    let total_liquidity: String = row.get("total_liquidity");
    let total_swap_volume: String = row.get("total_swap_volume");
    let total_swap_count: i64 = row.get("total_swap_count");

    Ok(BalancerSnapshot {
        total_liquidity: parse_decimal(&total_liquidity, "total_liquidity", &id),
        total_swap_volume: parse_decimal(&total_swap_volume, "total_swap_volume", &id),
        total_swap_count: from_sql_int(total_swap_count)?,
        id: BalancerSnapshotId::from_stored(id),
        vault_id,
        timestamp: Timestamp::new(timestamp),
    })
}

fn pool_snapshot_from_row(row: &SqliteRow) -> Result<PoolSnapshot, sqlx::Error> {
    let id: String = row.get("id");
    let pool_id: String = row.get("pool_id");
    let timestamp: i64 = row.get("timestamp");
    let amounts: String = row.get("amounts");
    let total_shares: String = row.get("total_shares");
    let liquidity: String = row.get("liquidity");
    let swap_volume: String = row.get("swap_volume");
    let swaps_count: i64 = row.get("swaps_count");

    let pool_id = PoolId::parse(&pool_id).map_err(decode_err)?;
    let timestamp = Timestamp::new(timestamp);
    let amounts: Vec<String> = serde_json::from_str(&amounts).map_err(decode_err)?;

    Ok(PoolSnapshot {
        id: PoolSnapshotId::new(&pool_id, timestamp),
        amounts: amounts
            .iter()
            .map(|a| parse_decimal(a, "amounts", &id))
            .collect::<Vec<Decimal>>(),
        total_shares: parse_decimal(&total_shares, "total_shares", &id),
        liquidity: parse_decimal(&liquidity, "liquidity", &id),
        swap_volume: parse_decimal(&swap_volume, "swap_volume", &id),
        swaps_count: from_sql_int(swaps_count)?,
        pool_id,
        timestamp,
    })
}

const POOL_COLUMNS: &str = "id, address, pool_type, tokens_list, total_shares, \
                            total_liquidity, total_swap_volume, swaps_count";

const HISTORICAL_COLUMNS: &str = "id, pool_id, pricing_asset, block, pool_total_shares, \
                                  pool_liquidity, pool_share_value";

impl Repository {
    pub(super) async fn load_pools(&self) -> Result<Vec<Pool>, sqlx::Error> {
        let rows = sqlx::query(&format!("SELECT {} FROM pools ORDER BY id", POOL_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(pool_from_row).collect()
    }

    pub(super) async fn load_pool_tokens(&self) -> Result<Vec<PoolToken>, sqlx::Error> {
        let rows = sqlx::query("SELECT id, pool_id, address, balance FROM pool_tokens ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(pool_token_from_row).collect()
    }

    pub(super) async fn load_pool_historical_liquidity(
        &self,
    ) -> Result<Vec<PoolHistoricalLiquidity>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM pool_historical_liquidity ORDER BY id",
            HISTORICAL_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(historical_liquidity_from_row).collect()
    }

    pub(super) async fn load_balancers(&self) -> Result<Vec<Balancer>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, total_liquidity, total_swap_volume, total_swap_count FROM balancers",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(balancer_from_row).collect()
    }

    pub(super) async fn load_balancer_snapshots(
        &self,
    ) -> Result<Vec<BalancerSnapshot>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, vault_id, timestamp, total_liquidity, total_swap_volume, total_swap_count
            FROM balancer_snapshots
            ORDER BY timestamp ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(balancer_snapshot_from_row).collect()
    }

    pub(super) async fn load_pool_snapshots(&self) -> Result<Vec<PoolSnapshot>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, pool_id, timestamp, amounts, total_shares, liquidity,
                   swap_volume, swaps_count
            FROM pool_snapshots
            ORDER BY pool_id ASC, timestamp ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(pool_snapshot_from_row).collect()
    }

    /// Get a pool by id.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_pool(&self, id: &PoolId) -> Result<Option<Pool>, sqlx::Error> {
        let row = sqlx::query(&format!("SELECT {} FROM pools WHERE id = ?", POOL_COLUMNS))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(pool_from_row).transpose()
    }

    /// Get the vault aggregate.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_balancer(&self, id: &str) -> Result<Option<Balancer>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, total_liquidity, total_swap_volume, total_swap_count \
             FROM balancers WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(balancer_from_row).transpose()
    }

    /// Historical liquidity rows for a pool, oldest block first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_pool_historical_liquidity(
        &self,
        pool_id: &PoolId,
    ) -> Result<Vec<PoolHistoricalLiquidity>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM pool_historical_liquidity WHERE pool_id = ? ORDER BY block ASC, id ASC",
            HISTORICAL_COLUMNS
        ))
        .bind(pool_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(historical_liquidity_from_row).collect()
    }

    /// Pool snapshots for a pool, oldest bucket first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_pool_snapshots(
        &self,
        pool_id: &PoolId,
    ) -> Result<Vec<PoolSnapshot>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, pool_id, timestamp, amounts, total_shares, liquidity,
                   swap_volume, swaps_count
            FROM pool_snapshots
            WHERE pool_id = ?
            ORDER BY timestamp ASC
            "#,
        )
        .bind(pool_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(pool_snapshot_from_row).collect()
    }

    /// Vault snapshots, oldest bucket first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_balancer_snapshots(
        &self,
        vault_id: &str,
    ) -> Result<Vec<BalancerSnapshot>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, vault_id, timestamp, total_liquidity, total_swap_volume, total_swap_count
            FROM balancer_snapshots
            WHERE vault_id = ?
            ORDER BY timestamp ASC
            "#,
        )
        .bind(vault_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(balancer_snapshot_from_row).collect()
    }
}
