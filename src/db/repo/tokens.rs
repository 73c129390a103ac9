//! Token and latest price operations for the repository.

use crate::domain::{Address, BlockNumber, LatestPrice, LatestPriceId, PoolId, Token};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

use super::{decode_err, from_sql_int, parse_decimal, to_sql_int, Repository};

pub(super) async fn upsert_token(
    conn: &mut SqliteConnection,
    token: &Token,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO tokens (address, latest_usd_price, latest_price_id)
        VALUES (?, ?, ?)
        ON CONFLICT(address) DO UPDATE SET
            latest_usd_price = excluded.latest_usd_price,
            latest_price_id = excluded.latest_price_id
        "#,
    )
    .bind(token.address.as_str())
    .bind(token.latest_usd_price.map(|d| d.to_canonical_string()))
    .bind(token.latest_price.as_ref().map(|id| id.as_str().to_string()))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(super) async fn upsert_latest_price(
    conn: &mut SqliteConnection,
    price: &LatestPrice,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO latest_prices (id, asset, pricing_asset, block, pool_id, price)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            block = excluded.block,
            pool_id = excluded.pool_id,
            price = excluded.price
        "#,
    )
    .bind(price.id().as_str())
    .bind(price.asset.as_str())
    .bind(price.pricing_asset.as_str())
    .bind(to_sql_int(price.block.as_u64())?)
    .bind(price.pool_id.as_ref().map(|id| id.as_str().to_string()))
    .bind(price.price.to_canonical_string())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn token_from_row(row: &SqliteRow) -> Result<Token, sqlx::Error> {
    let address: String = row.get("address");
    let usd_price: Option<String> = row.get("latest_usd_price");
    let latest_price: Option<String> = row.get("latest_price_id");

    Ok(Token {
        latest_usd_price: usd_price
            .as_deref()
            .map(|p| parse_decimal(p, "latest_usd_price", &address)),
        latest_price: latest_price.map(LatestPriceId::from_stored),
        address: Address::parse(&address).map_err(decode_err)?,
    })
}

fn latest_price_from_row(row: &SqliteRow) -> Result<LatestPrice, sqlx::Error> {
    let id: String = row.get("id");
    let asset: String = row.get("asset");
    let pricing_asset: String = row.get("pricing_asset");
    let block: i64 = row.get("block");
    let pool_id: Option<String> = row.get("pool_id");
    let price: String = row.get("price");

    Ok(LatestPrice {
        asset: Address::parse(&asset).map_err(decode_err)?,
        pricing_asset: Address::parse(&pricing_asset).map_err(decode_err)?,
        block: BlockNumber::new(from_sql_int(block)?),
        pool_id: pool_id
            .as_deref()
            .map(PoolId::parse)
            .transpose()
            .map_err(decode_err)?,
        price: parse_decimal(&price, "price", &id),
    })
}

impl Repository {
    pub(super) async fn load_tokens(&self) -> Result<Vec<Token>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT address, latest_usd_price, latest_price_id FROM tokens ORDER BY address",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(token_from_row).collect()
    }

    pub(super) async fn load_latest_prices(&self) -> Result<Vec<LatestPrice>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, asset, pricing_asset, block, pool_id, price FROM latest_prices ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(latest_price_from_row).collect()
    }

    /// Get a token by address.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_token(&self, address: &Address) -> Result<Option<Token>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT address, latest_usd_price, latest_price_id FROM tokens WHERE address = ?",
        )
        .bind(address.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(token_from_row).transpose()
    }

    /// Get the latest price of `asset` against `pricing_asset`.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_latest_price(
        &self,
        asset: &Address,
        pricing_asset: &Address,
    ) -> Result<Option<LatestPrice>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, asset, pricing_asset, block, pool_id, price \
             FROM latest_prices WHERE id = ?",
        )
        .bind(LatestPriceId::new(asset, pricing_asset).as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(latest_price_from_row).transpose()
    }
}
