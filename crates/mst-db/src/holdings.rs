use chrono::Utc;
use mst_schemas::{AccountHolding, AppResult};
use sqlx::{PgPool, Row};

fn row_to_holding(row: &sqlx::postgres::PgRow) -> sqlx::Result<AccountHolding> {
    Ok(AccountHolding {
        user_id: row.try_get("user_id")?,
        symbol: row.try_get("symbol")?,
        quantity: row.try_get("quantity")?,
        average_price: row.try_get("average_price")?,
        last_price: row.try_get("last_price")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn for_user(pool: &PgPool, user_id: &str) -> AppResult<Vec<AccountHolding>> {
    let rows = sqlx::query("select * from account_holdings where user_id = $1")
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    rows.iter().map(row_to_holding).collect::<sqlx::Result<Vec<_>>>().map_err(Into::into)
}

pub async fn for_symbol(
    pool: &PgPool,
    user_id: &str,
    symbol: &str,
) -> AppResult<Option<AccountHolding>> {
    let row = sqlx::query("select * from account_holdings where user_id = $1 and symbol = $2")
        .bind(user_id)
        .bind(symbol)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_holding).transpose().map_err(Into::into)
}

/// Upserts the full post-trade position. The weighted-average-cost math
/// happens in the trading engine; this just persists the result.
pub async fn upsert_holding(
    pool: &PgPool,
    user_id: &str,
    symbol: &str,
    quantity: i64,
    average_price: f64,
    last_price: f64,
) -> AppResult<()> {
    sqlx::query(
        r#"
        insert into account_holdings (user_id, symbol, quantity, average_price, last_price, updated_at)
        values ($1, $2, $3, $4, $5, $6)
        on conflict (user_id, symbol) do update set
          quantity = excluded.quantity, average_price = excluded.average_price,
          last_price = excluded.last_price, updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id)
    .bind(symbol)
    .bind(quantity)
    .bind(average_price)
    .bind(last_price)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

/// Deletes the position row once quantity reaches zero.
pub async fn delete_holding(pool: &PgPool, user_id: &str, symbol: &str) -> AppResult<()> {
    sqlx::query("delete from account_holdings where user_id = $1 and symbol = $2")
        .bind(user_id)
        .bind(symbol)
        .execute(pool)
        .await?;
    Ok(())
}

/// Every symbol held by any user — the price-poll job's base watch-list
/// before merging in each user's configured extra symbols.
pub async fn distinct_symbols(pool: &PgPool) -> AppResult<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as("select distinct symbol from account_holdings").fetch_all(pool).await?;
    Ok(rows.into_iter().map(|(s,)| s).collect())
}

pub async fn invested_amount(pool: &PgPool, user_id: &str) -> AppResult<f64> {
    let (total,): (Option<f64>,) = sqlx::query_as(
        "select sum(quantity::double precision * average_price) from account_holdings where user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(total.unwrap_or(0.0))
}
