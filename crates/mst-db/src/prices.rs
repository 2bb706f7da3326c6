use chrono::{DateTime, Utc};
use mst_schemas::{AppResult, StockPrice};
use sqlx::{PgPool, Row};

fn row_to_price(row: &sqlx::postgres::PgRow) -> sqlx::Result<StockPrice> {
    Ok(StockPrice {
        symbol: row.try_get("symbol")?,
        price: row.try_get("price")?,
        open: row.try_get("open")?,
        high: row.try_get("high")?,
        low: row.try_get("low")?,
        volume: row.try_get("volume")?,
        timestamp: row.try_get("timestamp")?,
    })
}

pub async fn record_price(pool: &PgPool, price: &StockPrice) -> AppResult<()> {
    sqlx::query(
        r#"
        insert into stock_prices (symbol, price, open, high, low, volume, timestamp)
        values ($1, $2, $3, $4, $5, $6, $7)
        on conflict (symbol, timestamp) do update set
          price = excluded.price, open = excluded.open, high = excluded.high,
          low = excluded.low, volume = excluded.volume
        "#,
    )
    .bind(&price.symbol)
    .bind(price.price)
    .bind(price.open)
    .bind(price.high)
    .bind(price.low)
    .bind(price.volume)
    .bind(price.timestamp)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn latest_price(pool: &PgPool, symbol: &str) -> AppResult<Option<StockPrice>> {
    let row = sqlx::query(
        "select * from stock_prices where symbol = $1 order by timestamp desc limit 1",
    )
    .bind(symbol)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(row_to_price).transpose().map_err(Into::into)
}

pub async fn prices_in_range(
    pool: &PgPool,
    symbol: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<Vec<StockPrice>> {
    let rows = sqlx::query(
        "select * from stock_prices where symbol = $1 and timestamp between $2 and $3 order by timestamp asc",
    )
    .bind(symbol)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;
    rows.iter().map(row_to_price).collect::<sqlx::Result<Vec<_>>>().map_err(Into::into)
}

/// Distinct timestamps across any symbol in range — the backtest engine's
/// trading-day calendar.
pub async fn distinct_trading_days(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<Vec<DateTime<Utc>>> {
    let rows = sqlx::query(
        "select distinct timestamp from stock_prices where timestamp between $1 and $2 order by timestamp asc",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|row| row.try_get::<DateTime<Utc>, _>("timestamp"))
        .collect::<sqlx::Result<Vec<_>>>()
        .map_err(Into::into)
}
