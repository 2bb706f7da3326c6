use chrono::{DateTime, Utc};
use mst_schemas::{AppError, AppResult, Side, TradeHistory, TradeStatus};
use sqlx::{PgPool, Row};
use uuid::Uuid;

fn row_to_trade(row: &sqlx::postgres::PgRow) -> AppResult<TradeHistory> {
    let side_str: String = row.try_get("side")?;
    let status_str: String = row.try_get("status")?;

    Ok(TradeHistory {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        broker_order_id: row.try_get("broker_order_id")?,
        symbol: row.try_get("symbol")?,
        side: Side::from_db_str(&side_str)
            .ok_or_else(|| AppError::integrity(format!("unrecognized side: {side_str}")))?,
        quantity: row.try_get("quantity")?,
        submitted_price: row.try_get("submitted_price")?,
        executed_price: row.try_get("executed_price")?,
        total_amount: row.try_get("total_amount")?,
        profit_loss: row.try_get("profit_loss")?,
        status: TradeStatus::from_db_str(&status_str)
            .ok_or_else(|| AppError::integrity(format!("unrecognized trade status: {status_str}")))?,
        signal_ratio: row.try_get("signal_ratio")?,
        reasoning: row.try_get("reasoning")?,
        vix_at_entry: row.try_get("vix_at_entry")?,
        executed_at: row.try_get("executed_at")?,
        created_at: row.try_get("created_at")?,
    })
}

pub async fn insert_trade(pool: &PgPool, trade: &TradeHistory) -> AppResult<()> {
    sqlx::query(
        r#"
        insert into trade_history (
          id, user_id, broker_order_id, symbol, side, quantity, submitted_price,
          executed_price, total_amount, profit_loss, status, signal_ratio, reasoning,
          vix_at_entry, executed_at, created_at
        ) values ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16)
        "#,
    )
    .bind(trade.id)
    .bind(&trade.user_id)
    .bind(&trade.broker_order_id)
    .bind(&trade.symbol)
    .bind(trade.side.as_str())
    .bind(trade.quantity)
    .bind(trade.submitted_price)
    .bind(trade.executed_price)
    .bind(trade.total_amount)
    .bind(trade.profit_loss)
    .bind(trade.status.as_str())
    .bind(trade.signal_ratio)
    .bind(&trade.reasoning)
    .bind(trade.vix_at_entry)
    .bind(trade.executed_at)
    .bind(trade.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn for_user(pool: &PgPool, user_id: &str, limit: i64) -> AppResult<Vec<TradeHistory>> {
    let rows = sqlx::query(
        "select * from trade_history where user_id = $1 order by executed_at desc limit $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.iter().map(row_to_trade).collect()
}

/// Sum of realized P/L for a user's completed SELL trades executed on or
/// after `since` — the daily-loss governor's input.
pub async fn realized_pnl_since(pool: &PgPool, user_id: &str, since: DateTime<Utc>) -> AppResult<f64> {
    let (total,): (Option<f64>,) = sqlx::query_as(
        r#"
        select sum(profit_loss) from trade_history
        where user_id = $1 and side = 'SELL' and status = 'COMPLETED' and executed_at >= $2
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_one(pool)
    .await?;
    Ok(total.unwrap_or(0.0))
}

/// FIFO-pairs each BUY with the next SELL for (user, symbol) — unambiguous
/// because the trading engine holds at most one open position per symbol
/// at a time. Returns `(entry, exit)` pairs in chronological order.
pub async fn unpaired_buy_sell_pairs(
    pool: &PgPool,
    user_id: &str,
) -> AppResult<Vec<(TradeHistory, TradeHistory)>> {
    let rows = sqlx::query(
        "select * from trade_history where user_id = $1 and status = 'COMPLETED' order by symbol, executed_at asc",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let trades = rows.iter().map(row_to_trade).collect::<AppResult<Vec<_>>>()?;

    let mut pending_buys: std::collections::HashMap<String, std::collections::VecDeque<TradeHistory>> =
        std::collections::HashMap::new();
    let mut pairs = Vec::new();

    for trade in trades {
        match trade.side {
            Side::Buy => pending_buys.entry(trade.symbol.clone()).or_default().push_back(trade),
            Side::Sell => {
                if let Some(queue) = pending_buys.get_mut(&trade.symbol) {
                    if let Some(entry) = queue.pop_front() {
                        pairs.push((entry, trade));
                    }
                }
            }
        }
    }

    Ok(pairs)
}

/// All user ids that have ever traded — the learning subsystem extracts
/// patterns across every user, not one at a time.
pub async fn distinct_user_ids(pool: &PgPool) -> AppResult<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as("select distinct user_id from trade_history")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> AppResult<Option<TradeHistory>> {
    let row = sqlx::query("select * from trade_history where id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_trade).transpose()
}
