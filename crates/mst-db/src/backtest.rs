use chrono::{DateTime, Utc};
use mst_schemas::{
    AppError, AppResult, BacktestDailyStats, BacktestRun, BacktestStatus, BacktestTrade, HoldingSnapshot, Side,
};
use sqlx::{PgPool, Row};
use uuid::Uuid;

fn row_to_run(row: &sqlx::postgres::PgRow) -> AppResult<BacktestRun> {
    let status_str: String = row.try_get("status")?;
    Ok(BacktestRun {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        strategy_config: row.try_get("strategy_config")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        initial_capital: row.try_get("initial_capital")?,
        status: BacktestStatus::from_db_str(&status_str)
            .ok_or_else(|| AppError::integrity(format!("unrecognized backtest status: {status_str}")))?,
        final_capital: row.try_get("final_capital")?,
        total_return: row.try_get("total_return")?,
        total_trades: row.try_get("total_trades")?,
        winning_trades: row.try_get("winning_trades")?,
        losing_trades: row.try_get("losing_trades")?,
        win_rate: row.try_get("win_rate")?,
        max_drawdown: row.try_get("max_drawdown")?,
        sharpe_ratio: row.try_get("sharpe_ratio")?,
        sortino_ratio: row.try_get("sortino_ratio")?,
        error_message: row.try_get("error_message")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

pub async fn create_run(
    pool: &PgPool,
    user_id: &str,
    name: &str,
    strategy_config: serde_json::Value,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    initial_capital: f64,
) -> AppResult<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        insert into backtest_runs (id, user_id, name, strategy_config, start_date, end_date, initial_capital, status)
        values ($1, $2, $3, $4, $5, $6, $7, 'PENDING')
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(name)
    .bind(strategy_config)
    .bind(start_date)
    .bind(end_date)
    .bind(initial_capital)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn mark_running(pool: &PgPool, id: Uuid) -> AppResult<()> {
    sqlx::query("update backtest_runs set status = 'RUNNING', started_at = $2 where id = $1")
        .bind(id)
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct BacktestMetrics {
    pub final_capital: f64,
    pub total_return: f64,
    pub total_trades: i32,
    pub winning_trades: i32,
    pub losing_trades: i32,
    pub win_rate: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
}

pub async fn mark_completed(pool: &PgPool, id: Uuid, metrics: &BacktestMetrics) -> AppResult<()> {
    sqlx::query(
        r#"
        update backtest_runs set
          status = 'COMPLETED', completed_at = $2, final_capital = $3, total_return = $4,
          total_trades = $5, winning_trades = $6, losing_trades = $7, win_rate = $8,
          max_drawdown = $9, sharpe_ratio = $10, sortino_ratio = $11
        where id = $1
        "#,
    )
    .bind(id)
    .bind(Utc::now())
    .bind(metrics.final_capital)
    .bind(metrics.total_return)
    .bind(metrics.total_trades)
    .bind(metrics.winning_trades)
    .bind(metrics.losing_trades)
    .bind(metrics.win_rate)
    .bind(metrics.max_drawdown)
    .bind(metrics.sharpe_ratio)
    .bind(metrics.sortino_ratio)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_failed(pool: &PgPool, id: Uuid, error_message: &str) -> AppResult<()> {
    sqlx::query("update backtest_runs set status = 'FAILED', completed_at = $2, error_message = $3 where id = $1")
        .bind(id)
        .bind(Utc::now())
        .bind(error_message)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn find_run(pool: &PgPool, id: Uuid) -> AppResult<Option<BacktestRun>> {
    let row = sqlx::query("select * from backtest_runs where id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_run).transpose()
}

pub async fn insert_trade(pool: &PgPool, trade: &BacktestTrade) -> AppResult<()> {
    sqlx::query(
        r#"
        insert into backtest_trades (
          id, backtest_run_id, symbol, side, quantity, price, total_amount, signal_ratio,
          reasoning, profit_loss, profit_loss_percentage, executed_at
        ) values ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
        "#,
    )
    .bind(trade.id)
    .bind(trade.backtest_run_id)
    .bind(&trade.symbol)
    .bind(trade.side.as_str())
    .bind(trade.quantity)
    .bind(trade.price)
    .bind(trade.total_amount)
    .bind(trade.signal_ratio)
    .bind(&trade.reasoning)
    .bind(trade.profit_loss)
    .bind(trade.profit_loss_percentage)
    .bind(trade.executed_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn trades_for_run(pool: &PgPool, run_id: Uuid) -> AppResult<Vec<BacktestTrade>> {
    let rows = sqlx::query("select * from backtest_trades where backtest_run_id = $1 order by executed_at asc")
        .bind(run_id)
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| {
            let side_str: String = row.try_get("side")?;
            Ok(BacktestTrade {
                id: row.try_get("id")?,
                backtest_run_id: row.try_get("backtest_run_id")?,
                symbol: row.try_get("symbol")?,
                side: Side::from_db_str(&side_str)
                    .ok_or_else(|| AppError::integrity(format!("unrecognized side: {side_str}")))?,
                quantity: row.try_get("quantity")?,
                price: row.try_get("price")?,
                total_amount: row.try_get("total_amount")?,
                signal_ratio: row.try_get("signal_ratio")?,
                reasoning: row.try_get("reasoning")?,
                profit_loss: row.try_get("profit_loss")?,
                profit_loss_percentage: row.try_get("profit_loss_percentage")?,
                executed_at: row.try_get("executed_at")?,
            })
        })
        .collect()
}

pub async fn insert_daily_stats(pool: &PgPool, stats: &BacktestDailyStats) -> AppResult<()> {
    let holdings_json = serde_json::to_value(&stats.holdings).unwrap_or_default();
    sqlx::query(
        r#"
        insert into backtest_daily_stats (
          id, backtest_run_id, date, portfolio_value, cash_balance, invested_amount,
          daily_return, cumulative_return, drawdown, holdings
        ) values ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
        on conflict (backtest_run_id, date) do update set
          portfolio_value = excluded.portfolio_value, cash_balance = excluded.cash_balance,
          invested_amount = excluded.invested_amount, daily_return = excluded.daily_return,
          cumulative_return = excluded.cumulative_return, drawdown = excluded.drawdown,
          holdings = excluded.holdings
        "#,
    )
    .bind(stats.id)
    .bind(stats.backtest_run_id)
    .bind(stats.date)
    .bind(stats.portfolio_value)
    .bind(stats.cash_balance)
    .bind(stats.invested_amount)
    .bind(stats.daily_return)
    .bind(stats.cumulative_return)
    .bind(stats.drawdown)
    .bind(holdings_json)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn daily_stats_for_run(pool: &PgPool, run_id: Uuid) -> AppResult<Vec<BacktestDailyStats>> {
    let rows = sqlx::query("select * from backtest_daily_stats where backtest_run_id = $1 order by date asc")
        .bind(run_id)
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| {
            let holdings_json: serde_json::Value = row.try_get("holdings")?;
            let holdings: Vec<HoldingSnapshot> = serde_json::from_value(holdings_json).unwrap_or_default();
            Ok(BacktestDailyStats {
                id: row.try_get("id")?,
                backtest_run_id: row.try_get("backtest_run_id")?,
                date: row.try_get("date")?,
                portfolio_value: row.try_get("portfolio_value")?,
                cash_balance: row.try_get("cash_balance")?,
                invested_amount: row.try_get("invested_amount")?,
                daily_return: row.try_get("daily_return")?,
                cumulative_return: row.try_get("cumulative_return")?,
                drawdown: row.try_get("drawdown")?,
                holdings,
            })
        })
        .collect()
}
