//! Wires the pure simulation engine to stored price/sentiment history and
//! persists the result through C1. This is the only IO-touching module in
//! the crate — `engine.rs` stays a pure function of its inputs.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use mst_schemas::{AppError, AppResult, BacktestTrade};
use sqlx::PgPool;
use uuid::Uuid;

use crate::engine::BacktestEngine;
use crate::types::{BacktestSignalMode, DayInput, SimConfig, SimOutput};

const SENTIMENT_WINDOW_DAYS: i64 = 7;

fn trailing_mean(day_scores: &BTreeMap<NaiveDate, f64>, date: NaiveDate, window_days: i64) -> Option<f64> {
    let start = date - chrono::Duration::days(window_days - 1);
    let values: Vec<f64> = day_scores.range(start..=date).map(|(_, v)| *v).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Builds one symbol's `(date -> mean sentiment that day)` map from raw
/// `(timestamp, quantified score)` rows.
fn daily_sentiment_map(scores: &[(DateTime<Utc>, f64)]) -> BTreeMap<NaiveDate, f64> {
    let mut by_day: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for (ts, score) in scores {
        by_day.entry(ts.date_naive()).or_default().push(*score);
    }
    by_day
        .into_iter()
        .map(|(day, values)| (day, values.iter().sum::<f64>() / values.len() as f64))
        .collect()
}

fn daily_price_map(prices: &[mst_schemas::StockPrice]) -> BTreeMap<NaiveDate, f64> {
    prices.iter().map(|p| (p.timestamp.date_naive(), p.price)).collect()
}

pub struct BacktestRequest {
    pub user_id: String,
    pub name: String,
    pub symbols: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub config: SimConfig,
    pub signal_mode: BacktestSignalMode,
}

/// Runs a full backtest end to end: creates the run row, simulates, and
/// persists trades/daily stats/metrics. Returns the run id.
pub async fn run_backtest(pool: &PgPool, request: BacktestRequest) -> AppResult<Uuid> {
    let strategy_config = serde_json::json!({
        "signal_mode": match request.signal_mode {
            BacktestSignalMode::Simplified => "simplified",
            BacktestSignalMode::FullPipeline => "full_pipeline",
        },
        "symbols": request.symbols,
        "buy_threshold": request.config.buy_threshold,
        "sell_threshold": request.config.sell_threshold,
        "stop_loss_percentage": request.config.stop_loss_percentage,
    });

    let run_id = mst_db::backtest::create_run(
        pool,
        &request.user_id,
        &request.name,
        strategy_config,
        request.start_date,
        request.end_date,
        request.config.initial_capital,
    )
    .await?;

    mst_db::backtest::mark_running(pool, run_id).await?;

    match simulate(pool, &request).await {
        Ok(output) => {
            persist_output(pool, run_id, &output).await?;
            let metrics = mst_db::backtest::BacktestMetrics {
                final_capital: output.metrics.final_capital,
                total_return: output.metrics.total_return,
                total_trades: output.metrics.total_trades,
                winning_trades: output.metrics.winning_trades,
                losing_trades: output.metrics.losing_trades,
                win_rate: output.metrics.win_rate,
                max_drawdown: output.metrics.max_drawdown,
                sharpe_ratio: output.metrics.sharpe_ratio,
                sortino_ratio: output.metrics.sortino_ratio,
            };
            mst_db::backtest::mark_completed(pool, run_id, &metrics).await?;
            Ok(run_id)
        }
        Err(err) => {
            mst_db::backtest::mark_failed(pool, run_id, &err.message()).await?;
            Err(err)
        }
    }
}

async fn simulate(pool: &PgPool, request: &BacktestRequest) -> AppResult<SimOutput> {
    if request.signal_mode == BacktestSignalMode::FullPipeline {
        return Err(AppError::validation(
            "FullPipeline backtest mode requires a historical VIX series, which this workspace does not yet source from storage",
        ));
    }

    let sentiment_lookback = request.start_date - chrono::Duration::days(SENTIMENT_WINDOW_DAYS - 1);

    let mut price_maps = HashMap::new();
    let mut sentiment_maps = HashMap::new();
    for symbol in &request.symbols {
        let prices = mst_db::prices::prices_in_range(pool, symbol, request.start_date, request.end_date).await?;
        price_maps.insert(symbol.clone(), daily_price_map(&prices));

        let scores =
            mst_db::sentiment::quantified_scores_for_asset_since(pool, symbol, sentiment_lookback).await?;
        sentiment_maps.insert(symbol.clone(), daily_sentiment_map(&scores));
    }

    let trading_days = mst_db::prices::distinct_trading_days(pool, request.start_date, request.end_date).await?;
    if trading_days.is_empty() {
        return Err(AppError::validation("no trading days found in the specified period"));
    }

    let mut days = Vec::with_capacity(trading_days.len());
    for ts in trading_days {
        let date = ts.date_naive();
        let mut prices = HashMap::new();
        let mut signal_ratios = HashMap::new();

        for symbol in &request.symbols {
            if let Some(&price) = price_maps[symbol].get(&date) {
                prices.insert(symbol.clone(), price);
            }
            let ratio = trailing_mean(&sentiment_maps[symbol], date, SENTIMENT_WINDOW_DAYS)
                .map(mst_signal::simplified_ratio)
                .unwrap_or(50);
            signal_ratios.insert(symbol.clone(), ratio);
        }

        days.push(DayInput { date: ts, prices, signal_ratios });
    }

    Ok(BacktestEngine::new(request.config.clone()).run(&days))
}

async fn persist_output(pool: &PgPool, run_id: Uuid, output: &SimOutput) -> AppResult<()> {
    for trade in &output.trades {
        let record = BacktestTrade {
            id: Uuid::new_v4(),
            backtest_run_id: run_id,
            symbol: trade.symbol.clone(),
            side: trade.side,
            quantity: trade.quantity,
            price: trade.price,
            total_amount: trade.price * trade.quantity as f64,
            signal_ratio: trade.signal_ratio,
            reasoning: trade.reasoning.clone(),
            profit_loss: trade.profit_loss,
            profit_loss_percentage: trade.profit_loss_percentage,
            executed_at: trade.date,
        };
        mst_db::backtest::insert_trade(pool, &record).await?;
    }

    for stat in &output.daily_stats {
        let record = mst_schemas::BacktestDailyStats {
            id: Uuid::new_v4(),
            backtest_run_id: run_id,
            date: stat.date,
            portfolio_value: stat.portfolio_value,
            cash_balance: stat.cash_balance,
            invested_amount: stat.invested_amount,
            daily_return: stat.daily_return,
            cumulative_return: stat.cumulative_return,
            drawdown: stat.drawdown,
            holdings: stat.holdings.clone(),
        };
        mst_db::backtest::insert_daily_stats(pool, &record).await?;
    }

    Ok(())
}
