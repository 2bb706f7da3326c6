use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mst_schemas::{HoldingSnapshot, Side};
use serde::{Deserialize, Serialize};

/// The backtest's own signal path selector. `Simplified` matches the
/// original historical results and needs only stored sentiment rows;
/// `FullPipeline` reuses the live C6 pipeline exactly, at the cost of
/// requiring a historical VIX series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BacktestSignalMode {
    #[default]
    Simplified,
    FullPipeline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub initial_capital: f64,
    pub max_position_size: f64,
    pub cash_fraction_per_trade: f64,
    pub stop_loss_percentage: f64,
    pub buy_threshold: i32,
    pub sell_threshold: i32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000_000.0,
            max_position_size: 2_000_000.0,
            cash_fraction_per_trade: 0.9,
            stop_loss_percentage: 5.0,
            buy_threshold: 70,
            sell_threshold: 30,
        }
    }
}

/// One simulated trading day's inputs: closing price and precomputed
/// signal ratio per symbol (the ratio computation — simplified or full
/// pipeline — happens upstream of the engine, which only consumes it).
#[derive(Debug, Clone)]
pub struct DayInput {
    pub date: DateTime<Utc>,
    pub prices: HashMap<String, f64>,
    pub signal_ratios: HashMap<String, i32>,
}

#[derive(Debug, Clone)]
pub struct SimTrade {
    pub date: DateTime<Utc>,
    pub symbol: String,
    pub side: Side,
    pub quantity: i64,
    pub price: f64,
    pub signal_ratio: i32,
    pub reasoning: String,
    pub profit_loss: Option<f64>,
    pub profit_loss_percentage: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SimDailyStat {
    pub date: DateTime<Utc>,
    pub portfolio_value: f64,
    pub cash_balance: f64,
    pub invested_amount: f64,
    pub daily_return: Option<f64>,
    pub cumulative_return: f64,
    pub drawdown: f64,
    pub holdings: Vec<HoldingSnapshot>,
}

#[derive(Debug, Clone, Default)]
pub struct Metrics {
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

#[derive(Debug, Clone)]
pub struct SimOutput {
    pub trades: Vec<SimTrade>,
    pub daily_stats: Vec<SimDailyStat>,
    pub metrics: Metrics,
}
