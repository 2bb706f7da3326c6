//! Backtest engine (C10): a pure function of `(config, ordered day inputs)`
//! with no wall-clock or RNG dependency, so identical inputs reproduce
//! bit-identical trades and daily stats.

use std::collections::BTreeMap;

use mst_schemas::{HoldingSnapshot, Side};

use crate::types::{DayInput, Metrics, SimConfig, SimDailyStat, SimOutput, SimTrade};

#[derive(Debug, Clone)]
struct Position {
    quantity: i64,
    average_price: f64,
}

pub struct BacktestEngine {
    config: SimConfig,
    cash: f64,
    holdings: BTreeMap<String, Position>,
    peak_value: f64,
    trades: Vec<SimTrade>,
    daily_stats: Vec<SimDailyStat>,
}

impl BacktestEngine {
    pub fn new(config: SimConfig) -> Self {
        let initial = config.initial_capital;
        Self {
            config,
            cash: initial,
            holdings: BTreeMap::new(),
            peak_value: initial,
            trades: Vec::new(),
            daily_stats: Vec::new(),
        }
    }

    /// Runs the full simulation over `days`, ordered chronologically.
    pub fn run(mut self, days: &[DayInput]) -> SimOutput {
        for day in days {
            self.process_day(day);
        }
        let metrics = compute_metrics(&self.trades, &self.daily_stats, self.config.initial_capital);
        SimOutput { trades: self.trades, daily_stats: self.daily_stats, metrics }
    }

    /// Stop-loss sells first (against that day's price, before any buys),
    /// then per-symbol signal-driven BUY/SELL, then the day's stats.
    fn process_day(&mut self, day: &DayInput) {
        let held_symbols: Vec<String> = self.holdings.keys().cloned().collect();
        for symbol in &held_symbols {
            let Some(&price) = day.prices.get(symbol) else { continue };
            let position = self.holdings.get(symbol).unwrap();
            if position.average_price <= 0.0 {
                continue;
            }
            let loss_pct = ((price - position.average_price) / position.average_price) * 100.0;
            if loss_pct <= -self.config.stop_loss_percentage.abs() {
                let ratio = day.signal_ratios.get(symbol).copied().unwrap_or(0);
                self.sell(symbol, price, day.date, ratio, format!("STOP-LOSS: {loss_pct:.2}%"));
            }
        }

        let mut symbols: Vec<&String> = day.signal_ratios.keys().collect();
        symbols.sort();
        for symbol in symbols {
            let ratio = day.signal_ratios[symbol];
            let Some(&price) = day.prices.get(symbol) else { continue };

            if ratio >= self.config.buy_threshold && !self.holdings.contains_key(symbol) {
                self.buy(symbol, price, day.date, ratio);
            } else if ratio <= self.config.sell_threshold && self.holdings.contains_key(symbol) {
                self.sell(symbol, price, day.date, ratio, "signal sell".to_string());
            }
        }

        self.record_daily_stats(day);
    }

    fn buy(&mut self, symbol: &str, price: f64, date: chrono::DateTime<chrono::Utc>, ratio: i32) {
        if price <= 0.0 {
            return;
        }
        let budget = self.config.max_position_size.min(self.cash * self.config.cash_fraction_per_trade);
        let quantity = (budget / price).floor() as i64;
        if quantity <= 0 {
            return;
        }

        let cost = quantity as f64 * price;
        self.cash -= cost;
        self.holdings.insert(symbol.to_string(), Position { quantity, average_price: price });

        self.trades.push(SimTrade {
            date,
            symbol: symbol.to_string(),
            side: Side::Buy,
            quantity,
            price,
            signal_ratio: ratio,
            reasoning: "signal buy".to_string(),
            profit_loss: None,
            profit_loss_percentage: None,
        });
    }

    fn sell(&mut self, symbol: &str, price: f64, date: chrono::DateTime<chrono::Utc>, ratio: i32, reasoning: String) {
        let Some(position) = self.holdings.remove(symbol) else { return };
        let proceeds = position.quantity as f64 * price;
        self.cash += proceeds;

        let profit_loss = (price - position.average_price) * position.quantity as f64;
        let profit_loss_percentage = if position.average_price > 0.0 {
            Some(((price - position.average_price) / position.average_price) * 100.0)
        } else {
            None
        };

        self.trades.push(SimTrade {
            date,
            symbol: symbol.to_string(),
            side: Side::Sell,
            quantity: position.quantity,
            price,
            signal_ratio: ratio,
            reasoning,
            profit_loss: Some(profit_loss),
            profit_loss_percentage,
        });
    }

    fn record_daily_stats(&mut self, day: &DayInput) {
        let mut invested_amount = 0.0;
        let mut holdings_value = 0.0;
        let mut holdings_snapshot = Vec::new();

        for (symbol, position) in &self.holdings {
            let current_price = day.prices.get(symbol).copied().unwrap_or(position.average_price);
            let value = position.quantity as f64 * current_price;
            invested_amount += position.quantity as f64 * position.average_price;
            holdings_value += value;
            holdings_snapshot.push(HoldingSnapshot {
                symbol: symbol.clone(),
                quantity: position.quantity,
                avg_price: position.average_price,
                current_price,
                value,
            });
        }

        let portfolio_value = self.cash + holdings_value;
        self.peak_value = self.peak_value.max(portfolio_value);
        let drawdown = if self.peak_value > 0.0 {
            (self.peak_value - portfolio_value) / self.peak_value
        } else {
            0.0
        };

        let daily_return = self
            .daily_stats
            .last()
            .filter(|prev| prev.portfolio_value > 0.0)
            .map(|prev| (portfolio_value / prev.portfolio_value) - 1.0);

        let cumulative_return = if self.config.initial_capital > 0.0 {
            (portfolio_value / self.config.initial_capital) - 1.0
        } else {
            0.0
        };

        self.daily_stats.push(SimDailyStat {
            date: day.date,
            portfolio_value,
            cash_balance: self.cash,
            invested_amount,
            daily_return,
            cumulative_return,
            drawdown,
            holdings: holdings_snapshot,
        });
    }
}

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn stddev(values: &[f64], mean_value: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean_value).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Sharpe/Sortino annualized by `sqrt(252)`, matching the original's daily
/// bar assumption. Sortino's downside deviation considers only
/// below-target (here, below zero) daily returns.
pub fn compute_metrics(trades: &[SimTrade], daily_stats: &[SimDailyStat], initial_capital: f64) -> Metrics {
    let final_capital = daily_stats.last().map(|d| d.portfolio_value).unwrap_or(initial_capital);
    let total_return = if initial_capital > 0.0 { (final_capital / initial_capital) - 1.0 } else { 0.0 };

    let closed: Vec<&SimTrade> = trades.iter().filter(|t| t.side == Side::Sell).collect();
    let winning_trades = closed.iter().filter(|t| t.profit_loss.unwrap_or(0.0) > 0.0).count() as i32;
    let losing_trades = closed.iter().filter(|t| t.profit_loss.unwrap_or(0.0) < 0.0).count() as i32;
    let win_rate = if !closed.is_empty() { winning_trades as f64 / closed.len() as f64 } else { 0.0 };

    let max_drawdown = daily_stats.iter().map(|d| d.drawdown).fold(0.0, f64::max);

    let daily_returns: Vec<f64> = daily_stats.iter().filter_map(|d| d.daily_return).collect();
    let mean_return = mean(&daily_returns);
    let sd = stddev(&daily_returns, mean_return);
    let sharpe_ratio = if sd > 0.0 { (mean_return / sd) * TRADING_DAYS_PER_YEAR.sqrt() } else { 0.0 };

    let downside: Vec<f64> = daily_returns.iter().copied().filter(|r| *r < 0.0).collect();
    let downside_mean = mean(&downside);
    let downside_sd = stddev(&downside, downside_mean);
    let sortino_ratio = if downside_sd > 0.0 { (mean_return / downside_sd) * TRADING_DAYS_PER_YEAR.sqrt() } else { 0.0 };

    Metrics {
        final_capital,
        total_return,
        total_trades: closed.len() as i32,
        winning_trades,
        losing_trades,
        win_rate,
        max_drawdown,
        sharpe_ratio,
        sortino_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn day(date: chrono::DateTime<chrono::Utc>, prices: &[(&str, f64)], ratios: &[(&str, i32)]) -> DayInput {
        DayInput {
            date,
            prices: prices.iter().map(|(s, p)| (s.to_string(), *p)).collect(),
            signal_ratios: ratios.iter().map(|(s, r)| (s.to_string(), *r)).collect(),
        }
    }

    #[test]
    fn buy_then_hold_then_sell_tracks_cash_and_pnl() {
        let d0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let d1 = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let d2 = Utc.with_ymd_and_hms(2025, 1, 3, 0, 0, 0).unwrap();

        let days = vec![
            day(d0, &[("X", 100.0)], &[("X", 80)]),
            day(d1, &[("X", 110.0)], &[("X", 50)]),
            day(d2, &[("X", 120.0)], &[("X", 20)]),
        ];

        let config = SimConfig { initial_capital: 10_000.0, max_position_size: 10_000.0, ..Default::default() };
        let output = BacktestEngine::new(config).run(&days);

        assert_eq!(output.trades.len(), 2);
        assert_eq!(output.trades[0].side, Side::Buy);
        assert_eq!(output.trades[1].side, Side::Sell);
        assert!(output.trades[1].profit_loss.unwrap() > 0.0);
        assert_eq!(output.daily_stats.len(), 3);
    }

    #[test]
    fn stop_loss_sells_before_any_buy_is_considered_same_day() {
        let d0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let d1 = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();

        let days = vec![
            day(d0, &[("X", 100.0)], &[("X", 80)]),
            day(d1, &[("X", 90.0)], &[("X", 40)]),
        ];

        let config = SimConfig {
            initial_capital: 10_000.0,
            max_position_size: 10_000.0,
            stop_loss_percentage: 5.0,
            ..Default::default()
        };
        let output = BacktestEngine::new(config).run(&days);

        assert_eq!(output.trades.len(), 2);
        assert!(output.trades[1].reasoning.starts_with("STOP-LOSS"));
    }

    #[test]
    fn determinism_same_inputs_same_outputs() {
        let d0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let days = vec![day(d0, &[("X", 100.0)], &[("X", 90)])];

        let out_a = BacktestEngine::new(SimConfig::default()).run(&days);
        let out_b = BacktestEngine::new(SimConfig::default()).run(&days);

        assert_eq!(out_a.trades.len(), out_b.trades.len());
        assert_eq!(out_a.daily_stats.len(), out_b.daily_stats.len());
        assert_eq!(out_a.metrics.final_capital, out_b.metrics.final_capital);
    }
}
