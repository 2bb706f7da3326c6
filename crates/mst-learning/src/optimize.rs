use mst_schemas::{LearnedStrategyParams, PatternType, RiskLevel, TradePattern};

use crate::stats::{median, percentile};

/// Finite stand-in for a divide-by-zero profit factor (no losing trades).
/// The Python original tolerates `float('inf')`; storing that in a numeric
/// column isn't representable, so an unusually large finite sentinel is
/// used instead. See the design ledger for the call.
pub const PROFIT_FACTOR_UNDEFINED: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct PatternSummary {
    pub sample_count: i32,
    pub win_rate: f64,
    pub profit_factor: f64,
}

pub fn summarize(patterns: &[TradePattern]) -> PatternSummary {
    if patterns.is_empty() {
        return PatternSummary::default();
    }

    let wins: Vec<&TradePattern> = patterns.iter().filter(|p| p.pattern_type == PatternType::Winning).collect();
    let losses: Vec<&TradePattern> = patterns.iter().filter(|p| p.pattern_type == PatternType::Losing).collect();

    let win_rate = wins.len() as f64 / patterns.len() as f64 * 100.0;

    let gross_profit: f64 = wins.iter().map(|p| p.realized_pnl).sum();
    let gross_loss: f64 = losses.iter().map(|p| p.realized_pnl.abs()).sum();
    let profit_factor = if gross_loss > 0.0 { gross_profit / gross_loss } else { PROFIT_FACTOR_UNDEFINED };

    PatternSummary { sample_count: patterns.len() as i32, win_rate, profit_factor }
}

/// Derives new strategy parameters from extracted patterns. `buy_threshold`
/// is the median entry signal ratio among winning trades; `stop_loss_pct`
/// is the 90th percentile of losing trades' absolute loss percentage.
/// `risk_level` and `sell_threshold` are carried over from the previous
/// active strategy (or `fallback` if there was none) since patterns don't
/// speak to sell-side or risk-appetite tuning.
pub fn derive_params(patterns: &[TradePattern], fallback: &LearnedStrategyParams) -> LearnedStrategyParams {
    let winning_ratios: Vec<f64> = patterns
        .iter()
        .filter(|p| p.pattern_type == PatternType::Winning)
        .map(|p| p.entry_signal_ratio as f64)
        .collect();

    let losing_pcts: Vec<f64> = patterns
        .iter()
        .filter(|p| p.pattern_type == PatternType::Losing)
        .map(|p| p.realized_pnl_pct.abs())
        .collect();

    let buy_threshold = if winning_ratios.is_empty() {
        fallback.buy_threshold
    } else {
        median(&winning_ratios).round() as i32
    };

    let stop_loss_percentage = if losing_pcts.is_empty() {
        fallback.stop_loss_percentage
    } else {
        percentile(&losing_pcts, 90.0)
    };

    LearnedStrategyParams {
        buy_threshold,
        sell_threshold: fallback.sell_threshold,
        stop_loss_percentage,
        risk_level: fallback.risk_level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mst_schemas::MarketRegime;
    use uuid::Uuid;

    fn pattern(entry_ratio: i32, pnl: f64, pnl_pct: f64, kind: PatternType) -> TradePattern {
        TradePattern {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            symbol: "AAPL".to_string(),
            entry_trade_id: Uuid::new_v4(),
            exit_trade_id: Uuid::new_v4(),
            entry_signal_ratio: entry_ratio,
            holding_duration_hours: 4.0,
            realized_pnl: pnl,
            realized_pnl_pct: pnl_pct,
            market_regime: MarketRegime::Normal,
            pattern_type: kind,
            extracted_at: Utc::now(),
        }
    }

    #[test]
    fn summarize_computes_win_rate_and_profit_factor() {
        let patterns = vec![
            pattern(80, 100.0, 10.0, PatternType::Winning),
            pattern(75, 50.0, 5.0, PatternType::Winning),
            pattern(60, -40.0, -4.0, PatternType::Losing),
        ];
        let summary = summarize(&patterns);
        assert_eq!(summary.sample_count, 3);
        assert!((summary.win_rate - 66.666666).abs() < 0.001);
        assert!((summary.profit_factor - 150.0 / 40.0).abs() < 0.001);
    }

    #[test]
    fn no_losses_clamps_profit_factor_to_sentinel() {
        let patterns = vec![pattern(80, 100.0, 10.0, PatternType::Winning)];
        let summary = summarize(&patterns);
        assert_eq!(summary.profit_factor, PROFIT_FACTOR_UNDEFINED);
    }

    #[test]
    fn derive_params_uses_median_and_p90() {
        let fallback = LearnedStrategyParams {
            buy_threshold: 70,
            sell_threshold: 30,
            stop_loss_percentage: 5.0,
            risk_level: RiskLevel::Medium,
        };
        let patterns = vec![
            pattern(80, 100.0, 10.0, PatternType::Winning),
            pattern(90, 100.0, 10.0, PatternType::Winning),
            pattern(60, -40.0, -4.0, PatternType::Losing),
            pattern(60, -80.0, -8.0, PatternType::Losing),
        ];
        let params = derive_params(&patterns, &fallback);
        assert_eq!(params.buy_threshold, 85);
        assert!(params.stop_loss_percentage > 4.0);
        assert_eq!(params.sell_threshold, fallback.sell_threshold);
        assert_eq!(params.risk_level, fallback.risk_level);
    }

    #[test]
    fn empty_patterns_fall_back_entirely() {
        let fallback = LearnedStrategyParams {
            buy_threshold: 70,
            sell_threshold: 30,
            stop_loss_percentage: 5.0,
            risk_level: RiskLevel::High,
        };
        let params = derive_params(&[], &fallback);
        assert_eq!(params.buy_threshold, fallback.buy_threshold);
        assert_eq!(params.stop_loss_percentage, fallback.stop_loss_percentage);
    }
}
