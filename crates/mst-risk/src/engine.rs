//! Pure, deterministic risk evaluation. No IO, no clock reads beyond the
//! `now` value the caller supplies — every function here is a plain
//! computation over its arguments so it can be exhaustively unit tested.

use chrono::NaiveTime;
use mst_schemas::{AutoTradeConfig, Side};

use crate::types::{
    EmergencyStop, HoldingsSnapshot, MarketCondition, RejectReason, StopLossOutcome, TradeRequest,
    ValidationOutcome,
};

pub const ABNORMAL_VIX_THRESHOLD: f64 = 40.0;
pub const ELEVATED_VIX_THRESHOLD: f64 = 30.0;

pub fn is_within_trading_hours(now: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    start <= now && now <= end
}

fn is_symbol_allowed(config: &AutoTradeConfig, symbol: &str) -> bool {
    if config.excluded_symbols.iter().any(|s| s == symbol) {
        return false;
    }
    match &config.allowed_symbols {
        Some(allowed) if !allowed.is_empty() => allowed.iter().any(|s| s == symbol),
        _ => true,
    }
}

/// Ordered validation exactly as specified: enabled -> trading hours ->
/// symbol allow/exclude -> daily-loss governor -> side-specific.
pub fn validate_trade(
    config: &AutoTradeConfig,
    now: NaiveTime,
    request: &TradeRequest,
    holdings: &HoldingsSnapshot,
    daily_realized_pnl: f64,
) -> ValidationOutcome {
    if !config.is_enabled {
        return ValidationOutcome::Rejected(RejectReason::TradingDisabled);
    }

    if !is_within_trading_hours(now, config.trading_start_time, config.trading_end_time) {
        return ValidationOutcome::Rejected(RejectReason::OutsideTradingHours);
    }

    if !is_symbol_allowed(config, &request.symbol) {
        return ValidationOutcome::Rejected(RejectReason::SymbolNotAllowed {
            symbol: request.symbol.clone(),
        });
    }

    if let Some(limit) = config.daily_loss_limit {
        if daily_realized_pnl < -limit.abs() {
            return ValidationOutcome::Rejected(RejectReason::DailyLossLimitExceeded {
                realized_pnl: daily_realized_pnl,
                limit: limit.abs(),
            });
        }
    }

    match request.side {
        Side::Buy => validate_buy(config, request, holdings),
        Side::Sell => validate_sell(request, holdings),
    }
}

fn validate_buy(
    config: &AutoTradeConfig,
    request: &TradeRequest,
    holdings: &HoldingsSnapshot,
) -> ValidationOutcome {
    let trade_value = request.quantity as f64 * request.price;

    if trade_value > config.max_position_size {
        return ValidationOutcome::Rejected(RejectReason::PositionSizeExceeded {
            trade_value,
            max_position_size: config.max_position_size,
        });
    }

    let would_be_invested = holdings.invested_amount + trade_value;
    if would_be_invested > config.max_investment_amount {
        return ValidationOutcome::Rejected(RejectReason::InvestmentLimitExceeded {
            would_be_invested,
            max_investment: config.max_investment_amount,
        });
    }

    if holdings.cash_balance < trade_value {
        return ValidationOutcome::Rejected(RejectReason::InsufficientCash {
            cash: holdings.cash_balance,
            needed: trade_value,
        });
    }

    ValidationOutcome::Approved
}

fn validate_sell(request: &TradeRequest, holdings: &HoldingsSnapshot) -> ValidationOutcome {
    match holdings.find(&request.symbol) {
        None => ValidationOutcome::Rejected(RejectReason::NoHoldingForSymbol {
            symbol: request.symbol.clone(),
        }),
        Some(held) if held.quantity < request.quantity => {
            ValidationOutcome::Rejected(RejectReason::InsufficientShares {
                held: held.quantity,
                requested: request.quantity,
            })
        }
        Some(_) => ValidationOutcome::Approved,
    }
}

/// `base * risk_multiplier * signal_factor`, clamped by remaining
/// investment capacity and cash, floor-divided by price, with the
/// minimum-1-share rule when the target amount can afford at least one
/// share but floor division would otherwise round to zero.
pub fn position_size(
    config: &AutoTradeConfig,
    price: f64,
    signal_ratio: i32,
    holdings: &HoldingsSnapshot,
) -> i64 {
    if price <= 0.0 {
        return 0;
    }

    let risk_multiplier = config.risk_level.multiplier();
    let signal_factor = signal_ratio as f64 / 100.0;
    let mut position_amount = config.max_position_size * risk_multiplier * signal_factor;

    let available_for_investment =
        (config.max_investment_amount - holdings.invested_amount).max(0.0);
    position_amount = position_amount
        .min(available_for_investment)
        .min(holdings.cash_balance);

    if position_amount <= 0.0 {
        return 0;
    }

    let mut quantity = (position_amount / price).floor() as i64;
    if quantity == 0 && position_amount >= price {
        quantity = 1;
    }
    quantity
}

/// `(current - avg) / avg * 100 <= -|stop_loss_pct|`.
pub fn check_stop_loss(
    config: &AutoTradeConfig,
    symbol: &str,
    current_price: f64,
    holdings: &HoldingsSnapshot,
) -> StopLossOutcome {
    let held = match holdings.find(symbol) {
        Some(h) => h,
        None => return StopLossOutcome::NoPosition,
    };

    if held.average_price <= 0.0 {
        return StopLossOutcome::WithinThreshold;
    }

    let loss_pct = ((current_price - held.average_price) / held.average_price) * 100.0;
    let threshold = -config.stop_loss_percentage.abs();

    if loss_pct <= threshold {
        StopLossOutcome::Triggered {
            quantity: held.quantity,
            loss_pct,
            reason: format!(
                "STOP-LOSS: {loss_pct:.2}% loss (threshold: {threshold:.2}%)"
            ),
        }
    } else {
        StopLossOutcome::WithinThreshold
    }
}

/// VIX > 40 is abnormal; (30, 40] is elevated (logged, not yet abnormal).
pub fn detect_abnormal_market(vix: Option<f64>) -> MarketCondition {
    match vix {
        Some(v) if v > ABNORMAL_VIX_THRESHOLD => MarketCondition::Abnormal { vix: v },
        Some(v) if v > ELEVATED_VIX_THRESHOLD => MarketCondition::Elevated { vix: v },
        _ => MarketCondition::Normal,
    }
}

pub fn emergency_stop(reason: impl Into<String>) -> EmergencyStop {
    EmergencyStop {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mst_schemas::RiskLevel;

    fn base_config() -> AutoTradeConfig {
        AutoTradeConfig {
            user_id: "u1".into(),
            is_enabled: true,
            max_investment_amount: 10_000_000.0,
            max_position_size: 2_000_000.0,
            risk_level: RiskLevel::Medium,
            buy_threshold: 80,
            sell_threshold: 20,
            stop_loss_percentage: 5.0,
            daily_loss_limit: Some(500_000.0),
            trading_start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            trading_end_time: NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
            allowed_symbols: None,
            excluded_symbols: vec![],
            notification_target: None,
        }
    }

    #[test]
    fn scenario_s3_buy_position_size() {
        let config = base_config();
        let holdings = HoldingsSnapshot {
            cash_balance: 10_000_000.0,
            invested_amount: 0.0,
            holdings: vec![],
        };
        let qty = position_size(&config, 75_000.0, 85, &holdings);
        assert_eq!(qty, 17);
    }

    #[test]
    fn scenario_s4_stop_loss_trigger() {
        let config = base_config();
        let holdings = HoldingsSnapshot {
            cash_balance: 0.0,
            invested_amount: 0.0,
            holdings: vec![crate::types::HeldPosition {
                symbol: "X",
                quantity: 10,
                average_price: 75_000.0,
            }],
        };
        let outcome = check_stop_loss(&config, "X", 70_000.0, &holdings);
        match outcome {
            StopLossOutcome::Triggered { quantity, loss_pct, .. } => {
                assert_eq!(quantity, 10);
                assert!((loss_pct - (-6.666666666666667)).abs() < 1e-6);
            }
            other => panic!("expected Triggered, got {other:?}"),
        }
    }

    #[test]
    fn scenario_s5_daily_loss_governor_blocks_buy() {
        let config = base_config();
        let holdings = HoldingsSnapshot {
            cash_balance: 10_000_000.0,
            invested_amount: 0.0,
            holdings: vec![],
        };
        let request = TradeRequest {
            symbol: "X".into(),
            side: Side::Buy,
            quantity: 10,
            price: 75_000.0,
        };
        let outcome = validate_trade(
            &config,
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            &request,
            &holdings,
            -600_000.0,
        );
        match outcome {
            ValidationOutcome::Rejected(RejectReason::DailyLossLimitExceeded { .. }) => {}
            other => panic!("expected DailyLossLimitExceeded, got {other:?}"),
        }
    }

    #[test]
    fn position_size_with_zero_price_is_zero() {
        let config = base_config();
        let holdings = HoldingsSnapshot {
            cash_balance: 10_000.0,
            invested_amount: 0.0,
            holdings: vec![],
        };
        assert_eq!(position_size(&config, 0.0, 90, &holdings), 0);
    }

    #[test]
    fn position_size_exceeding_max_position_is_rejected_on_validate() {
        let config = base_config();
        let holdings = HoldingsSnapshot {
            cash_balance: 10_000_000.0,
            invested_amount: 0.0,
            holdings: vec![],
        };
        let request = TradeRequest {
            symbol: "X".into(),
            side: Side::Buy,
            quantity: 100,
            price: 75_000.0, // 7,500,000 > max_position_size 2,000,000
        };
        let outcome = validate_trade(
            &config,
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            &request,
            &holdings,
            0.0,
        );
        match outcome {
            ValidationOutcome::Rejected(RejectReason::PositionSizeExceeded { .. }) => {}
            other => panic!("expected PositionSizeExceeded, got {other:?}"),
        }
    }

    #[test]
    fn abnormal_market_detection_thresholds() {
        assert_eq!(detect_abnormal_market(Some(41.0)).is_abnormal(), true);
        assert_eq!(detect_abnormal_market(Some(35.0)).is_abnormal(), false);
        assert_eq!(detect_abnormal_market(Some(20.0)), MarketCondition::Normal);
    }
}
