use chrono::Utc;
use mst_schemas::{AppResult, MarketRegime, PatternType, TradeHistory, TradePattern};
use sqlx::PgPool;
use uuid::Uuid;

/// Builds one `TradePattern` per FIFO-paired (entry, exit) trade. Pure —
/// no IO, no clock — so callers can unit test the derivation logic with
/// hand-built trades.
pub fn build_patterns(user_id: &str, pairs: &[(TradeHistory, TradeHistory)]) -> Vec<TradePattern> {
    pairs
        .iter()
        .map(|(entry, exit)| {
            let holding_duration_hours =
                (exit.executed_at - entry.executed_at).num_seconds() as f64 / 3600.0;
            let realized_pnl = exit.profit_loss.unwrap_or(0.0);
            let entry_cost = entry.executed_price * entry.quantity as f64;
            let realized_pnl_pct = if entry_cost != 0.0 { realized_pnl / entry_cost * 100.0 } else { 0.0 };
            let vix = entry.vix_at_entry.unwrap_or(mst_signal::VIX_FALLBACK_NEUTRAL);

            TradePattern {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                symbol: entry.symbol.clone(),
                entry_trade_id: entry.id,
                exit_trade_id: exit.id,
                entry_signal_ratio: entry.signal_ratio,
                holding_duration_hours,
                realized_pnl,
                realized_pnl_pct,
                market_regime: MarketRegime::from_vix(vix),
                pattern_type: if realized_pnl > 0.0 { PatternType::Winning } else { PatternType::Losing },
                extracted_at: Utc::now(),
            }
        })
        .collect()
}

/// Extracts and persists patterns for every user who has ever traded.
/// Returns the total number of patterns extracted across all users.
pub async fn extract_all(pool: &PgPool) -> AppResult<i32> {
    let user_ids = mst_db::trades::distinct_user_ids(pool).await?;
    let mut total = 0i32;

    for user_id in user_ids {
        let pairs = mst_db::trades::unpaired_buy_sell_pairs(pool, &user_id).await?;
        let patterns = build_patterns(&user_id, &pairs);
        for pattern in &patterns {
            mst_db::learning::insert_pattern(pool, pattern).await?;
        }
        total += patterns.len() as i32;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use mst_schemas::{Side, TradeStatus};

    fn trade(side: Side, price: f64, qty: i64, pnl: Option<f64>, vix: Option<f64>, hours_offset: i64) -> TradeHistory {
        TradeHistory {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            broker_order_id: "order-1".to_string(),
            symbol: "AAPL".to_string(),
            side,
            quantity: qty,
            submitted_price: price,
            executed_price: price,
            total_amount: price * qty as f64,
            profit_loss: pnl,
            status: TradeStatus::Completed,
            signal_ratio: 80,
            reasoning: "test".to_string(),
            vix_at_entry: vix,
            executed_at: Utc::now() + Duration::hours(hours_offset),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn winning_pattern_uses_entry_vix_for_regime() {
        let entry = trade(Side::Buy, 100.0, 10, None, Some(15.0), 0);
        let exit = trade(Side::Sell, 110.0, 10, Some(100.0), None, 5);
        let patterns = build_patterns("user-1", &[(entry, exit)]);

        assert_eq!(patterns.len(), 1);
        let p = &patterns[0];
        assert_eq!(p.pattern_type, PatternType::Winning);
        assert_eq!(p.market_regime, MarketRegime::LowVol);
        assert_eq!(p.holding_duration_hours, 5.0);
        assert_eq!(p.realized_pnl_pct, 10.0);
    }

    #[test]
    fn missing_vix_falls_back_to_neutral_regime() {
        let entry = trade(Side::Buy, 100.0, 10, None, None, 0);
        let exit = trade(Side::Sell, 90.0, 10, Some(-100.0), None, 1);
        let patterns = build_patterns("user-1", &[(entry, exit)]);

        assert_eq!(patterns[0].pattern_type, PatternType::Losing);
        assert_eq!(patterns[0].market_regime, MarketRegime::Normal);
    }
}
