use chrono::{NaiveTime, Utc};
use mst_schemas::{AutoTradeConfig, NewsArticleDraft, RiskLevel, Side, TradeHistory, TradeStatus};
use uuid::Uuid;

/// A financial-sounding news draft with sane defaults, one field at a time
/// overridable via the builder methods below.
pub fn news_draft(title: &str, content: &str, asset_type: &str) -> NewsArticleDraft {
    NewsArticleDraft {
        title: title.to_string(),
        content: content.to_string(),
        description: None,
        author: Some("Test Wire".to_string()),
        published_date: Utc::now(),
        source: "test-source".to_string(),
        url: Some(format!("https://example.test/{}", Uuid::new_v4())),
        asset_type: asset_type.to_string(),
    }
}

pub fn auto_trade_config(user_id: &str) -> AutoTradeConfig {
    AutoTradeConfig {
        user_id: user_id.to_string(),
        is_enabled: true,
        max_investment_amount: 1_000_000.0,
        max_position_size: 200_000.0,
        risk_level: RiskLevel::Medium,
        buy_threshold: 70,
        sell_threshold: 30,
        stop_loss_percentage: 5.0,
        daily_loss_limit: Some(50_000.0),
        trading_start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        trading_end_time: NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
        allowed_symbols: None,
        excluded_symbols: Vec::new(),
        notification_target: None,
    }
}

#[allow(clippy::too_many_arguments)]
pub fn trade(
    user_id: &str,
    symbol: &str,
    side: Side,
    quantity: i64,
    price: f64,
    profit_loss: Option<f64>,
    vix_at_entry: Option<f64>,
) -> TradeHistory {
    TradeHistory {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        broker_order_id: format!("test-order-{}", Uuid::new_v4()),
        symbol: symbol.to_string(),
        side,
        quantity,
        submitted_price: price,
        executed_price: price,
        total_amount: price * quantity as f64,
        profit_loss,
        status: TradeStatus::Completed,
        signal_ratio: 75,
        reasoning: "test fixture".to_string(),
        vix_at_entry,
        executed_at: Utc::now(),
        created_at: Utc::now(),
    }
}
