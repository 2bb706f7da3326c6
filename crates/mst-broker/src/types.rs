use async_trait::async_trait;
use mst_schemas::{AppResult, Side, TradeStatus};

#[derive(Debug, Clone)]
pub struct TradeResult {
    pub broker_order_id: String,
    pub status: TradeStatus,
    pub executed_price: f64,
    pub executed_quantity: i64,
    pub message: Option<String>,
}

/// The trading engine's view of a brokerage. A rejected order is a
/// normal `Ok(TradeResult { status: Failed, .. })`, not an `Err` — `Err`
/// is reserved for the adapter itself failing (auth, network, timeout).
#[async_trait]
pub trait BrokerageApi: Send + Sync {
    async fn get_stock_price(&self, symbol: &str) -> AppResult<f64>;
    async fn get_account_balance(&self) -> AppResult<f64>;
    async fn get_account_holdings(&self) -> AppResult<Vec<(String, i64)>>;
    async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: i64,
        price: f64,
    ) -> AppResult<TradeResult>;
    async fn cancel_order(&self, broker_order_id: &str) -> AppResult<()>;
    async fn get_order_status(&self, broker_order_id: &str) -> AppResult<TradeStatus>;
}
