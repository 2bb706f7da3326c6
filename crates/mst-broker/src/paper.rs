//! Deterministic in-memory paper broker. Orders fill immediately at the
//! submitted price; no randomness, no wall-clock-derived ids, matching the
//! donor paper adapter's design philosophy.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use mst_schemas::{AppError, AppResult, Side, TradeStatus};

use crate::types::{BrokerageApi, TradeResult};

pub struct PaperBroker {
    cash_balance: Mutex<f64>,
    holdings: Mutex<BTreeMap<String, i64>>,
    last_prices: Mutex<BTreeMap<String, f64>>,
    order_seq: AtomicU64,
}

impl PaperBroker {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash_balance: Mutex::new(initial_cash),
            holdings: Mutex::new(BTreeMap::new()),
            last_prices: Mutex::new(BTreeMap::new()),
            order_seq: AtomicU64::new(0),
        }
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        self.last_prices.lock().unwrap().insert(symbol.to_string(), price);
    }

    fn next_order_id(&self, symbol: &str, side: Side) -> String {
        let seq = self.order_seq.fetch_add(1, Ordering::Relaxed);
        format!("paper-{}-{}-{seq}", side.as_str().to_lowercase(), symbol.to_lowercase())
    }
}

#[async_trait]
impl BrokerageApi for PaperBroker {
    async fn get_stock_price(&self, symbol: &str) -> AppResult<f64> {
        self.last_prices
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .ok_or_else(|| AppError::not_found(format!("no paper price set for {symbol}")))
    }

    async fn get_account_balance(&self) -> AppResult<f64> {
        Ok(*self.cash_balance.lock().unwrap())
    }

    async fn get_account_holdings(&self) -> AppResult<Vec<(String, i64)>> {
        Ok(self.holdings.lock().unwrap().iter().map(|(k, v)| (k.clone(), *v)).collect())
    }

    async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: i64,
        price: f64,
    ) -> AppResult<TradeResult> {
        let order_id = self.next_order_id(symbol, side);
        let trade_value = quantity as f64 * price;

        match side {
            Side::Buy => {
                let mut cash = self.cash_balance.lock().unwrap();
                if *cash < trade_value {
                    return Ok(TradeResult {
                        broker_order_id: order_id,
                        status: TradeStatus::Failed,
                        executed_price: price,
                        executed_quantity: 0,
                        message: Some("insufficient paper cash balance".to_string()),
                    });
                }
                *cash -= trade_value;
                drop(cash);
                *self.holdings.lock().unwrap().entry(symbol.to_string()).or_insert(0) += quantity;
            }
            Side::Sell => {
                let mut holdings = self.holdings.lock().unwrap();
                let held = holdings.get(symbol).copied().unwrap_or(0);
                if held < quantity {
                    return Ok(TradeResult {
                        broker_order_id: order_id,
                        status: TradeStatus::Failed,
                        executed_price: price,
                        executed_quantity: 0,
                        message: Some("insufficient paper shares".to_string()),
                    });
                }
                let remaining = held - quantity;
                if remaining == 0 {
                    holdings.remove(symbol);
                } else {
                    holdings.insert(symbol.to_string(), remaining);
                }
                drop(holdings);
                *self.cash_balance.lock().unwrap() += trade_value;
            }
        }

        self.set_price(symbol, price);

        Ok(TradeResult {
            broker_order_id: order_id,
            status: TradeStatus::Completed,
            executed_price: price,
            executed_quantity: quantity,
            message: None,
        })
    }

    async fn cancel_order(&self, _broker_order_id: &str) -> AppResult<()> {
        // Paper orders fill synchronously on submit; nothing to cancel.
        Ok(())
    }

    async fn get_order_status(&self, _broker_order_id: &str) -> AppResult<TradeStatus> {
        Ok(TradeStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn buy_deducts_cash_and_adds_holding() {
        let broker = PaperBroker::new(10_000.0);
        let result = broker.place_order("AAPL", Side::Buy, 10, 100.0).await.unwrap();
        assert_eq!(result.status, TradeStatus::Completed);
        assert_eq!(broker.get_account_balance().await.unwrap(), 9_000.0);
        assert_eq!(broker.get_account_holdings().await.unwrap(), vec![("AAPL".to_string(), 10)]);
    }

    #[tokio::test]
    async fn sell_without_holding_fails_without_erroring() {
        let broker = PaperBroker::new(10_000.0);
        let result = broker.place_order("AAPL", Side::Sell, 5, 100.0).await.unwrap();
        assert_eq!(result.status, TradeStatus::Failed);
    }

    #[tokio::test]
    async fn sell_full_quantity_removes_holding_row() {
        let broker = PaperBroker::new(10_000.0);
        broker.place_order("AAPL", Side::Buy, 10, 100.0).await.unwrap();
        broker.place_order("AAPL", Side::Sell, 10, 110.0).await.unwrap();
        assert!(broker.get_account_holdings().await.unwrap().is_empty());
        assert_eq!(broker.get_account_balance().await.unwrap(), 10_100.0);
    }
}
