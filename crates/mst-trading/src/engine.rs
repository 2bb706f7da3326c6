//! Auto-trading engine (C8): turns a computed signal ratio into an
//! executed (or rejected) trade, applying C7's validation and sizing, and
//! persists the result through C1.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, NaiveTime, Utc};
use mst_broker::BrokerageApi;
use mst_risk::{
    check_stop_loss, detect_abnormal_market, position_size, validate_trade, HeldPosition,
    HoldingsSnapshot, MarketCondition, StopLossOutcome, TradeRequest, ValidationOutcome,
};
use mst_schemas::{
    AccountHolding, AppError, AppResult, Side, TradeHistory, TradeStatus,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::registry::UserLockRegistry;

#[derive(Debug, Clone)]
pub struct EngineStatus {
    pub is_running: bool,
    pub last_check_time: Option<DateTime<Utc>>,
    pub enabled: bool,
    pub holdings_count: i64,
    pub today_trade_count: i64,
    pub today_realized_pnl: f64,
}

#[derive(Default, Clone, Copy)]
struct RuntimeState {
    is_running: bool,
    last_check_time: Option<DateTime<Utc>>,
}

pub struct TradingEngine {
    pool: PgPool,
    broker: Arc<dyn BrokerageApi>,
    locks: UserLockRegistry,
    runtime: StdMutex<HashMap<String, RuntimeState>>,
}

fn build_snapshot(cash_balance: f64, invested_amount: f64, holdings: &[AccountHolding]) -> HoldingsSnapshot<'_> {
    HoldingsSnapshot {
        cash_balance,
        invested_amount,
        holdings: holdings
            .iter()
            .map(|h| HeldPosition {
                symbol: &h.symbol,
                quantity: h.quantity,
                average_price: h.average_price,
            })
            .collect(),
    }
}

#[allow(clippy::too_many_arguments)]
fn new_trade(
    user_id: &str,
    broker_order_id: String,
    symbol: &str,
    side: Side,
    quantity: i64,
    submitted_price: f64,
    executed_price: f64,
    profit_loss: Option<f64>,
    status: TradeStatus,
    signal_ratio: i32,
    reasoning: String,
    vix_at_entry: Option<f64>,
) -> TradeHistory {
    let now = Utc::now();
    TradeHistory {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        broker_order_id,
        symbol: symbol.to_string(),
        side,
        quantity,
        submitted_price,
        executed_price,
        total_amount: executed_price * quantity as f64,
        profit_loss,
        status,
        signal_ratio,
        reasoning,
        vix_at_entry,
        executed_at: now,
        created_at: now,
    }
}

impl TradingEngine {
    pub fn new(pool: PgPool, broker: Arc<dyn BrokerageApi>) -> Self {
        Self {
            pool,
            broker,
            locks: UserLockRegistry::new(),
            runtime: StdMutex::new(HashMap::new()),
        }
    }

    fn mark_tick(&self, user_id: &str) {
        let mut runtime = self.runtime.lock().unwrap();
        let state = runtime.entry(user_id.to_string()).or_default();
        state.is_running = true;
        state.last_check_time = Some(Utc::now());
    }

    fn mark_idle(&self, user_id: &str) {
        if let Some(state) = self.runtime.lock().unwrap().get_mut(user_id) {
            state.is_running = false;
        }
    }

    /// Checks the overall market before processing any symbol for this
    /// tick. An abnormal VIX reading means every symbol is treated as
    /// HOLD for this tick only — the config itself stays enabled.
    pub fn check_market_conditions(&self, vix: Option<f64>) -> MarketCondition {
        let condition = detect_abnormal_market(vix);
        match condition {
            MarketCondition::Abnormal { vix } => {
                tracing::warn!(vix, "market abnormal, holding all symbols this tick");
            }
            MarketCondition::Elevated { vix } => {
                tracing::info!(vix, "market elevated, not yet abnormal");
            }
            MarketCondition::Normal => {}
        }
        condition
    }

    /// Processes one symbol's signal for `user_id`: BUY if `signal_ratio
    /// >= buy_threshold`, SELL (full held quantity) if `<= sell_threshold`
    /// and currently held, otherwise HOLD (`Ok(None)`).
    pub async fn process_signal(
        &self,
        user_id: &str,
        symbol: &str,
        signal_ratio: i32,
        price: f64,
        now: NaiveTime,
        vix: Option<f64>,
    ) -> AppResult<Option<TradeHistory>> {
        let lock = self.locks.lock_for(user_id);
        let _guard = lock.lock().await;
        self.mark_tick(user_id);

        let result = self.process_signal_locked(user_id, symbol, signal_ratio, price, now, vix).await;
        self.mark_idle(user_id);
        result
    }

    async fn process_signal_locked(
        &self,
        user_id: &str,
        symbol: &str,
        signal_ratio: i32,
        price: f64,
        now: NaiveTime,
        vix: Option<f64>,
    ) -> AppResult<Option<TradeHistory>> {
        let config = match mst_db::auto_trade::for_user(&self.pool, user_id).await? {
            Some(c) => c,
            None => return Ok(None),
        };

        if signal_ratio >= config.buy_threshold {
            self.execute_buy(user_id, symbol, signal_ratio, price, now, vix, &config).await
        } else if signal_ratio <= config.sell_threshold {
            let held = mst_db::holdings::for_symbol(&self.pool, user_id, symbol).await?;
            match held {
                Some(h) if h.quantity > 0 => {
                    self.execute_sell(user_id, symbol, signal_ratio, price, now, h, "signal sell".to_string())
                        .await
                        .map(Some)
                }
                _ => Ok(None),
            }
        } else {
            Ok(None)
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_buy(
        &self,
        user_id: &str,
        symbol: &str,
        signal_ratio: i32,
        price: f64,
        now: NaiveTime,
        vix: Option<f64>,
        config: &mst_schemas::AutoTradeConfig,
    ) -> AppResult<Option<TradeHistory>> {
        let cash_balance = self.broker.get_account_balance().await?;
        let holdings = mst_db::holdings::for_user(&self.pool, user_id).await?;
        let invested = mst_db::holdings::invested_amount(&self.pool, user_id).await?;
        let snapshot = build_snapshot(cash_balance, invested, &holdings);

        let quantity = position_size(config, price, signal_ratio, &snapshot);
        if quantity <= 0 {
            return Ok(None);
        }

        let request = TradeRequest { symbol: symbol.to_string(), side: Side::Buy, quantity, price };
        let day_start = Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
        let realized_today = mst_db::trades::realized_pnl_since(&self.pool, user_id, day_start).await?;

        match validate_trade(config, now, &request, &snapshot, realized_today) {
            ValidationOutcome::Rejected(reason) => {
                tracing::info!(user_id, symbol, reason = %reason.message(), "buy rejected");
                Ok(None)
            }
            ValidationOutcome::Approved => {
                let result = self.broker.place_order(symbol, Side::Buy, quantity, price).await?;

                if result.status == TradeStatus::Completed {
                    let existing = holdings.iter().find(|h| h.symbol == symbol);
                    let (old_qty, old_avg) = existing.map(|h| (h.quantity, h.average_price)).unwrap_or((0, 0.0));
                    let new_qty = old_qty + result.executed_quantity;
                    let new_avg = if new_qty > 0 {
                        (old_avg * old_qty as f64 + result.executed_price * result.executed_quantity as f64)
                            / new_qty as f64
                    } else {
                        old_avg
                    };
                    mst_db::holdings::upsert_holding(&self.pool, user_id, symbol, new_qty, new_avg, result.executed_price)
                        .await?;
                }

                let trade = new_trade(
                    user_id,
                    result.broker_order_id,
                    symbol,
                    Side::Buy,
                    quantity,
                    price,
                    result.executed_price,
                    None,
                    result.status,
                    signal_ratio,
                    result.message.unwrap_or_else(|| "buy signal".to_string()),
                    vix,
                );
                mst_db::trades::insert_trade(&self.pool, &trade).await?;
                Ok(Some(trade))
            }
        }
    }

    /// Sells the full held quantity — the auto-trading loop never submits
    /// a partial sell; `reasoning` distinguishes a signal sell from a
    /// stop-loss sell for the trade log.
    async fn execute_sell(
        &self,
        user_id: &str,
        symbol: &str,
        signal_ratio: i32,
        price: f64,
        now: NaiveTime,
        held: AccountHolding,
        reasoning: String,
    ) -> AppResult<TradeHistory> {
        let quantity = held.quantity;
        let request = TradeRequest { symbol: symbol.to_string(), side: Side::Sell, quantity, price };
        let cash_balance = self.broker.get_account_balance().await?;
        let invested = mst_db::holdings::invested_amount(&self.pool, user_id).await?;
        let snapshot = build_snapshot(cash_balance, invested, std::slice::from_ref(&held));
        let day_start = Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
        let realized_today = mst_db::trades::realized_pnl_since(&self.pool, user_id, day_start).await?;

        let config = mst_db::auto_trade::for_user(&self.pool, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("no auto-trade config for user"))?;

        if let ValidationOutcome::Rejected(reason) = validate_trade(&config, now, &request, &snapshot, realized_today) {
            return Err(AppError::validation(reason.message()));
        }

        let result = self.broker.place_order(symbol, Side::Sell, quantity, price).await?;
        let realized_pnl = (result.executed_price - held.average_price) * result.executed_quantity as f64;

        if result.status == TradeStatus::Completed {
            let remaining = held.quantity - result.executed_quantity;
            if remaining <= 0 {
                mst_db::holdings::delete_holding(&self.pool, user_id, symbol).await?;
            } else {
                mst_db::holdings::upsert_holding(&self.pool, user_id, symbol, remaining, held.average_price, result.executed_price)
                    .await?;
            }
        }

        let trade = new_trade(
            user_id,
            result.broker_order_id,
            symbol,
            Side::Sell,
            quantity,
            price,
            result.executed_price,
            Some(realized_pnl),
            result.status,
            signal_ratio,
            result.message.unwrap_or(reasoning),
            None,
        );
        mst_db::trades::insert_trade(&self.pool, &trade).await?;
        Ok(trade)
    }

    /// Checks every held position against the stop-loss threshold and
    /// sells any that trigger. Reuses the sell path, tagging the trade's
    /// reasoning with C7's `STOP-LOSS: {pct}%` message.
    pub async fn monitor_positions(
        &self,
        user_id: &str,
        now: NaiveTime,
        current_prices: &HashMap<String, f64>,
    ) -> AppResult<Vec<TradeHistory>> {
        let lock = self.locks.lock_for(user_id);
        let _guard = lock.lock().await;
        self.mark_tick(user_id);

        let config = match mst_db::auto_trade::for_user(&self.pool, user_id).await? {
            Some(c) => c,
            None => {
                self.mark_idle(user_id);
                return Ok(vec![]);
            }
        };

        let holdings = mst_db::holdings::for_user(&self.pool, user_id).await?;
        let mut sold = Vec::new();

        for holding in holdings {
            let Some(&price) = current_prices.get(&holding.symbol) else { continue };
            let snapshot = build_snapshot(0.0, 0.0, std::slice::from_ref(&holding));
            let outcome = check_stop_loss(&config, &holding.symbol, price, &snapshot);

            if let StopLossOutcome::Triggered { reason, .. } = outcome {
                let trade = self
                    .execute_sell(user_id, &holding.symbol.clone(), 0, price, now, holding, reason)
                    .await?;
                sold.push(trade);
            }
        }

        self.mark_idle(user_id);
        Ok(sold)
    }

    pub async fn get_status(&self, user_id: &str) -> AppResult<EngineStatus> {
        let config = mst_db::auto_trade::for_user(&self.pool, user_id).await?;
        let holdings = mst_db::holdings::for_user(&self.pool, user_id).await?;
        let day_start = Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
        let realized = mst_db::trades::realized_pnl_since(&self.pool, user_id, day_start).await?;
        let trades_today = mst_db::trades::for_user(&self.pool, user_id, 1000).await?;
        let today_trade_count = trades_today
            .iter()
            .filter(|t| t.executed_at >= day_start)
            .count() as i64;

        let runtime = self.runtime.lock().unwrap().get(user_id).copied().unwrap_or_default();

        Ok(EngineStatus {
            is_running: runtime.is_running,
            last_check_time: runtime.last_check_time,
            enabled: config.map(|c| c.is_enabled).unwrap_or(false),
            holdings_count: holdings.len() as i64,
            today_trade_count,
            today_realized_pnl: realized,
        })
    }
}
