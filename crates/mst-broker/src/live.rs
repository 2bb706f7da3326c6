//! HTTP-backed brokerage adapter speaking a trading-API style REST
//! surface (order placement, account, positions). Holds a bearer token
//! behind a mutex and refreshes it shortly before expiry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mst_schemas::{AppError, AppResult, Side, TradeStatus};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::types::{BrokerageApi, TradeResult};

const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

struct TokenState {
    access_token: String,
    expires_at: DateTime<Utc>,
}

pub struct LiveBroker {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    token: Arc<Mutex<Option<TokenState>>>,
}

impl LiveBroker {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            token: Arc::new(Mutex::new(None)),
        }
    }

    async fn bearer_token(&self) -> AppResult<String> {
        let mut guard = self.token.lock().await;
        let needs_refresh = match guard.as_ref() {
            Some(state) => Utc::now() + TOKEN_REFRESH_MARGIN >= state.expires_at,
            None => true,
        };
        if needs_refresh {
            let fresh = self.fetch_token().await?;
            *guard = Some(fresh);
        }
        Ok(guard.as_ref().unwrap().access_token.clone())
    }

    async fn fetch_token(&self) -> AppResult<TokenState> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: i64,
        }

        let resp = self
            .http
            .post(format!("{}/oauth/token", self.base_url))
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .send()
            .await
            .map_err(AppError::from)?;

        if !resp.status().is_success() {
            return Err(classify_status(resp.status()));
        }

        let body: TokenResponse = resp.json().await.map_err(AppError::from)?;
        Ok(TokenState {
            access_token: body.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(body.expires_in),
        })
    }

    async fn authed_request(&self, method: reqwest::Method, path: &str) -> AppResult<reqwest::RequestBuilder> {
        let token = self.bearer_token().await?;
        Ok(self.http.request(method, format!("{}{}", self.base_url, path)).bearer_auth(token))
    }
}

fn classify_status(status: reqwest::StatusCode) -> AppError {
    if status.as_u16() == 429 || status.is_server_error() {
        AppError::dependency_transient(format!("live broker returned {status}"))
    } else {
        AppError::dependency_permanent(format!("live broker returned {status}"))
    }
}

#[derive(Deserialize)]
struct QuoteResponse {
    price: f64,
}

#[derive(Deserialize)]
struct AccountResponse {
    cash: f64,
}

#[derive(Deserialize)]
struct PositionResponse {
    symbol: String,
    quantity: i64,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: String,
    status: String,
    filled_avg_price: Option<f64>,
    filled_qty: Option<i64>,
}

fn status_from_broker_str(s: &str) -> TradeStatus {
    match s {
        "filled" | "completed" => TradeStatus::Completed,
        _ => TradeStatus::Failed,
    }
}

#[async_trait]
impl BrokerageApi for LiveBroker {
    async fn get_stock_price(&self, symbol: &str) -> AppResult<f64> {
        let resp = self
            .authed_request(reqwest::Method::GET, &format!("/v2/quotes/{symbol}"))
            .await?
            .send()
            .await
            .map_err(AppError::from)?;
        if !resp.status().is_success() {
            return Err(classify_status(resp.status()));
        }
        Ok(resp.json::<QuoteResponse>().await.map_err(AppError::from)?.price)
    }

    async fn get_account_balance(&self) -> AppResult<f64> {
        let resp = self
            .authed_request(reqwest::Method::GET, "/v2/account")
            .await?
            .send()
            .await
            .map_err(AppError::from)?;
        if !resp.status().is_success() {
            return Err(classify_status(resp.status()));
        }
        Ok(resp.json::<AccountResponse>().await.map_err(AppError::from)?.cash)
    }

    async fn get_account_holdings(&self) -> AppResult<Vec<(String, i64)>> {
        let resp = self
            .authed_request(reqwest::Method::GET, "/v2/positions")
            .await?
            .send()
            .await
            .map_err(AppError::from)?;
        if !resp.status().is_success() {
            return Err(classify_status(resp.status()));
        }
        let positions: Vec<PositionResponse> = resp.json().await.map_err(AppError::from)?;
        Ok(positions.into_iter().map(|p| (p.symbol, p.quantity)).collect())
    }

    async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: i64,
        price: f64,
    ) -> AppResult<TradeResult> {
        let body = serde_json::json!({
            "symbol": symbol,
            "side": side.as_str().to_lowercase(),
            "qty": quantity,
            "type": "limit",
            "limit_price": price,
            "time_in_force": "day",
        });

        let resp = self
            .authed_request(reqwest::Method::POST, "/v2/orders")
            .await?
            .json(&body)
            .send()
            .await
            .map_err(AppError::from)?;

        if !resp.status().is_success() {
            return Err(classify_status(resp.status()));
        }

        let order: OrderResponse = resp.json().await.map_err(AppError::from)?;
        let status = status_from_broker_str(&order.status);
        Ok(TradeResult {
            broker_order_id: order.id,
            status,
            executed_price: order.filled_avg_price.unwrap_or(price),
            executed_quantity: order.filled_qty.unwrap_or(0),
            message: if status == TradeStatus::Failed { Some(order.status) } else { None },
        })
    }

    async fn cancel_order(&self, broker_order_id: &str) -> AppResult<()> {
        let resp = self
            .authed_request(reqwest::Method::DELETE, &format!("/v2/orders/{broker_order_id}"))
            .await?
            .send()
            .await
            .map_err(AppError::from)?;
        if !resp.status().is_success() {
            return Err(classify_status(resp.status()));
        }
        Ok(())
    }

    async fn get_order_status(&self, broker_order_id: &str) -> AppResult<TradeStatus> {
        let resp = self
            .authed_request(reqwest::Method::GET, &format!("/v2/orders/{broker_order_id}"))
            .await?
            .send()
            .await
            .map_err(AppError::from)?;
        if !resp.status().is_success() {
            return Err(classify_status(resp.status()));
        }
        let order: OrderResponse = resp.json().await.map_err(AppError::from)?;
        Ok(status_from_broker_str(&order.status))
    }
}
