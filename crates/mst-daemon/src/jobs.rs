//! Job bodies registered with the scheduler at boot. Each is a thin
//! wrapper over the relevant crate's API — the scheduler only owns timing
//! and the at-most-one-concurrent-instance guarantee.

use std::sync::Arc;

use chrono::Utc;
use mst_broker::BrokerageApi;
use mst_cache::TwoTierCache;
use mst_news::NewsApiClient;
use mst_schemas::StockPrice;
use mst_trading::TradingEngine;
use sqlx::PgPool;

/// One configured news query: a search term and the `asset_type` tag
/// applied to everything it finds.
#[derive(Debug, Clone)]
pub struct NewsQuery {
    pub query: String,
    pub asset_type: String,
}

pub async fn news_collection_job(pool: PgPool, client: Arc<NewsApiClient>, queries: Vec<NewsQuery>, page_size: u32) -> anyhow::Result<()> {
    for q in &queries {
        let stats = mst_news::collect(&pool, &client, &q.query, &q.asset_type, page_size).await?;
        tracing::info!(
            query = %q.query,
            asset_type = %q.asset_type,
            fetched = stats.fetched,
            inserted = stats.inserted,
            duplicates = stats.duplicates,
            "news collection cycle complete"
        );
    }
    Ok(())
}

pub async fn cache_sweep_job(cache: Arc<TwoTierCache>) -> anyhow::Result<()> {
    let removed = cache.clear_expired().await?;
    if removed > 0 {
        tracing::info!(removed, "cache sweep removed expired rows");
    }
    Ok(())
}

/// Polls the broker for a last-trade price on every symbol any user holds
/// plus the configured watch-list, and stores it as a bar. The brokerage
/// quote endpoint returns only a last price, not a full OHLCV bar, so
/// open/high/low are set equal to the last price and volume to zero — a
/// real market-data feed is out of scope for the abstracted brokerage
/// adapter this workspace targets.
pub async fn price_poll_job(pool: PgPool, broker: Arc<dyn BrokerageApi>, watch_list: Vec<String>) -> anyhow::Result<()> {
    let mut symbols = mst_db::holdings::distinct_symbols(&pool).await?;
    for s in watch_list {
        if !symbols.contains(&s) {
            symbols.push(s);
        }
    }

    for symbol in symbols {
        let price = match broker.get_stock_price(&symbol).await {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!(symbol = %symbol, error = %err, "price poll failed for symbol");
                continue;
            }
        };
        let bar = StockPrice { symbol: symbol.clone(), price, open: price, high: price, low: price, volume: 0, timestamp: Utc::now() };
        mst_db::prices::record_price(&pool, &bar).await?;
    }
    Ok(())
}

/// Runs stop-loss monitoring for every enabled user against their
/// currently-held symbols' latest stored prices.
pub async fn position_monitor_job(pool: PgPool, engine: Arc<TradingEngine>) -> anyhow::Result<()> {
    let users = mst_db::auto_trade::enabled_users(&pool).await?;
    let now = Utc::now().time();

    for user_id in users {
        let holdings = mst_db::holdings::for_user(&pool, &user_id).await?;
        let mut prices = std::collections::HashMap::new();
        for h in &holdings {
            if let Some(p) = mst_db::prices::latest_price(&pool, &h.symbol).await? {
                prices.insert(h.symbol.clone(), p.price);
            }
        }
        let sold = engine.monitor_positions(&user_id, now, &prices).await?;
        if !sold.is_empty() {
            tracing::info!(user_id = %user_id, count = sold.len(), "stop-loss monitor closed positions");
        }
    }
    Ok(())
}

pub async fn learning_job(pool: PgPool, strategy_name: String) -> anyhow::Result<()> {
    let strategy = mst_learning::run_learning_session(&pool, &strategy_name).await?;
    tracing::info!(strategy_name = %strategy.strategy_name, version = strategy.version, "learning session complete");
    Ok(())
}
