//! Daemon boot sequence: load config and secrets, build the shared state,
//! wire the scheduled jobs onto C12, start the HTTP surface, and wait for a
//! shutdown signal. Lives in the library so both the `mst-daemon` binary
//! and the `mst` CLI's `daemon run` subcommand can boot the same process.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use mst_broker::BrokerageApi;
use mst_cache::{CacheConfig, TwoTierCache};
use mst_news::NewsApiClient;
use mst_observability::MetricsCollector;
use mst_scheduler::{JobSchedule, JobSpec, Scheduler};
use mst_trading::TradingEngine;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

use crate::jobs::{self, NewsQuery};
use crate::routes;
use crate::state::AppState;

const ENV_CONFIG_PATHS: &str = "MST_CONFIG_PATHS";
const ENV_MODE: &str = "MST_MODE";
const ENV_ADDR: &str = "MST_DAEMON_ADDR";
const DEFAULT_CONFIG_PATH: &str = "config/default.yaml";

/// Boots and runs the daemon until a shutdown signal is observed, then
/// drains the scheduler and returns.
pub async fn run() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    let config_paths = config_paths_from_env();
    let loaded = mst_config::load_layered_yaml(&config_paths)
        .with_context(|| format!("loading config from {config_paths:?}"))?;
    let config_json = loaded.config_json.clone();

    let json_logs = mst_config::cfg_bool(&config_json, "/observability/json_logs", false);
    mst_observability::init_tracing(json_logs);

    info!(config_hash = %loaded.config_hash, "loaded configuration");

    let mode = std::env::var(ENV_MODE).unwrap_or_else(|_| "PAPER".to_string());
    let secrets = mst_config::secrets::resolve_secrets(&config_json, &mode)
        .context("resolving secrets for configured mode")?;

    let pool = mst_db::connect_from_env().await.context("connecting to database")?;
    mst_db::migrate(&pool).await.context("running migrations")?;

    let metrics = Arc::new(MetricsCollector::new(mst_config::cfg_i64(
        &config_json,
        "/observability/metrics_window",
        1000,
    ) as usize));

    let broker: Arc<dyn BrokerageApi> = build_broker(&config_json, &mode, &secrets)?;
    let news_client = secrets
        .news_api_key
        .clone()
        .map(|key| Arc::new(NewsApiClient::new(key)));
    let cache = Arc::new(TwoTierCache::new(pool.clone(), CacheConfig::default()));
    let engine = Arc::new(TradingEngine::new(pool.clone(), broker.clone()));

    let mut scheduler = Scheduler::new();
    register_jobs(&mut scheduler, &config_json, pool.clone(), broker, news_client, cache, engine);
    let scheduler = Arc::new(scheduler);
    scheduler.start().await;

    let state = Arc::new(AppState::new(pool, loaded.config_hash, metrics, scheduler.clone()));

    let app = routes::build_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8900)));
    info!("mst-daemon listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    let grace = Duration::from_secs(mst_config::cfg_i64(&config_json, "/scheduler/stop_grace_secs", 10) as u64);
    scheduler.stop(grace).await;

    Ok(())
}

fn config_paths_from_env() -> Vec<String> {
    match std::env::var(ENV_CONFIG_PATHS) {
        Ok(v) if !v.trim().is_empty() => v.split(',').map(|s| s.trim().to_string()).collect(),
        _ => vec![DEFAULT_CONFIG_PATH.to_string()],
    }
}

fn build_broker(
    config_json: &serde_json::Value,
    mode: &str,
    secrets: &mst_config::secrets::ResolvedSecrets,
) -> anyhow::Result<Arc<dyn BrokerageApi>> {
    if mode.eq_ignore_ascii_case("LIVE") {
        let base_url = mst_config::cfg_str(config_json, "/broker/base_url", "https://paper-api.example.com");
        let api_key = secrets.broker_api_key.clone().context("LIVE mode requires a broker api key")?;
        let api_secret = secrets.broker_api_secret.clone().context("LIVE mode requires a broker api secret")?;
        Ok(Arc::new(mst_broker::LiveBroker::new(base_url, api_key, api_secret)))
    } else {
        let initial_cash = mst_config::cfg_f64(config_json, "/broker/paper_initial_cash", 100_000.0);
        Ok(Arc::new(mst_broker::PaperBroker::new(initial_cash)))
    }
}

fn register_jobs(
    scheduler: &mut Scheduler,
    config_json: &serde_json::Value,
    pool: sqlx::PgPool,
    broker: Arc<dyn BrokerageApi>,
    news_client: Option<Arc<NewsApiClient>>,
    cache: Arc<TwoTierCache>,
    engine: Arc<TradingEngine>,
) {
    if let Some(client) = news_client {
        let queries: Vec<NewsQuery> = mst_config::cfg_str_list(config_json, "/news/queries")
            .into_iter()
            .map(|q| NewsQuery { query: q, asset_type: "stock".to_string() })
            .collect();
        let queries = if queries.is_empty() {
            vec![NewsQuery { query: "stock market".to_string(), asset_type: "stock".to_string() }]
        } else {
            queries
        };
        let page_size = mst_config::cfg_i64(config_json, "/news/page_size", 20) as u32;
        let news_at = daily_at(config_json, "/news/daily_at", 6, 0);
        let pool = pool.clone();
        scheduler.register(JobSpec::new("news-collection", JobSchedule::DailyAt(news_at), move || {
            let pool = pool.clone();
            let client = client.clone();
            let queries = queries.clone();
            async move { jobs::news_collection_job(pool, client, queries, page_size).await }
        }));
    } else {
        tracing::warn!("news api key not configured; news collection job disabled");
    }

    let cache_pool_cache = cache.clone();
    scheduler.register(JobSpec::new("cache-sweep", JobSchedule::Interval(Duration::from_secs(3600)), move || {
        let cache = cache_pool_cache.clone();
        async move { jobs::cache_sweep_job(cache).await }
    }));

    let watch_list = mst_config::cfg_str_list(config_json, "/market_data/watch_list");
    let poll_interval = Duration::from_secs(mst_config::cfg_i64(config_json, "/market_data/poll_interval_secs", 300) as u64);
    let price_pool = pool.clone();
    let price_broker = broker.clone();
    scheduler.register(JobSpec::new("price-poll", JobSchedule::Interval(poll_interval), move || {
        let pool = price_pool.clone();
        let broker = price_broker.clone();
        let watch_list = watch_list.clone();
        async move { jobs::price_poll_job(pool, broker, watch_list).await }
    }));

    let monitor_interval = Duration::from_secs(mst_config::cfg_i64(config_json, "/trading/monitor_interval_secs", 60) as u64);
    let monitor_pool = pool.clone();
    let monitor_engine = engine.clone();
    scheduler.register(JobSpec::new("position-monitor", JobSchedule::Interval(monitor_interval), move || {
        let pool = monitor_pool.clone();
        let engine = monitor_engine.clone();
        async move { jobs::position_monitor_job(pool, engine).await }
    }));

    let strategy_name = mst_config::cfg_str(config_json, "/learning/strategy_name", "default").to_string();
    let learning_at = daily_at(config_json, "/learning/daily_at", 2, 0);
    let learning_pool = pool.clone();
    scheduler.register(JobSpec::new("learning-session", JobSchedule::DailyAt(learning_at), move || {
        let pool = learning_pool.clone();
        let strategy_name = strategy_name.clone();
        async move { jobs::learning_job(pool, strategy_name).await }
    }));
}

fn daily_at(config_json: &serde_json::Value, pointer: &str, default_hour: u32, default_minute: u32) -> chrono::NaiveTime {
    let raw = mst_config::cfg_str_opt(config_json, pointer);
    raw.and_then(|s| chrono::NaiveTime::parse_from_str(s, "%H:%M").ok())
        .unwrap_or_else(|| chrono::NaiveTime::from_hms_opt(default_hour, default_minute, 0).unwrap())
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var(ENV_ADDR).ok()?.parse().ok()
}

async fn shutdown_signal() {
    let ctrl_c = async { tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler") };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}

/// CORS: allow only localhost origins, matching the donor's dev-facing daemon.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()).collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
