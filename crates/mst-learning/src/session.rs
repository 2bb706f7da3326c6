use mst_schemas::{AppResult, LearnedStrategy, LearnedStrategyParams, RiskLevel};
use sqlx::PgPool;
use uuid::Uuid;

use crate::optimize::{derive_params, summarize};

pub const DEFAULT_STRATEGY_NAME: &str = "default";
pub const SESSION_TYPE_SCHEDULED: &str = "SCHEDULED";

/// Minimum pattern count before a freshly derived strategy is trusted
/// enough to publish; below this the session falls back to ensuring a
/// default strategy exists instead of tuning one from noise.
pub const MIN_SAMPLES: usize = 10;

fn fallback_params() -> LearnedStrategyParams {
    LearnedStrategyParams {
        buy_threshold: 70,
        sell_threshold: 30,
        stop_loss_percentage: 5.0,
        risk_level: RiskLevel::Medium,
    }
}

/// Runs one full learning cycle: extract patterns from every user's
/// trade history, and either tune a new strategy version from them or
/// make sure a default exists. Always records a session row, completed
/// or failed.
pub async fn run_learning_session(pool: &PgPool, strategy_name: &str) -> AppResult<LearnedStrategy> {
    let session_id = mst_db::learning::create_session(pool, SESSION_TYPE_SCHEDULED).await?;

    match run_inner(pool, strategy_name, session_id).await {
        Ok(strategy) => Ok(strategy),
        Err(err) => {
            mst_db::learning::fail_session(pool, session_id, &err.to_string()).await?;
            Err(err)
        }
    }
}

async fn run_inner(pool: &PgPool, strategy_name: &str, session_id: Uuid) -> AppResult<LearnedStrategy> {
    let patterns_extracted = crate::patterns::extract_all(pool).await?;
    let patterns = mst_db::learning::patterns_for_strategy_scope(pool, MIN_SAMPLES as i64).await?;

    let previous = mst_db::learning::active_strategy(pool, strategy_name).await?;
    let fallback = previous.as_ref().map(|s| s.params.clone()).unwrap_or_else(fallback_params);

    let strategy = if patterns.len() >= MIN_SAMPLES {
        let summary = summarize(&patterns);
        let params = derive_params(&patterns, &fallback);
        mst_db::learning::publish_new_version(
            pool,
            strategy_name,
            &params,
            summary.sample_count,
            Some(summary.win_rate),
            Some(summary.profit_factor),
        )
        .await?
    } else {
        mst_db::learning::ensure_default_strategy(pool, strategy_name, &fallback).await?
    };

    mst_db::learning::complete_session(
        pool,
        session_id,
        patterns_extracted,
        patterns.len() as i32,
        Some((&strategy.strategy_name, strategy.version)),
    )
    .await?;

    Ok(strategy)
}
