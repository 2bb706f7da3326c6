use chrono::Utc;
use mst_schemas::{
    AppError, AppResult, LearnedStrategy, LearnedStrategyParams, MarketRegime, PatternType, RiskLevel,
    TradePattern,
};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub async fn insert_pattern(pool: &PgPool, pattern: &TradePattern) -> AppResult<()> {
    sqlx::query(
        r#"
        insert into trade_patterns (
          id, user_id, symbol, entry_trade_id, exit_trade_id, entry_signal_ratio,
          holding_duration_hours, realized_pnl, realized_pnl_pct, market_regime,
          pattern_type, extracted_at
        ) values ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
        "#,
    )
    .bind(pattern.id)
    .bind(&pattern.user_id)
    .bind(&pattern.symbol)
    .bind(pattern.entry_trade_id)
    .bind(pattern.exit_trade_id)
    .bind(pattern.entry_signal_ratio)
    .bind(pattern.holding_duration_hours)
    .bind(pattern.realized_pnl)
    .bind(pattern.realized_pnl_pct)
    .bind(pattern.market_regime.as_str())
    .bind(pattern.pattern_type.as_str())
    .bind(pattern.extracted_at)
    .execute(pool)
    .await?;
    Ok(())
}

fn row_to_pattern(row: &sqlx::postgres::PgRow) -> AppResult<TradePattern> {
    let regime_str: String = row.try_get("market_regime")?;
    let type_str: String = row.try_get("pattern_type")?;
    Ok(TradePattern {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        symbol: row.try_get("symbol")?,
        entry_trade_id: row.try_get("entry_trade_id")?,
        exit_trade_id: row.try_get("exit_trade_id")?,
        entry_signal_ratio: row.try_get("entry_signal_ratio")?,
        holding_duration_hours: row.try_get("holding_duration_hours")?,
        realized_pnl: row.try_get("realized_pnl")?,
        realized_pnl_pct: row.try_get("realized_pnl_pct")?,
        market_regime: MarketRegime::from_db_str(&regime_str)
            .ok_or_else(|| AppError::integrity(format!("unrecognized market regime: {regime_str}")))?,
        pattern_type: PatternType::from_db_str(&type_str)
            .ok_or_else(|| AppError::integrity(format!("unrecognized pattern type: {type_str}")))?,
        extracted_at: row.try_get("extracted_at")?,
    })
}

pub async fn patterns_for_strategy_scope(pool: &PgPool, min_samples: i64) -> AppResult<Vec<TradePattern>> {
    let rows = sqlx::query("select * from trade_patterns order by extracted_at asc limit $1")
        .bind(min_samples.max(0) * 100) // generous cap; optimizer decides if it has enough
        .fetch_all(pool)
        .await?;
    rows.iter().map(row_to_pattern).collect()
}

fn row_to_strategy(row: &sqlx::postgres::PgRow) -> AppResult<LearnedStrategy> {
    let params_json: serde_json::Value = row.try_get("params")?;
    let risk_str = params_json["risk_level"].as_str().unwrap_or("MEDIUM").to_string();

    Ok(LearnedStrategy {
        id: row.try_get("id")?,
        strategy_name: row.try_get("strategy_name")?,
        version: row.try_get("version")?,
        params: LearnedStrategyParams {
            buy_threshold: params_json["buy_threshold"].as_i64().unwrap_or(70) as i32,
            sell_threshold: params_json["sell_threshold"].as_i64().unwrap_or(30) as i32,
            stop_loss_percentage: params_json["stop_loss_percentage"].as_f64().unwrap_or(5.0),
            risk_level: RiskLevel::from_db_str(&risk_str).unwrap_or(RiskLevel::Medium),
        },
        training_samples: row.try_get("training_samples")?,
        win_rate: row.try_get("win_rate")?,
        profit_factor: row.try_get("profit_factor")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

pub async fn active_strategy(pool: &PgPool, strategy_name: &str) -> AppResult<Option<LearnedStrategy>> {
    let row = sqlx::query("select * from learned_strategies where strategy_name = $1 and is_active")
        .bind(strategy_name)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_strategy).transpose()
}

fn params_to_json(params: &LearnedStrategyParams) -> serde_json::Value {
    serde_json::json!({
        "buy_threshold": params.buy_threshold,
        "sell_threshold": params.sell_threshold,
        "stop_loss_percentage": params.stop_loss_percentage,
        "risk_level": params.risk_level.as_str(),
    })
}

/// Inserts a new strategy version and atomically promotes it to active,
/// demoting whatever was active before, in one transaction. `version` is
/// `prev_active.version + 1`, or 1 if there is no prior active row.
pub async fn publish_new_version(
    pool: &PgPool,
    strategy_name: &str,
    params: &LearnedStrategyParams,
    training_samples: i32,
    win_rate: Option<f64>,
    profit_factor: Option<f64>,
) -> AppResult<LearnedStrategy> {
    let mut tx = pool.begin().await?;

    let prev_version: Option<i32> =
        sqlx::query_scalar("select version from learned_strategies where strategy_name = $1 and is_active")
            .bind(strategy_name)
            .fetch_optional(&mut *tx)
            .await?;

    let next_version = prev_version.unwrap_or(0) + 1;

    sqlx::query("update learned_strategies set is_active = false where strategy_name = $1 and is_active")
        .bind(strategy_name)
        .execute(&mut *tx)
        .await?;

    let id = Uuid::new_v4();
    let created_at = Utc::now();

    sqlx::query(
        r#"
        insert into learned_strategies (
          id, strategy_name, version, params, training_samples, win_rate, profit_factor, is_active, created_at
        ) values ($1,$2,$3,$4,$5,$6,$7,true,$8)
        "#,
    )
    .bind(id)
    .bind(strategy_name)
    .bind(next_version)
    .bind(params_to_json(params))
    .bind(training_samples)
    .bind(win_rate)
    .bind(profit_factor)
    .bind(created_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(LearnedStrategy {
        id,
        strategy_name: strategy_name.to_string(),
        version: next_version,
        params: params.clone(),
        training_samples,
        win_rate,
        profit_factor,
        is_active: true,
        created_at,
    })
}

/// Creates a default, untrained row only if no active row exists yet for
/// this strategy name — never clobbers an already-tuned active strategy.
pub async fn ensure_default_strategy(
    pool: &PgPool,
    strategy_name: &str,
    default_params: &LearnedStrategyParams,
) -> AppResult<LearnedStrategy> {
    if let Some(existing) = active_strategy(pool, strategy_name).await? {
        return Ok(existing);
    }
    publish_new_version(pool, strategy_name, default_params, 0, None, None).await
}

pub async fn create_session(pool: &PgPool, session_type: &str) -> AppResult<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        "insert into learning_sessions (id, session_type, started_at, status) values ($1, $2, $3, 'RUNNING')",
    )
    .bind(id)
    .bind(session_type)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn complete_session(
    pool: &PgPool,
    id: Uuid,
    patterns_extracted: i32,
    patterns_analyzed: i32,
    produced_strategy: Option<(&str, i32)>,
) -> AppResult<()> {
    let (name, version) = produced_strategy.map_or((None, None), |(n, v)| (Some(n), Some(v)));
    sqlx::query(
        r#"
        update learning_sessions set
          status = 'COMPLETED', completed_at = $2, patterns_extracted = $3, patterns_analyzed = $4,
          produced_strategy_name = $5, produced_strategy_version = $6
        where id = $1
        "#,
    )
    .bind(id)
    .bind(Utc::now())
    .bind(patterns_extracted)
    .bind(patterns_analyzed)
    .bind(name)
    .bind(version)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn fail_session(pool: &PgPool, id: Uuid, error_message: &str) -> AppResult<()> {
    sqlx::query("update learning_sessions set status = 'FAILED', completed_at = $2, error_message = $3 where id = $1")
        .bind(id)
        .bind(Utc::now())
        .bind(error_message)
        .execute(pool)
        .await?;
    Ok(())
}
