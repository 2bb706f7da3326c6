use mst_schemas::{AppResult, AutoTradeConfig, RiskLevel};
use sqlx::{PgPool, Row};

fn row_to_config(row: &sqlx::postgres::PgRow) -> sqlx::Result<AutoTradeConfig> {
    let risk_str: String = row.try_get("risk_level")?;
    let allowed: Option<serde_json::Value> = row.try_get("allowed_symbols")?;
    let excluded: serde_json::Value = row.try_get("excluded_symbols")?;

    Ok(AutoTradeConfig {
        user_id: row.try_get("user_id")?,
        is_enabled: row.try_get("is_enabled")?,
        max_investment_amount: row.try_get("max_investment_amount")?,
        max_position_size: row.try_get("max_position_size")?,
        risk_level: RiskLevel::from_db_str(&risk_str).unwrap_or(RiskLevel::Medium),
        buy_threshold: row.try_get("buy_threshold")?,
        sell_threshold: row.try_get("sell_threshold")?,
        stop_loss_percentage: row.try_get("stop_loss_percentage")?,
        daily_loss_limit: row.try_get("daily_loss_limit")?,
        trading_start_time: row.try_get("trading_start_time")?,
        trading_end_time: row.try_get("trading_end_time")?,
        allowed_symbols: allowed.map(|v| serde_json::from_value(v).unwrap_or_default()),
        excluded_symbols: serde_json::from_value(excluded).unwrap_or_default(),
        notification_target: row.try_get("notification_target")?,
    })
}

pub async fn for_user(pool: &PgPool, user_id: &str) -> AppResult<Option<AutoTradeConfig>> {
    let row = sqlx::query("select * from auto_trade_configs where user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_config).transpose().map_err(Into::into)
}

pub async fn upsert_config(pool: &PgPool, config: &AutoTradeConfig) -> AppResult<()> {
    let allowed_json = config
        .allowed_symbols
        .as_ref()
        .map(|v| serde_json::to_value(v).unwrap_or(serde_json::Value::Null));
    let excluded_json = serde_json::to_value(&config.excluded_symbols).unwrap_or_default();

    sqlx::query(
        r#"
        insert into auto_trade_configs (
          user_id, is_enabled, max_investment_amount, max_position_size, risk_level,
          buy_threshold, sell_threshold, stop_loss_percentage, daily_loss_limit,
          trading_start_time, trading_end_time, allowed_symbols, excluded_symbols, notification_target
        ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        on conflict (user_id) do update set
          is_enabled = excluded.is_enabled,
          max_investment_amount = excluded.max_investment_amount,
          max_position_size = excluded.max_position_size,
          risk_level = excluded.risk_level,
          buy_threshold = excluded.buy_threshold,
          sell_threshold = excluded.sell_threshold,
          stop_loss_percentage = excluded.stop_loss_percentage,
          daily_loss_limit = excluded.daily_loss_limit,
          trading_start_time = excluded.trading_start_time,
          trading_end_time = excluded.trading_end_time,
          allowed_symbols = excluded.allowed_symbols,
          excluded_symbols = excluded.excluded_symbols,
          notification_target = excluded.notification_target
        "#,
    )
    .bind(&config.user_id)
    .bind(config.is_enabled)
    .bind(config.max_investment_amount)
    .bind(config.max_position_size)
    .bind(config.risk_level.as_str())
    .bind(config.buy_threshold)
    .bind(config.sell_threshold)
    .bind(config.stop_loss_percentage)
    .bind(config.daily_loss_limit)
    .bind(config.trading_start_time)
    .bind(config.trading_end_time)
    .bind(allowed_json)
    .bind(excluded_json)
    .bind(&config.notification_target)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn enabled_users(pool: &PgPool) -> AppResult<Vec<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("select user_id from auto_trade_configs where is_enabled")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}
