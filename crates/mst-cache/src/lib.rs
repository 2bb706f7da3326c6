//! Two-tier analysis cache (C2): an optional in-process fast tier backed by
//! `moka`, write-through to a durable Postgres tier (`analysis_cache`).
//!
//! Expiry is absolute and checked on every read in both tiers — a fast-tier
//! hit past its `expires_at` is treated as a miss and invalidated, rather
//! than relying solely on moka's own eviction sweep to catch it first.

use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use moka::sync::Cache as MokaCache;
use serde_json::Value;
use sqlx::PgPool;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Non-object values are wrapped as `{"value": ...}` before storage so the
/// durable tier's `result_json` column always holds a JSON object, and
/// unwrapped again on read. This is a property of the cache layer, not
/// something callers need to account for.
fn wrap_for_storage(value: Value) -> Value {
    match value {
        Value::Object(_) => value,
        other => serde_json::json!({ "value": other }),
    }
}

fn unwrap_from_storage(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("value") => {
            map.remove("value").expect("checked above")
        }
        other => other,
    }
}

pub struct CacheConfig {
    pub fast_tier_enabled: bool,
    pub fast_tier_max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fast_tier_enabled: true,
            fast_tier_max_entries: 10_000,
        }
    }
}

pub struct TwoTierCache {
    pool: PgPool,
    fast: Option<MokaCache<String, CacheEntry>>,
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub fast_tier_enabled: bool,
    pub fast_tier_entries: u64,
    pub durable_entries: i64,
    pub durable_expired_entries: i64,
}

impl TwoTierCache {
    pub fn new(pool: PgPool, config: CacheConfig) -> Self {
        let fast = config
            .fast_tier_enabled
            .then(|| MokaCache::builder().max_capacity(config.fast_tier_max_entries).build());
        Self { pool, fast }
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        let now = Utc::now();

        if let Some(fast) = &self.fast {
            if let Some(entry) = fast.get(key) {
                if !entry.is_expired(now) {
                    return Ok(Some(unwrap_from_storage(entry.value)));
                }
                fast.invalidate(key);
            }
        }

        let row = sqlx::query_as::<_, (Value, DateTime<Utc>)>(
            "select result_json, expires_at from analysis_cache where cache_key = $1 and expires_at > $2",
        )
        .bind(key)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .context("cache durable-tier read failed")?;

        let Some((value, expires_at)) = row else {
            return Ok(None);
        };

        if let Some(fast) = &self.fast {
            fast.insert(
                key.to_string(),
                CacheEntry {
                    value: value.clone(),
                    expires_at,
                },
            );
        }

        Ok(Some(unwrap_from_storage(value)))
    }

    pub async fn set(&self, key: &str, value: Value, ttl: StdDuration) -> Result<()> {
        let now = Utc::now();
        let expires_at = now
            + chrono::Duration::from_std(ttl).context("ttl does not fit in chrono::Duration")?;
        let value = wrap_for_storage(value);

        sqlx::query(
            r#"
            insert into analysis_cache (cache_key, result_json, expires_at, created_at)
            values ($1, $2, $3, $4)
            on conflict (cache_key)
            do update set result_json = excluded.result_json, expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(&value)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("cache durable-tier write failed")?;

        if let Some(fast) = &self.fast {
            fast.insert(key.to_string(), CacheEntry { value, expires_at });
        }

        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("delete from analysis_cache where cache_key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .context("cache durable-tier delete failed")?;

        if let Some(fast) = &self.fast {
            fast.invalidate(key);
        }

        Ok(())
    }

    /// Deletes rows whose absolute expiry has passed. Returns the count
    /// removed. Intended to be called periodically by the scheduler.
    pub async fn clear_expired(&self) -> Result<u64> {
        let result = sqlx::query("delete from analysis_cache where expires_at <= $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("cache expired-sweep failed")?;
        Ok(result.rows_affected())
    }

    /// Clears everything, or everything matching a glob `pattern` (`*` maps
    /// to SQL `%`). Clears the fast tier unconditionally when no pattern is
    /// given; with a pattern, only the fast-tier entries present are
    /// invalidated individually since moka has no native pattern match.
    pub async fn clear_all(&self, pattern: Option<&str>) -> Result<u64> {
        let affected = match pattern {
            None => {
                let result = sqlx::query("delete from analysis_cache")
                    .execute(&self.pool)
                    .await
                    .context("cache clear-all failed")?;
                if let Some(fast) = &self.fast {
                    fast.invalidate_all();
                }
                result.rows_affected()
            }
            Some(glob) => {
                let sql_pattern = glob.replace('*', "%");
                let rows: Vec<(String,)> =
                    sqlx::query_as("select cache_key from analysis_cache where cache_key like $1")
                        .bind(&sql_pattern)
                        .fetch_all(&self.pool)
                        .await
                        .context("cache clear-pattern select failed")?;

                let result = sqlx::query("delete from analysis_cache where cache_key like $1")
                    .bind(&sql_pattern)
                    .execute(&self.pool)
                    .await
                    .context("cache clear-pattern delete failed")?;

                if let Some(fast) = &self.fast {
                    for (key,) in &rows {
                        fast.invalidate(key);
                    }
                }
                result.rows_affected()
            }
        };
        Ok(affected)
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let (durable_entries,): (i64,) =
            sqlx::query_as("select count(*)::bigint from analysis_cache")
                .fetch_one(&self.pool)
                .await
                .context("cache stats count failed")?;

        let (durable_expired_entries,): (i64,) = sqlx::query_as(
            "select count(*)::bigint from analysis_cache where expires_at <= $1",
        )
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("cache stats expired-count failed")?;

        Ok(CacheStats {
            fast_tier_enabled: self.fast.is_some(),
            fast_tier_entries: self.fast.as_ref().map(|c| c.entry_count()).unwrap_or(0),
            durable_entries,
            durable_expired_entries,
        })
    }
}

/// Spawns a periodic sweep of expired durable-tier rows. The returned
/// handle can be aborted for graceful shutdown.
pub fn spawn_sweep_task(
    cache: std::sync::Arc<TwoTierCache>,
    interval: StdDuration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match cache.clear_expired().await {
                Ok(n) if n > 0 => tracing::info!(removed = n, "cache sweep removed expired rows"),
                Ok(_) => {}
                Err(err) => tracing::warn!(error = %err, "cache sweep failed"),
            }
        }
    })
}
