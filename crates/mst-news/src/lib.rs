//! News ingestion (C4): fetch, filter, convert, dedupe-on-insert, retain.

pub mod client;
pub mod convert;
pub mod filter;

use chrono::{Duration, Utc};
use mst_db::news::InsertOutcome;
use mst_schemas::AppResult;
use sqlx::PgPool;

pub use client::NewsApiClient;
pub use convert::{to_draft, RawArticle};
pub use filter::is_financial_news;

#[derive(Debug, Default, Clone, Copy)]
pub struct IngestStats {
    pub fetched: usize,
    pub dropped_missing_body: usize,
    pub dropped_not_financial: usize,
    pub inserted: usize,
    pub duplicates: usize,
}

/// Fetches, filters, converts and stores one page of articles for `query`,
/// tagged with `asset_type`. Returns counts at each stage for observability.
pub async fn collect(
    pool: &PgPool,
    client: &NewsApiClient,
    query: &str,
    asset_type: &str,
    page_size: u32,
) -> AppResult<IngestStats> {
    let raw_articles = client.fetch(query, page_size).await?;
    let mut stats = IngestStats {
        fetched: raw_articles.len(),
        ..Default::default()
    };

    for raw in raw_articles {
        let Some(draft) = to_draft(raw, asset_type) else {
            stats.dropped_missing_body += 1;
            continue;
        };

        if !is_financial_news(&draft.title, &draft.content) {
            stats.dropped_not_financial += 1;
            continue;
        }

        match mst_db::news::insert_article(pool, draft).await? {
            InsertOutcome::Inserted(_) => stats.inserted += 1,
            InsertOutcome::Duplicate(_) => stats.duplicates += 1,
        }
    }

    Ok(stats)
}

/// Deletes news articles older than `retention_days`. Intended for the
/// nightly archival/cleanup job.
pub async fn cleanup_old_news(pool: &PgPool, retention_days: i64) -> AppResult<u64> {
    let cutoff = Utc::now() - Duration::days(retention_days);
    mst_db::news::delete_older_than(pool, cutoff).await
}
