use chrono::{DateTime, Utc};
use mst_schemas::{AppResult, NewsArticle, NewsArticleDraft};
use sqlx::{PgPool, Row};
use uuid::Uuid;

fn row_to_article(row: &sqlx::postgres::PgRow) -> sqlx::Result<NewsArticle> {
    Ok(NewsArticle {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        description: row.try_get("description")?,
        author: row.try_get("author")?,
        published_date: row.try_get("published_date")?,
        source: row.try_get("source")?,
        url: row.try_get("url")?,
        asset_type: row.try_get("asset_type")?,
        created_at: row.try_get("created_at")?,
    })
}

pub enum InsertOutcome {
    Inserted(NewsArticle),
    Duplicate(NewsArticle),
}

async fn find_existing(
    pool: &PgPool,
    draft: &NewsArticleDraft,
) -> sqlx::Result<Option<NewsArticle>> {
    if let Some(url) = &draft.url {
        let row = sqlx::query("select * from news_articles where url = $1")
            .bind(url)
            .fetch_optional(pool)
            .await?;
        if let Some(row) = row {
            return Ok(Some(row_to_article(&row)?));
        }
        return Ok(None);
    }

    let row = sqlx::query("select * from news_articles where title = $1 and published_date = $2")
        .bind(&draft.title)
        .bind(draft.published_date)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_article).transpose()
}

/// Dedupes by `url` when present, else by an exact `(title, published_date)`
/// match, matching the original ingestion pipeline's dedupe rule.
pub async fn insert_article(pool: &PgPool, draft: NewsArticleDraft) -> AppResult<InsertOutcome> {
    let normalized = draft.normalized();

    if let Some(existing) = find_existing(pool, &normalized).await? {
        return Ok(InsertOutcome::Duplicate(existing));
    }

    let id = Uuid::new_v4();
    let created_at = Utc::now();

    sqlx::query(
        r#"
        insert into news_articles (
          id, title, content, description, author, published_date, source, url, asset_type, created_at
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8, $9, $10
        )
        "#,
    )
    .bind(id)
    .bind(&normalized.title)
    .bind(&normalized.content)
    .bind(&normalized.description)
    .bind(&normalized.author)
    .bind(normalized.published_date)
    .bind(&normalized.source)
    .bind(&normalized.url)
    .bind(&normalized.asset_type)
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(InsertOutcome::Inserted(NewsArticle {
        id,
        title: normalized.title,
        content: normalized.content,
        description: normalized.description,
        author: normalized.author,
        published_date: normalized.published_date,
        source: normalized.source,
        url: normalized.url,
        asset_type: normalized.asset_type,
        created_at,
    }))
}

pub async fn articles_since(
    pool: &PgPool,
    since: DateTime<Utc>,
    asset_type: Option<&str>,
) -> AppResult<Vec<NewsArticle>> {
    let rows = match asset_type {
        Some(at) => {
            sqlx::query(
                "select * from news_articles where published_date >= $1 and asset_type = $2 order by published_date asc",
            )
            .bind(since)
            .bind(at)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query("select * from news_articles where published_date >= $1 order by published_date asc")
                .bind(since)
                .fetch_all(pool)
                .await?
        }
    };

    rows.iter().map(row_to_article).collect::<sqlx::Result<Vec<_>>>().map_err(Into::into)
}

/// Deletes articles older than `cutoff`. Used by the nightly retention job.
pub async fn delete_older_than(pool: &PgPool, cutoff: DateTime<Utc>) -> AppResult<u64> {
    let result = sqlx::query("delete from news_articles where published_date < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
