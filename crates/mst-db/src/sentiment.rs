use chrono::Utc;
use mst_schemas::{AppError, AppResult, SentimentAnalysis, SentimentLabel};
use sqlx::{PgPool, Row};
use uuid::Uuid;

fn row_to_analysis(row: &sqlx::postgres::PgRow) -> AppResult<SentimentAnalysis> {
    let label_str: String = row.try_get("label")?;
    let label = SentimentLabel::from_db_str(&label_str)
        .ok_or_else(|| AppError::integrity(format!("unrecognized sentiment label: {label_str}")))?;

    Ok(SentimentAnalysis {
        id: row.try_get("id")?,
        article_id: row.try_get("article_id")?,
        label,
        score: row.try_get("score")?,
        reasoning: row.try_get("reasoning")?,
        analyzed_at: row.try_get("analyzed_at")?,
    })
}

pub async fn upsert_analysis(
    pool: &PgPool,
    article_id: Uuid,
    label: SentimentLabel,
    score: f64,
    reasoning: &str,
) -> AppResult<SentimentAnalysis> {
    let id = Uuid::new_v4();
    let analyzed_at = Utc::now();

    sqlx::query(
        r#"
        insert into sentiment_analyses (id, article_id, label, score, reasoning, analyzed_at)
        values ($1, $2, $3, $4, $5, $6)
        on conflict (article_id)
        do update set label = excluded.label, score = excluded.score,
                      reasoning = excluded.reasoning, analyzed_at = excluded.analyzed_at
        "#,
    )
    .bind(id)
    .bind(article_id)
    .bind(label.as_str())
    .bind(score)
    .bind(reasoning)
    .bind(analyzed_at)
    .execute(pool)
    .await?;

    Ok(SentimentAnalysis {
        id,
        article_id,
        label,
        score,
        reasoning: reasoning.to_string(),
        analyzed_at,
    })
}

pub async fn for_article(pool: &PgPool, article_id: Uuid) -> AppResult<Option<SentimentAnalysis>> {
    let row = sqlx::query("select * from sentiment_analyses where article_id = $1")
        .bind(article_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_analysis).transpose()
}

/// Quantified scores paired with the article's publish timestamp, the
/// shape the signal generator's `daily_scores` consumes directly.
pub async fn quantified_scores_since(
    pool: &PgPool,
    since: chrono::DateTime<Utc>,
) -> AppResult<Vec<(chrono::DateTime<Utc>, f64)>> {
    let rows = sqlx::query(
        r#"
        select a.published_date as published_date, s.label as label
        from sentiment_analyses s
        join news_articles a on a.id = s.article_id
        where a.published_date >= $1
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let published: chrono::DateTime<Utc> = row.try_get("published_date")?;
            let label_str: String = row.try_get("label")?;
            let label = SentimentLabel::from_db_str(&label_str).ok_or_else(|| {
                AppError::integrity(format!("unrecognized sentiment label: {label_str}"))
            })?;
            Ok((published, label.quantify()))
        })
        .collect()
}

/// Same as [`quantified_scores_since`] but scoped to one symbol's
/// `asset_type` tag — the signal generator's per-symbol input, and the
/// backtest engine's sentiment history source.
pub async fn quantified_scores_for_asset_since(
    pool: &PgPool,
    asset_type: &str,
    since: chrono::DateTime<Utc>,
) -> AppResult<Vec<(chrono::DateTime<Utc>, f64)>> {
    let rows = sqlx::query(
        r#"
        select a.published_date as published_date, s.label as label
        from sentiment_analyses s
        join news_articles a on a.id = s.article_id
        where a.published_date >= $1 and a.asset_type = $2
        "#,
    )
    .bind(since)
    .bind(asset_type)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let published: chrono::DateTime<Utc> = row.try_get("published_date")?;
            let label_str: String = row.try_get("label")?;
            let label = SentimentLabel::from_db_str(&label_str).ok_or_else(|| {
                AppError::integrity(format!("unrecognized sentiment label: {label_str}"))
            })?;
            Ok((published, label.quantify()))
        })
        .collect()
}
