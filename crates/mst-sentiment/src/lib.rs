//! Sentiment analyzer (C5): LLM-backed classification of news articles,
//! with a cache in front of the LLM call keyed on article content.

pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use mst_cache::TwoTierCache;
use mst_llm::{LlmOptimizer, RequestPriority};
use mst_schemas::{AppError, AppResult, NewsArticle, SentimentAnalysis, SentimentLabel};
use sqlx::PgPool;

const ANALYSIS_TTL: Duration = Duration::from_secs(6 * 3600);

/// Low temperature and a small completion budget: this is a constrained
/// classification task, not free-form generation, and a long or creative
/// completion is a sign the model drifted off the requested JSON shape.
const CLASSIFY_TEMPERATURE: f32 = 0.3;
const CLASSIFY_MAX_TOKENS: u32 = 500;
const CLASSIFY_SYSTEM_PROMPT: &str =
    "You are a financial news sentiment analyst. Respond with ONLY the requested JSON object, no other text.";

pub struct SentimentAnalyzer {
    pool: PgPool,
    cache: Arc<TwoTierCache>,
    optimizer: Arc<LlmOptimizer>,
}

impl SentimentAnalyzer {
    pub fn new(pool: PgPool, cache: Arc<TwoTierCache>, optimizer: Arc<LlmOptimizer>) -> Self {
        Self { pool, cache, optimizer }
    }

    /// Returns a persisted analysis for `article`, computing and caching
    /// a fresh one if neither the cache nor the database already has it.
    pub async fn analyze(&self, article: &NewsArticle, priority: RequestPriority) -> AppResult<SentimentAnalysis> {
        if let Some(existing) = mst_db::sentiment::for_article(&self.pool, article.id).await? {
            return Ok(existing);
        }

        let key = prompt::cache_key(&article.title, &article.content);

        let (label, score, reasoning) = match self.cache.get(&key).await.ok().flatten() {
            Some(cached) => parse_cached(&cached)?,
            None => {
                let (label, score, reasoning) = self.classify(article, priority).await?;
                let cached_value = serde_json::json!({
                    "label": label.as_str(),
                    "score": score,
                    "reasoning": reasoning,
                });
                let _ = self.cache.set(&key, cached_value, ANALYSIS_TTL).await;
                (label, score, reasoning)
            }
        };

        mst_db::sentiment::upsert_analysis(&self.pool, article.id, label, score, &reasoning).await
    }

    async fn classify(
        &self,
        article: &NewsArticle,
        priority: RequestPriority,
    ) -> AppResult<(SentimentLabel, f64, String)> {
        let prompt = prompt::build_prompt(&article.title, &article.content);
        let rx = self
            .optimizer
            .submit(
                prompt,
                Some(CLASSIFY_SYSTEM_PROMPT.to_string()),
                CLASSIFY_TEMPERATURE,
                CLASSIFY_MAX_TOKENS,
                priority,
            )
            .await;
        let raw = rx
            .await
            .map_err(|_| AppError::dependency_transient("llm optimizer worker dropped the request"))??;

        let parsed = mst_llm::extract_json(&raw)?;
        parse_llm_json(&parsed)
    }
}

fn parse_llm_json(value: &serde_json::Value) -> AppResult<(SentimentLabel, f64, String)> {
    let label_str = value["label"]
        .as_str()
        .ok_or_else(|| AppError::validation("llm response missing 'label'"))?;
    let label = SentimentLabel::parse_loose(label_str)
        .ok_or_else(|| AppError::validation(format!("unrecognized sentiment label: {label_str}")))?;
    let score = value["score"].as_f64().unwrap_or(0.5).clamp(0.0, 1.0);
    let reasoning = value["reasoning"].as_str().unwrap_or("").to_string();
    Ok((label, score, reasoning))
}

fn parse_cached(value: &serde_json::Value) -> AppResult<(SentimentLabel, f64, String)> {
    parse_llm_json(value)
}
