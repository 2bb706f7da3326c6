use sha2::{Digest, Sha256};

/// A deterministic cache key for one article's sentiment analysis. Keyed
/// on content rather than article id so two re-fetched copies of the same
/// story share a cached result.
pub fn cache_key(title: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"\0");
    hasher.update(content.as_bytes());
    format!("sentiment:{}", hex::encode(hasher.finalize()))
}

pub fn build_prompt(title: &str, content: &str) -> String {
    format!(
        r#"You are a financial news sentiment analyst. Classify the sentiment of the
following article as it would affect an equity investor's short-term outlook.

Respond with ONLY a JSON object of the form:
{{"label": "positive" | "neutral" | "negative", "score": <float 0.0-1.0 confidence>, "reasoning": "<one sentence>"}}

Title: {title}

Content: {content}
"#
    )
}
