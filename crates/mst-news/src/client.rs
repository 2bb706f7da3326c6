use mst_schemas::{AppError, AppResult};

use crate::convert::RawArticle;

#[derive(serde::Deserialize)]
struct NewsApiResponse {
    articles: Vec<RawArticle>,
}

pub struct NewsApiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl NewsApiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://newsapi.org/v2/everything".to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn fetch(&self, query: &str, page_size: u32) -> AppResult<Vec<RawArticle>> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("pageSize", &page_size.to_string()),
                ("language", "en"),
                ("sortBy", "publishedAt"),
            ])
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(AppError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                AppError::dependency_transient(format!("news api returned {status}"))
            } else {
                AppError::dependency_permanent(format!("news api returned {status}"))
            });
        }

        let body: NewsApiResponse = response.json().await.map_err(AppError::from)?;
        Ok(body.articles)
    }
}
