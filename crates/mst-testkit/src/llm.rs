use std::sync::Mutex;

use async_trait::async_trait;
use mst_llm::{CompletionRequest, LlmClient};
use mst_schemas::{AppError, AppResult};

/// Returns canned responses in order, one per call to `complete_batch` per
/// prompt in the batch — round-robin over the script once exhausted so a
/// test doesn't have to size the script to the exact call count.
pub struct FakeLlmClient {
    script: Vec<String>,
    next: Mutex<usize>,
}

impl FakeLlmClient {
    pub fn new(script: Vec<String>) -> Self {
        assert!(!script.is_empty(), "FakeLlmClient needs at least one scripted response");
        Self { script, next: Mutex::new(0) }
    }

    pub fn constant(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn complete_batch(&self, requests: &[CompletionRequest]) -> AppResult<Vec<String>> {
        let mut next = self.next.lock().unwrap();
        let responses = requests
            .iter()
            .map(|_| {
                let response = self.script[*next % self.script.len()].clone();
                *next += 1;
                response
            })
            .collect();
        Ok(responses)
    }
}

/// Always fails — for exercising the queue's retry/error paths.
pub struct FailingLlmClient;

#[async_trait]
impl LlmClient for FailingLlmClient {
    async fn complete_batch(&self, _requests: &[CompletionRequest]) -> AppResult<Vec<String>> {
        Err(AppError::dependency_transient("fake llm client always fails"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_cycles_round_robin() {
        let client = FakeLlmClient::new(vec!["a".to_string(), "b".to_string()]);
        let batch: Vec<CompletionRequest> = ["p1", "p2", "p3"]
            .iter()
            .map(|p| CompletionRequest {
                prompt: p.to_string(),
                system_prompt: None,
                temperature: 0.7,
                max_tokens: 256,
            })
            .collect();
        let responses = client.complete_batch(&batch).await.unwrap();
        assert_eq!(responses, vec!["a", "b", "a"]);
    }
}
