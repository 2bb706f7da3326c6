use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

use mst_schemas::AppResult;
use tokio::sync::{oneshot, Mutex, Notify};
use uuid::Uuid;

use crate::client::{CompletionRequest, LlmClient};
use crate::priority::{QueuedRequest, RequestPriority, SequenceCounter};

struct PendingRequest {
    queued: QueuedRequest,
    respond_to: oneshot::Sender<AppResult<String>>,
}

#[derive(Debug, Clone, Copy)]
pub struct OptimizerConfig {
    pub batch_size: usize,
    pub batch_timeout: Duration,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            batch_size: 8,
            batch_timeout: Duration::from_millis(200),
        }
    }
}

/// Priority+FIFO request queue drained by a single dedicated worker task,
/// which bounds how much concurrent load reaches the LLM provider and lets
/// small batches of prompts ride in one request.
pub struct LlmOptimizer {
    heap: Mutex<BinaryHeap<Reverse<QueuedRequest>>>,
    pending: Mutex<std::collections::HashMap<Uuid, oneshot::Sender<AppResult<String>>>>,
    notify: Notify,
    sequence: SequenceCounter,
    config: OptimizerConfig,
}

impl LlmOptimizer {
    pub fn new(config: OptimizerConfig) -> Arc<Self> {
        Arc::new(Self {
            heap: Mutex::new(BinaryHeap::new()),
            pending: Mutex::new(std::collections::HashMap::new()),
            notify: Notify::new(),
            sequence: SequenceCounter::default(),
            config,
        })
    }

    /// Enqueues a prompt and returns a receiver that resolves once the
    /// worker has processed it. `system_prompt`/`temperature`/`max_tokens`
    /// carry through to the provider call unchanged — callers doing
    /// conservative classification work (low temperature, small
    /// completions) get that behavior honored rather than defaulted away.
    pub async fn submit(
        &self,
        prompt: String,
        system_prompt: Option<String>,
        temperature: f32,
        max_tokens: u32,
        priority: RequestPriority,
    ) -> oneshot::Receiver<AppResult<String>> {
        let (tx, rx) = oneshot::channel();
        let queued = QueuedRequest {
            id: Uuid::new_v4(),
            priority,
            sequence: self.sequence.next(),
            prompt,
            system_prompt,
            temperature,
            max_tokens,
        };

        self.pending.lock().await.insert(queued.id, tx);
        self.heap.lock().await.push(Reverse(queued));
        self.notify.notify_one();

        rx
    }

    async fn drain_batch(&self) -> Vec<QueuedRequest> {
        let mut heap = self.heap.lock().await;
        let mut batch = Vec::new();
        while batch.len() < self.config.batch_size {
            match heap.pop() {
                Some(Reverse(item)) => batch.push(item),
                None => break,
            }
        }
        batch
    }

    /// Runs until the process is shut down. Call from a single spawned
    /// task — running more than one concurrently defeats the point of
    /// bounding concurrency into the LLM provider.
    pub async fn run(self: Arc<Self>, client: Arc<dyn LlmClient>) {
        loop {
            self.notify.notified().await;

            // Give a short window for more requests to pile up into the
            // same batch before processing what's accumulated so far.
            tokio::time::sleep(self.config.batch_timeout).await;

            loop {
                let batch = self.drain_batch().await;
                if batch.is_empty() {
                    break;
                }

                let requests: Vec<CompletionRequest> = batch
                    .iter()
                    .map(|r| CompletionRequest {
                        prompt: r.prompt.clone(),
                        system_prompt: r.system_prompt.clone(),
                        temperature: r.temperature,
                        max_tokens: r.max_tokens,
                    })
                    .collect();
                let result = client.complete_batch(&requests).await;

                let mut pending = self.pending.lock().await;
                match result {
                    Ok(responses) => {
                        for (req, response) in batch.into_iter().zip(responses.into_iter()) {
                            if let Some(tx) = pending.remove(&req.id) {
                                let _ = tx.send(Ok(response));
                            }
                        }
                    }
                    Err(err) => {
                        for req in batch {
                            if let Some(tx) = pending.remove(&req.id) {
                                let _ = tx.send(Err(err.clone()));
                            }
                        }
                    }
                }
            }
        }
    }
}
