//! LLM request optimizer (C3): a priority+FIFO queue drained by a single
//! worker task, batching prompts onto one provider call at a time and
//! extracting structured JSON out of free-form completions.

pub mod client;
pub mod extract;
pub mod priority;
pub mod queue;

pub use client::{CompletionRequest, HttpLlmClient, LlmClient, RetryConfig};
pub use extract::extract_json;
pub use priority::RequestPriority;
pub use queue::{LlmOptimizer, OptimizerConfig};
