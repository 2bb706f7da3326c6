//! Shared test fixtures: deterministic clock, fake LLM double, ephemeral
//! Postgres schema isolation, and domain-object builders. Production crates
//! never depend on this one.

pub mod clock;
pub mod fixtures;
pub mod llm;
pub mod schema;

pub use clock::TestClock;
pub use llm::{FailingLlmClient, FakeLlmClient};
pub use schema::EphemeralSchema;
