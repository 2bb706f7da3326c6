//! Auto-trading engine (C8): wires C6's signal ratio, C7's validation and
//! sizing, C9's brokerage, and C1's persistence into one per-user loop.

pub mod engine;
pub mod registry;

pub use engine::{EngineStatus, TradingEngine};
