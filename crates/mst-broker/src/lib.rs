//! Brokerage adapter (C9): a single trait abstracting order execution,
//! with a deterministic paper implementation and a live HTTP one.

pub mod live;
pub mod paper;
pub mod types;

pub use live::LiveBroker;
pub use paper::PaperBroker;
pub use types::{BrokerageApi, TradeResult};
