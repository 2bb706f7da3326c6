//! Strategy tuning from historical trade outcomes: pairs completed BUY/SELL
//! trades into patterns, derives new buy/stop-loss parameters once enough
//! samples exist, and versions the result.

pub mod optimize;
pub mod patterns;
pub mod session;
pub mod stats;

pub use optimize::{derive_params, summarize, PatternSummary, PROFIT_FACTOR_UNDEFINED};
pub use patterns::{build_patterns, extract_all};
pub use session::{run_learning_session, DEFAULT_STRATEGY_NAME, MIN_SAMPLES};
