//! Backtest engine (C10): deterministic day-by-day simulation plus the
//! storage-backed runner that feeds it historical prices and sentiment.

pub mod engine;
pub mod runner;
pub mod types;

pub use engine::{compute_metrics, BacktestEngine};
pub use runner::{run_backtest, BacktestRequest};
pub use types::{BacktestSignalMode, DayInput, Metrics, SimConfig, SimDailyStat, SimOutput, SimTrade};
