//! Risk manager (C7): pure, side-effect-free evaluators over a config and a
//! point-in-time account snapshot. No IO lives here — the data-access and
//! trading-engine crates build the snapshots and call into this crate.

pub mod engine;
pub mod types;

pub use engine::{
    check_stop_loss, detect_abnormal_market, emergency_stop, is_within_trading_hours,
    position_size, validate_trade, ABNORMAL_VIX_THRESHOLD, ELEVATED_VIX_THRESHOLD,
};
pub use types::{
    EmergencyStop, HeldPosition, HoldingsSnapshot, MarketCondition, RejectReason, StopLossOutcome,
    TradeRequest, ValidationOutcome,
};
