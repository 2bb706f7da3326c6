//! Rolling-window metrics, structured logging setup, and cooldown-gated
//! alert dispatch — the platform's ambient observability stack.

pub mod alerts;
pub mod logging;
pub mod metrics;

pub use alerts::{Alert, AlertDispatcher, AlertLevel, AlertType, EmailTransport, NullTransport, SmsTransport};
pub use logging::init_tracing;
pub use metrics::{MetricsCollector, MetricsSnapshot};
