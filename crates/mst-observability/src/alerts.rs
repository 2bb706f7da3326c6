use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AlertType {
    SystemError,
    PerformanceDegradation,
    TradeExecution,
    TradeFailure,
    StopLossTriggered,
    DailyLossLimit,
    ApiError,
    LlmError,
    DatabaseError,
    SecurityEvent,
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub alert_type: AlertType,
    pub level: AlertLevel,
    pub message: String,
    pub user_id: Option<String>,
}

/// Swappable notification sinks. The wire protocol for either channel is
/// out of scope; these traits exist so a concrete SMTP/SMS implementation
/// can be plugged in without touching the dispatcher.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send_email(&self, alert: &Alert) -> anyhow::Result<()>;
}

#[async_trait]
pub trait SmsTransport: Send + Sync {
    async fn send_sms(&self, alert: &Alert) -> anyhow::Result<()>;
}

/// Transport that does nothing — the default when no email/SMS is
/// configured, so alert dispatch never has to special-case "unconfigured".
pub struct NullTransport;

#[async_trait]
impl EmailTransport for NullTransport {
    async fn send_email(&self, _alert: &Alert) -> anyhow::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl SmsTransport for NullTransport {
    async fn send_sms(&self, _alert: &Alert) -> anyhow::Result<()> {
        Ok(())
    }
}

pub const DEFAULT_COOLDOWN: Duration = Duration::minutes(15);

/// Dispatches alerts to logs and, for ERROR/CRITICAL, to the configured
/// transports. Cooldown is keyed by `(alert_type, level)` so a storm of
/// identical alerts doesn't flood email/SMS; `force=true` (stop-loss and
/// daily-loss-limit alerts) always bypasses it.
pub struct AlertDispatcher {
    cooldown: Duration,
    last_fired: Mutex<HashMap<(AlertType, AlertLevel), DateTime<Utc>>>,
    email: Box<dyn EmailTransport>,
    sms: Box<dyn SmsTransport>,
}

impl AlertDispatcher {
    pub fn new(email: Box<dyn EmailTransport>, sms: Box<dyn SmsTransport>) -> Self {
        Self { cooldown: DEFAULT_COOLDOWN, last_fired: Mutex::new(HashMap::new()), email, sms }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Fires `alert` unless an identical `(type, level)` fired within the
    /// cooldown window and `force` is false. Returns whether it actually
    /// fired (vs. was suppressed).
    pub async fn fire(&self, alert: Alert, force: bool) -> bool {
        let key = (alert.alert_type, alert.level);
        let now = Utc::now();

        if !force {
            let mut last_fired = self.last_fired.lock().unwrap();
            if let Some(last) = last_fired.get(&key) {
                if now - *last < self.cooldown {
                    return false;
                }
            }
            last_fired.insert(key, now);
        } else {
            self.last_fired.lock().unwrap().insert(key, now);
        }

        self.log(&alert);

        if matches!(alert.level, AlertLevel::Error | AlertLevel::Critical) {
            if let Err(err) = self.email.send_email(&alert).await {
                warn!(error = %err, "alert email transport failed");
            }
        }
        if matches!(alert.level, AlertLevel::Critical) {
            if let Err(err) = self.sms.send_sms(&alert).await {
                warn!(error = %err, "alert sms transport failed");
            }
        }

        true
    }

    fn log(&self, alert: &Alert) {
        match alert.level {
            AlertLevel::Info => info!(alert_type = ?alert.alert_type, user_id = ?alert.user_id, "{}", alert.message),
            AlertLevel::Warning => {
                warn!(alert_type = ?alert.alert_type, user_id = ?alert.user_id, "{}", alert.message)
            }
            AlertLevel::Error | AlertLevel::Critical => {
                error!(alert_type = ?alert.alert_type, user_id = ?alert.user_id, "{}", alert.message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingTransport(Arc<AtomicUsize>);

    #[async_trait]
    impl EmailTransport for CountingTransport {
        async fn send_email(&self, _alert: &Alert) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait]
    impl SmsTransport for CountingTransport {
        async fn send_sms(&self, _alert: &Alert) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn alert(level: AlertLevel) -> Alert {
        Alert { alert_type: AlertType::ApiError, level, message: "boom".to_string(), user_id: None }
    }

    #[tokio::test]
    async fn second_identical_alert_within_cooldown_is_suppressed() {
        let dispatcher = AlertDispatcher::new(Box::new(NullTransport), Box::new(NullTransport));
        assert!(dispatcher.fire(alert(AlertLevel::Warning), false).await);
        assert!(!dispatcher.fire(alert(AlertLevel::Warning), false).await);
    }

    #[tokio::test]
    async fn force_bypasses_cooldown() {
        let dispatcher = AlertDispatcher::new(Box::new(NullTransport), Box::new(NullTransport));
        assert!(dispatcher.fire(alert(AlertLevel::Warning), false).await);
        assert!(dispatcher.fire(alert(AlertLevel::Warning), true).await);
    }

    #[tokio::test]
    async fn critical_alert_dispatches_to_email_and_sms() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher =
            AlertDispatcher::new(Box::new(CountingTransport(calls.clone())), Box::new(CountingTransport(calls.clone())));
        dispatcher.fire(alert(AlertLevel::Critical), false).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn warning_alert_does_not_dispatch_to_transports() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher =
            AlertDispatcher::new(Box::new(CountingTransport(calls.clone())), Box::new(CountingTransport(calls.clone())));
        dispatcher.fire(alert(AlertLevel::Warning), false).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
