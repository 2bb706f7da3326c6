use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::NaiveTime;
use tokio::time::Duration;

pub type JobFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;
pub type JobHandler = Arc<dyn Fn() -> JobFuture + Send + Sync>;

#[derive(Debug, Clone)]
pub enum JobSchedule {
    /// Fires every `period`, first fire after one period has elapsed.
    Interval(Duration),
    /// Fires once per day at the given wall-clock time (UTC).
    DailyAt(NaiveTime),
}

/// A registered unit of recurring work. `id` identifies it for the
/// at-most-one-concurrent-instance rule and for log correlation.
#[derive(Clone)]
pub struct JobSpec {
    pub id: String,
    pub schedule: JobSchedule,
    pub handler: JobHandler,
}

impl JobSpec {
    pub fn new<F, Fut>(id: impl Into<String>, schedule: JobSchedule, handler: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self { id: id.into(), schedule, handler: Arc::new(move || Box::pin(handler())) }
    }
}
