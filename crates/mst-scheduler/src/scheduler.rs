use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{NaiveTime, Utc};
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{error, info, warn};

use crate::job::{JobSchedule, JobSpec};

fn duration_until_daily(target: NaiveTime) -> Duration {
    let now = Utc::now();
    let mut next = now.date_naive().and_time(target).and_utc();
    if next <= now {
        next += chrono::Duration::days(1);
    }
    (next - now).to_std().unwrap_or(Duration::from_secs(0))
}

/// One `tokio::spawn`ed task per registered job. Each loop fires on its own
/// schedule and, on fire, spawns the handler guarded by a per-job
/// `try_lock` — a job whose previous run hasn't finished is skipped for
/// that tick rather than queued.
pub struct Scheduler {
    jobs: Vec<JobSpec>,
    started: AtomicBool,
    shutdown: broadcast::Sender<()>,
    loop_handles: AsyncMutex<Vec<JoinHandle<()>>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        let (shutdown, _rx) = broadcast::channel(16);
        Self { jobs: Vec::new(), started: AtomicBool::new(false), shutdown, loop_handles: AsyncMutex::new(Vec::new()) }
    }

    pub fn register(&mut self, job: JobSpec) {
        self.jobs.push(job);
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Spawns the per-job loops. A second call is a no-op — starting an
    /// already-running scheduler must not double-spawn jobs.
    pub async fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            info!("scheduler already started");
            return;
        }

        let mut handles = self.loop_handles.lock().await;
        let mut run_locks: HashMap<String, Arc<AsyncMutex<()>>> = HashMap::new();

        for job in &self.jobs {
            let run_lock = run_locks.entry(job.id.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone();
            let handle = spawn_job_loop(job.clone(), run_lock, self.shutdown.subscribe());
            handles.push(handle);
        }

        info!(job_count = self.jobs.len(), "scheduler started");
    }

    /// Broadcasts shutdown and waits for job loops to exit, up to `grace`.
    /// Handles still running after `grace` are abandoned, not aborted —
    /// Tokio tasks are cooperative and an in-flight handler keeps running
    /// until it observes the shutdown signal or completes on its own.
    pub async fn stop(&self, grace: Duration) {
        let _ = self.shutdown.send(());

        let mut handles = self.loop_handles.lock().await;
        let deadline = tokio::time::Instant::now() + grace;

        for handle in handles.drain(..) {
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!(error = %err, "scheduler job loop panicked"),
                Err(_) => warn!("scheduler job loop did not stop within grace period; abandoning"),
            }
        }

        self.started.store(false, Ordering::SeqCst);
        info!("scheduler stopped");
    }
}

fn spawn_job_loop(job: JobSpec, run_lock: Arc<AsyncMutex<()>>, mut shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
    tokio::spawn(async move {
        match job.schedule.clone() {
            JobSchedule::Interval(period) => {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => fire(&job, &run_lock),
                        _ = shutdown_rx.recv() => break,
                    }
                }
            }
            JobSchedule::DailyAt(time) => loop {
                let wait = duration_until_daily(time);
                tokio::select! {
                    _ = tokio::time::sleep(wait) => fire(&job, &run_lock),
                    _ = shutdown_rx.recv() => break,
                }
            },
        }
        info!(job_id = %job.id, "scheduler job loop exited");
    })
}

fn fire(job: &JobSpec, run_lock: &Arc<AsyncMutex<()>>) {
    let job_id = job.id.clone();
    let handler = job.handler.clone();
    let run_lock = run_lock.clone();

    tokio::spawn(async move {
        let Ok(_guard) = run_lock.try_lock() else {
            warn!(job_id = %job_id, "previous instance still running; skipping this tick");
            return;
        };
        if let Err(err) = handler().await {
            error!(job_id = %job_id, error = %err, "scheduled job failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobSpec;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn interval_job_fires_and_stop_is_idempotent_safe() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();

        let c = counter.clone();
        scheduler.register(JobSpec::new("tick", JobSchedule::Interval(Duration::from_millis(10)), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }));

        scheduler.start().await;
        tokio::time::advance(Duration::from_millis(35)).await;
        tokio::task::yield_now().await;
        scheduler.stop(Duration::from_millis(100)).await;

        assert!(counter.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn second_start_does_not_double_spawn() {
        let mut scheduler = Scheduler::new();
        scheduler.register(JobSpec::new("noop", JobSchedule::Interval(Duration::from_secs(60)), || async { Ok(()) }));
        scheduler.start().await;
        scheduler.start().await;
        let handles = scheduler.loop_handles.lock().await;
        assert_eq!(handles.len(), 1);
    }
}
