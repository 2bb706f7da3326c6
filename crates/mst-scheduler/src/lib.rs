//! Minute-resolution job scheduler: one task per registered job, each on
//! its own interval or daily clock-time schedule, with at-most-one
//! concurrent instance per job id and cooperative graceful shutdown.

pub mod job;
pub mod scheduler;

pub use job::{JobFuture, JobHandler, JobSchedule, JobSpec};
pub use scheduler::Scheduler;
