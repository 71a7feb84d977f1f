//! Background Jobs Module
//!
//! Periodic jobs driven by the job scheduler service. Each job takes a
//! [`JobContext`](crate::services::job_scheduler_service::JobContext) and
//! returns a `JobResult`; the scheduler never runs two instances of the same
//! job at once.
//!
//! # Available Jobs
//!
//! - `price_tick_job` - Random price movement for every active stock
//! - `snapshot_job` - Snapshots, rankings, market hours, events and retention
//! - `ai_task_job` - Submits, polls and stores AI generation tasks

pub mod ai_task_job;
pub mod price_tick_job;
pub mod snapshot_job;
