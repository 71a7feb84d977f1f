use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, warn};

use crate::config::{AiConfig, MarketConfig, SchedulerConfig};
use crate::db::{query_stats, MarketStore};
use crate::errors::AppError;
use crate::jobs::{ai_task_job, price_tick_job, snapshot_job};
use crate::services::ai_service::AiClient;
use crate::services::broadcast_service::Broadcaster;
use crate::services::event_detection_service::EventDetector;

/// Invocations slower than this are logged as warnings.
const SLOW_JOB_THRESHOLD: Duration = Duration::from_millis(100);
/// Invocations issuing more queries than this are logged as warnings.
const QUERY_COUNT_THRESHOLD: u64 = 10;

// Context passed to job functions
#[derive(Clone)]
pub struct JobContext {
    pub store: Arc<dyn MarketStore>,
    pub broadcaster: Broadcaster,
    pub event_detector: Arc<dyn EventDetector>,
    pub ai: Arc<AiClient>,
    pub market: MarketConfig,
    pub ai_config: Arc<AiConfig>,
}

#[derive(Debug)]
pub struct JobResult {
    pub items_processed: i32,
    pub items_failed: i32,
}

/// Exclusive execution token of one scheduled job.
#[derive(Clone, Default)]
pub struct JobGuard(Arc<Mutex<()>>);

impl JobGuard {
    /// Takes the token if no invocation currently holds it.
    pub fn try_acquire(&self) -> Option<OwnedMutexGuard<()>> {
        self.0.clone().try_lock_owned().ok()
    }

    /// Waits until the running invocation, if any, has finished.
    pub async fn wait_idle(&self) {
        let _token = self.0.lock().await;
    }
}

pub struct JobSchedulerService {
    scheduler: JobScheduler,
    context: JobContext,
    config: SchedulerConfig,
    guards: Vec<(&'static str, JobGuard)>,
}

impl JobSchedulerService {
    pub async fn new(context: JobContext, config: SchedulerConfig) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::External(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            context,
            config,
            guards: Vec::new(),
        })
    }

    /// Start all scheduled jobs
    pub async fn start(&mut self) -> Result<(), AppError> {
        info!("🚀 Starting job scheduler...");

        if self.config.price_tick_enabled {
            self.schedule_job(
                self.config.price_tick_interval,
                "price_tick",
                price_tick_job::run_price_tick,
            )
            .await?;
        } else {
            info!("Price tick job disabled");
        }

        self.schedule_job(
            self.config.snapshot_interval,
            "price_snapshot",
            snapshot_job::run_price_snapshot,
        )
        .await?;

        if self.context.ai.is_configured() {
            self.schedule_job(
                self.config.ai_task_poll_interval,
                "ai_task_processor",
                ai_task_job::run_ai_tasks,
            )
            .await?;
            info!(
                "AI text provider: {}",
                self.context.ai.text_provider().unwrap_or("none")
            );
        } else {
            warn!("No AI provider configured, AI task processing disabled");
        }

        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::External(format!("Failed to start scheduler: {}", e)))?;

        info!("✅ Job scheduler started with {} jobs", self.guards.len());
        Ok(())
    }

    /// Stops triggering jobs and waits for running invocations to finish.
    pub async fn stop(&mut self) -> Result<(), AppError> {
        info!("🛑 Stopping job scheduler...");
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::External(format!("Failed to stop scheduler: {}", e)))?;

        for (job_name, guard) in &self.guards {
            debug!("Waiting for {} to finish", job_name);
            guard.wait_idle().await;
        }

        info!("✅ Job scheduler stopped");
        Ok(())
    }

    /// Helper to schedule a fixed-interval job with non-overlap and tracking
    async fn schedule_job<F, Fut>(
        &mut self,
        interval: Duration,
        job_name: &'static str,
        job_fn: F,
    ) -> Result<(), AppError>
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JobResult, AppError>> + Send + 'static,
    {
        let context = self.context.clone();
        let job_fn = Arc::new(job_fn);
        let guard = JobGuard::default();
        let job_guard = guard.clone();

        let job = Job::new_repeated_async(interval, move |_uuid, _l| {
            let context = context.clone();
            let job_fn = job_fn.clone();
            let guard = job_guard.clone();
            Box::pin(async move {
                execute_job(&guard, job_name, context, job_fn).await;
            })
        })
        .map_err(|e| AppError::External(format!("Failed to create job {}: {}", job_name, e)))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::External(format!("Failed to add job {}: {}", job_name, e)))?;

        self.guards.push((job_name, guard));
        info!("📅 Scheduled: {} - every {}s", job_name, interval.as_secs());
        Ok(())
    }
}

/// Runs one trigger of a job unless the previous one is still running.
/// Returns whether the job ran.
async fn execute_job<F, Fut>(
    guard: &JobGuard,
    job_name: &'static str,
    context: JobContext,
    job_fn: Arc<F>,
) -> bool
where
    F: Fn(JobContext) -> Fut,
    Fut: Future<Output = Result<JobResult, AppError>>,
{
    let Some(_token) = guard.try_acquire() else {
        warn!("⏭️  Skipping {}: previous run still in progress", job_name);
        return false;
    };

    match run_instrumented(job_name, job_fn(context)).await {
        Ok(result) => debug!(
            "Job completed: {} (processed: {}, failed: {})",
            job_name, result.items_processed, result.items_failed
        ),
        Err(e) => error!("❌ Job failed: {} - {}", job_name, e),
    }
    true
}

/// Measures one invocation: wall-clock time, time spent in queries and the
/// number of queries. The job's result is returned unchanged.
pub async fn run_instrumented<Fut, T>(job_name: &str, job: Fut) -> Result<T, AppError>
where
    Fut: Future<Output = Result<T, AppError>>,
{
    let started = Instant::now();
    let (result, report) = query_stats::scoped(job).await;
    let duration = started.elapsed();

    let status = if result.is_ok() { "ok" } else { "error" };
    if duration > SLOW_JOB_THRESHOLD || report.queries > QUERY_COUNT_THRESHOLD {
        warn!(
            "Slow job {} ({}): {:.1}ms total, {:.1}ms db, {} queries",
            job_name,
            status,
            duration.as_secs_f64() * 1000.0,
            report.db_time.as_secs_f64() * 1000.0,
            report.queries
        );
    } else {
        debug!(
            "Job {} ({}): {:.1}ms total, {:.1}ms db, {} queries",
            job_name,
            status,
            duration.as_secs_f64() * 1000.0,
            report.db_time.as_secs_f64() * 1000.0,
            report.queries
        );
    }

    result
}

#[cfg(test)]
impl JobContext {
    pub fn for_tests(store: Arc<crate::db::memory_store::MemoryStore>) -> Self {
        use crate::services::event_detection_service::MarketEventDetector;

        Self {
            store,
            broadcaster: Broadcaster::new(),
            event_detector: Arc::new(MarketEventDetector::default()),
            ai: Arc::new(AiClient::new(vec![], false)),
            market: MarketConfig::default(),
            ai_config: Arc::new(AiConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn context() -> JobContext {
        JobContext::for_tests(Arc::new(MemoryStore::default()))
    }

    #[tokio::test]
    async fn test_guard_is_exclusive() {
        let guard = JobGuard::default();
        let token = guard.try_acquire();
        assert!(token.is_some());
        assert!(guard.try_acquire().is_none());

        drop(token);
        assert!(guard.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_overlapping_trigger_is_skipped() {
        let guard = JobGuard::default();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let job_fn = Arc::new(move |_ctx: JobContext| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(JobResult { items_processed: 0, items_failed: 0 })
            }
        });

        let held = guard.try_acquire();
        assert!(!execute_job(&guard, "test_job", context(), job_fn.clone()).await);
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        drop(held);
        assert!(execute_job(&guard, "test_job", context(), job_fn).await);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wait_idle_waits_for_running_job() {
        let guard = JobGuard::default();
        let token = guard.try_acquire().unwrap();

        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(token);
        });

        let started = Instant::now();
        guard.wait_idle().await;
        assert!(started.elapsed() >= Duration::from_millis(15));
        release.await.unwrap();
    }

    #[tokio::test]
    async fn test_runner_propagates_errors() {
        let result: Result<(), AppError> = run_instrumented("failing_job", async {
            query_stats::record(Duration::from_millis(1));
            Err(AppError::Validation("boom".to_string()))
        })
        .await;

        assert!(matches!(result, Err(AppError::Validation(msg)) if msg == "boom"));
    }

    #[tokio::test]
    async fn test_runner_returns_job_output() {
        let result = run_instrumented("busy_job", async {
            for _ in 0..20 {
                query_stats::record(Duration::ZERO);
            }
            Ok(JobResult { items_processed: 3, items_failed: 1 })
        })
        .await
        .unwrap();

        assert_eq!(result.items_processed, 3);
        assert_eq!(result.items_failed, 1);
    }
}
