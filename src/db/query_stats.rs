//! Per-invocation database accounting.
//!
//! The job runner opens a fresh scope for every invocation; store methods time
//! their queries into whichever scope is active on the current task. Queries
//! issued outside a scope are not counted.

use std::cell::Cell;
use std::future::Future;
use std::time::{Duration, Instant};

tokio::task_local! {
    static QUERY_STATS: QueryStats;
}

#[derive(Debug, Default)]
struct QueryStats {
    queries: Cell<u64>,
    db_time: Cell<Duration>,
}

/// Counters collected while running one unit of work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryReport {
    pub queries: u64,
    pub db_time: Duration,
}

/// Runs `fut` inside a fresh counter scope and returns its output together
/// with the queries it issued.
pub async fn scoped<F: Future>(fut: F) -> (F::Output, QueryReport) {
    QUERY_STATS
        .scope(QueryStats::default(), async move {
            let output = fut.await;
            let report = QUERY_STATS.with(|stats| QueryReport {
                queries: stats.queries.get(),
                db_time: stats.db_time.get(),
            });
            (output, report)
        })
        .await
}

/// Awaits a single query and records its duration.
pub async fn timed<F: Future>(query: F) -> F::Output {
    let started = Instant::now();
    let output = query.await;
    record(started.elapsed());
    output
}

pub fn record(elapsed: Duration) {
    let _ = QUERY_STATS.try_with(|stats| {
        stats.queries.set(stats.queries.get() + 1);
        stats.db_time.set(stats.db_time.get() + elapsed);
    });
}
