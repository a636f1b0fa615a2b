//! Job contract and execution wrapper
//!
//! Every batch process implements [`Job`]. The [`execute`] wrapper owns the
//! cross-cutting concerns: timing, timeout enforcement, error capture, and
//! the job_executions audit row. It never returns an error -- a failed job
//! becomes a failed [`JobReport`] and the caller moves on.

pub mod calculate_badges;
pub mod db_cleanup;
pub mod expire_content;
pub mod media_cleanup;
pub mod reset_bankrolls;
pub mod scheduler;
pub mod settle_games;
pub mod stats_rollup;
pub mod update_odds;

pub use scheduler::{Schedule, Scheduler};

use async_trait::async_trait;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::adapters::{JobExecutionRecord, PostgresStore};
use crate::config::AppConfig;
use crate::error::Result;

/// Default per-job timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
/// Default per-run row cap when the caller passes no `--limit`
pub const DEFAULT_BATCH_LIMIT: i64 = 500;

/// Shared dependencies handed to every job run
#[derive(Clone)]
pub struct JobContext {
    pub store: PostgresStore,
    pub config: AppConfig,
    /// Read and aggregate everything, write nothing
    pub dry_run: bool,
    /// Optional row cap for incremental rollout
    pub limit: Option<i64>,
    /// Recorded in the audit trail (`scheduler`, `cli`, ...)
    pub executed_by: String,
}

impl JobContext {
    /// The row cap to use, falling back to a per-job default
    pub fn effective_limit(&self, default: i64) -> i64 {
        self.limit.unwrap_or(default)
    }
}

/// What a job's `run` reports back
#[derive(Debug, Clone)]
pub struct JobOutcome {
    /// Rows actually mutated (or, under dry-run, that would have been)
    pub affected: u64,
    /// Rows that were eligible; the message must not hide the gap
    pub candidates: u64,
    pub message: String,
    /// Structured details persisted with the audit row
    pub details: serde_json::Value,
    /// Per-item failures that were skipped, not thrown
    pub item_errors: Vec<String>,
}

impl JobOutcome {
    pub fn new(affected: u64, candidates: u64, message: impl Into<String>) -> Self {
        Self {
            affected,
            candidates,
            message: message.into(),
            details: serde_json::Value::Null,
            item_errors: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_item_errors(mut self, errors: Vec<String>) -> Self {
        self.item_errors = errors;
        self
    }
}

/// A scheduled, idempotent batch process
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Cron-like `minute hour weekday` gate evaluated by the scheduler
    fn schedule(&self) -> Schedule;

    /// A job running longer than this is treated as failed
    fn timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutcome>;
}

/// Final word on one job invocation
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_name: String,
    pub success: bool,
    pub message: String,
    pub affected: u64,
    pub duration_ms: u64,
    pub dry_run: bool,
}

/// Run one job with timing, timeout, error capture, and audit persistence.
///
/// Never returns an error: store failures, panics excepted, become a failed
/// report so one bad job can't block its siblings.
pub async fn execute(job: &dyn Job, ctx: &JobContext) -> JobReport {
    let name = job.name();
    let timeout = job.timeout();
    let started = Instant::now();

    info!(job = name, dry_run = ctx.dry_run, "Job starting");

    let (success, message, affected, details) =
        match tokio::time::timeout(timeout, job.run(ctx)).await {
            Ok(Ok(outcome)) => {
                let mut details = outcome.details;
                if !outcome.item_errors.is_empty() {
                    warn!(
                        job = name,
                        skipped = outcome.item_errors.len(),
                        "Job skipped items with errors"
                    );
                    if let serde_json::Value::Null = details {
                        details = json!({});
                    }
                    if let Some(map) = details.as_object_mut() {
                        map.insert("item_errors".to_string(), json!(outcome.item_errors));
                    }
                }
                (true, outcome.message, outcome.affected, details)
            }
            Ok(Err(e)) => {
                error!(job = name, error = %e, "Job failed");
                (false, e.to_string(), 0, json!({ "error": e.to_string() }))
            }
            Err(_) => {
                let e = crate::error::SidepotError::JobTimeout {
                    job: name.to_string(),
                    timeout_secs: timeout.as_secs(),
                };
                error!(job = name, timeout_secs = timeout.as_secs(), "Job timed out");
                (false, e.to_string(), 0, serde_json::Value::Null)
            }
        };

    let duration_ms = started.elapsed().as_millis() as u64;

    if success {
        info!(
            job = name,
            affected,
            duration_ms,
            dry_run = ctx.dry_run,
            "Job finished: {message}"
        );
    }

    // The audit trail gets a row even on failure -- but never under dry-run
    if !ctx.dry_run {
        let record = JobExecutionRecord {
            job_name: name.to_string(),
            success,
            message: message.clone(),
            affected: affected as i64,
            duration_ms: duration_ms as i64,
            details,
            executed_by: ctx.executed_by.clone(),
        };
        if let Err(e) = ctx.store.record_job_execution(&record).await {
            error!(job = name, error = %e, "Failed to write job execution audit row");
        }
    }

    JobReport {
        job_name: name.to_string(),
        success,
        message,
        affected,
        duration_ms,
        dry_run: ctx.dry_run,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        BadgeConfig, BankrollConfig, DatabaseConfig, LifecycleConfig, LoggingConfig, OddsConfig,
    };
    use sqlx::postgres::PgPoolOptions;

    struct PlanOnlyJob;

    #[async_trait]
    impl Job for PlanOnlyJob {
        fn name(&self) -> &'static str {
            "plan-only"
        }
        fn description(&self) -> &'static str {
            "reports a plan without touching the store"
        }
        fn schedule(&self) -> Schedule {
            Schedule::HOURLY
        }
        async fn run(&self, _ctx: &JobContext) -> Result<JobOutcome> {
            Ok(JobOutcome::new(3, 3, "would expire 3/3 items"))
        }
    }

    struct SleepyJob;

    #[async_trait]
    impl Job for SleepyJob {
        fn name(&self) -> &'static str {
            "sleepy"
        }
        fn description(&self) -> &'static str {
            "sleeps past its own timeout"
        }
        fn schedule(&self) -> Schedule {
            Schedule::HOURLY
        }
        fn timeout(&self) -> Duration {
            Duration::from_millis(50)
        }
        async fn run(&self, _ctx: &JobContext) -> Result<JobOutcome> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(JobOutcome::new(0, 0, "never reached"))
        }
    }

    // Lazy pool against a closed port: it never connects, so any store
    // round-trip fails loudly instead of touching a real database.
    fn test_ctx(dry_run: bool) -> JobContext {
        let url = "postgres://localhost:1/unreachable";
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(100))
            .connect_lazy(url)
            .unwrap();
        JobContext {
            store: PostgresStore::from_pool(pool),
            config: AppConfig {
                database: DatabaseConfig {
                    url: url.to_string(),
                    max_connections: 1,
                },
                lifecycle: LifecycleConfig::default(),
                badges: BadgeConfig::default(),
                odds: OddsConfig::default(),
                bankroll: BankrollConfig::default(),
                logging: LoggingConfig::default(),
            },
            dry_run,
            limit: None,
            executed_by: "test".to_string(),
        }
    }

    #[test]
    fn test_dry_run_report_carries_plan_counts() {
        tokio_test::block_on(async {
            let report = execute(&PlanOnlyJob, &test_ctx(true)).await;
            assert!(report.success);
            assert!(report.dry_run);
            assert_eq!(report.affected, 3);
            assert_eq!(report.message, "would expire 3/3 items");
        });
    }

    #[test]
    fn test_timeout_becomes_failed_report() {
        tokio_test::block_on(async {
            let report = execute(&SleepyJob, &test_ctx(true)).await;
            assert!(!report.success);
            assert_eq!(report.affected, 0);
            assert!(report.message.contains("timed out"), "{}", report.message);
        });
    }

    #[test]
    fn test_audit_write_failure_does_not_fail_the_report() {
        // Not a dry run, so execute attempts the audit insert; the
        // unreachable pool rejects it and the report must survive.
        tokio_test::block_on(async {
            let report = execute(&PlanOnlyJob, &test_ctx(false)).await;
            assert!(report.success);
            assert!(!report.dry_run);
            assert_eq!(report.affected, 3);
        });
    }
}
