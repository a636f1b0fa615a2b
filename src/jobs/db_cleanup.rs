//! Hard-delete rows past the retention window
//!
//! Only rows already soft-deleted by the lifecycle jobs are eligible, and
//! only from the closed [`CleanupTable`] set.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::adapters::CleanupTable;
use crate::engine::expiry;
use crate::error::Result;
use crate::jobs::{Job, JobContext, JobOutcome, Schedule, DEFAULT_BATCH_LIMIT};

pub struct DbCleanupJob;

#[async_trait]
impl Job for DbCleanupJob {
    fn name(&self) -> &'static str {
        "db-cleanup"
    }

    fn description(&self) -> &'static str {
        "Hard-delete soft-deleted rows older than the retention window"
    }

    fn schedule(&self) -> Schedule {
        Schedule::daily_at(3)
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutcome> {
        let cutoff = expiry::retention_cutoff(Utc::now(), ctx.config.lifecycle.retention_days);
        let limit = ctx.effective_limit(DEFAULT_BATCH_LIMIT);

        let mut per_table = serde_json::Map::new();
        let mut affected: u64 = 0;
        let mut candidates: u64 = 0;

        for table in CleanupTable::ALL {
            let eligible = ctx.store.count_hard_deletable(table, cutoff).await?;
            candidates += eligible.max(0) as u64;

            let deleted = if ctx.dry_run {
                eligible.max(0).min(limit) as u64
            } else {
                ctx.store.hard_delete_expired(table, cutoff, limit).await?
            };
            affected += deleted;
            per_table.insert(table.as_str().to_string(), json!(deleted));
        }

        Ok(JobOutcome::new(
            affected,
            candidates,
            format!("hard-deleted {affected}/{candidates} rows past retention"),
        )
        .with_details(serde_json::Value::Object(per_table)))
    }
}
