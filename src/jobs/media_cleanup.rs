//! Flag orphaned media for deletion
//!
//! A media row is orphaned when its owning post is gone, or soft-deleted
//! past the retention window. This job soft-deletes the rows; db-cleanup
//! removes them for good on its next pass. Object-storage blob removal is
//! external and keys off the same rows.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::engine::expiry;
use crate::error::Result;
use crate::jobs::{Job, JobContext, JobOutcome, Schedule, DEFAULT_BATCH_LIMIT};

pub struct MediaCleanupJob;

#[async_trait]
impl Job for MediaCleanupJob {
    fn name(&self) -> &'static str {
        "media-cleanup"
    }

    fn description(&self) -> &'static str {
        "Soft-delete media rows whose owning post is gone"
    }

    fn schedule(&self) -> Schedule {
        Schedule::daily_at(4)
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutcome> {
        let cutoff = expiry::retention_cutoff(Utc::now(), ctx.config.lifecycle.retention_days);
        let limit = ctx.effective_limit(DEFAULT_BATCH_LIMIT);

        let orphans = ctx.store.orphaned_media_ids(cutoff, limit).await?;
        let candidates = orphans.len() as u64;

        let affected = if ctx.dry_run {
            candidates
        } else {
            ctx.store.soft_delete_media(&orphans).await?
        };

        Ok(JobOutcome::new(
            affected,
            candidates,
            format!("flagged {affected}/{candidates} orphaned media rows"),
        )
        .with_details(json!({ "orphans": candidates })))
    }
}
