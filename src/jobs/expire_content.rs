//! Expire time-bound content
//!
//! Two rules: fixed `expires_at` TTLs, and the derived TTL for pick posts,
//! which live relative to their game's start time. Expiry soft-deletes;
//! hard deletion is db-cleanup's job after the retention window.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::engine::expiry;
use crate::error::Result;
use crate::jobs::{Job, JobContext, JobOutcome, Schedule, DEFAULT_BATCH_LIMIT};

pub struct ExpireContentJob;

#[async_trait]
impl Job for ExpireContentJob {
    fn name(&self) -> &'static str {
        "expire-content"
    }

    fn description(&self) -> &'static str {
        "Soft-delete expired posts, pick posts, and messages"
    }

    fn schedule(&self) -> Schedule {
        Schedule::HOURLY
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutcome> {
        let limit = ctx.effective_limit(DEFAULT_BATCH_LIMIT);
        let lifecycle = &ctx.config.lifecycle;

        let expired_posts = ctx.store.expired_post_ids(limit).await?;
        let expired_picks = ctx
            .store
            .expired_pick_post_ids(lifecycle.pick_ttl_hours, limit)
            .await?;
        let message_cutoff = expiry::message_cutoff(Utc::now(), lifecycle.message_ttl_hours);
        let expired_messages = ctx.store.expired_message_ids(message_cutoff, limit).await?;

        // A pick post can trip both rules at once; it is one deletion
        let posts_due = dedup_ids(&expired_posts, &expired_picks);
        let candidates = (posts_due.len() + expired_messages.len()) as u64;

        let affected = if ctx.dry_run {
            candidates
        } else {
            let mut n = ctx.store.soft_delete_posts(&posts_due).await?;
            n += ctx.store.soft_delete_messages(&expired_messages).await?;
            n
        };

        Ok(JobOutcome::new(
            affected,
            candidates,
            format!(
                "expired {affected}/{candidates} items ({} posts, {} messages)",
                posts_due.len(),
                expired_messages.len()
            ),
        )
        .with_details(json!({
            "posts": posts_due.len(),
            "picks": expired_picks.len(),
            "messages": expired_messages.len(),
        })))
    }
}

/// Union of the fixed-TTL and derived-TTL candidate sets
fn dedup_ids(fixed: &[Uuid], derived: &[Uuid]) -> Vec<Uuid> {
    let set: BTreeSet<Uuid> = fixed.iter().chain(derived).copied().collect();
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_candidates_count_once() {
        let shared = Uuid::new_v4();
        let fixed = vec![Uuid::new_v4(), shared];
        let derived = vec![shared, Uuid::new_v4()];

        let merged = dedup_ids(&fixed, &derived);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.iter().filter(|id| **id == shared).count(), 1);
    }

    #[test]
    fn test_disjoint_candidates_all_survive() {
        let fixed = vec![Uuid::new_v4(), Uuid::new_v4()];
        let derived = vec![Uuid::new_v4()];
        assert_eq!(dedup_ids(&fixed, &derived).len(), 3);
    }
}
