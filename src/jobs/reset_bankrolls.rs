//! Weekly bankroll reset
//!
//! Destructive: every balance goes back to the configured starting amount
//! and the aggregate columns are zeroed. The CLI requires --force or an
//! interactive confirmation before invoking this outside the scheduler.

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use crate::error::Result;
use crate::jobs::{Job, JobContext, JobOutcome, Schedule};

pub struct ResetBankrollsJob;

#[async_trait]
impl Job for ResetBankrollsJob {
    fn name(&self) -> &'static str {
        "reset-bankrolls"
    }

    fn description(&self) -> &'static str {
        "Reset every bankroll to the starting balance (weekly)"
    }

    fn schedule(&self) -> Schedule {
        Schedule::WEEKLY_MONDAY_MIDNIGHT
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutcome> {
        let starting_balance = ctx.config.bankroll.starting_balance;
        let candidates = ctx.store.count_bankrolls().await?.max(0) as u64;

        let affected = if ctx.dry_run {
            candidates
        } else {
            warn!(
                bankrolls = candidates,
                starting_balance, "Resetting all bankrolls"
            );
            ctx.store.reset_all_bankrolls(starting_balance).await?
        };

        Ok(JobOutcome::new(
            affected,
            candidates,
            format!("reset {affected}/{candidates} bankrolls to {starting_balance}"),
        )
        .with_details(json!({ "starting_balance": starting_balance })))
    }
}
