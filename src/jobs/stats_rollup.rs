//! Lifetime statistics rollup
//!
//! Recomputes every active user's aggregates from their full settled-bet
//! ledger and writes them over the bankroll row. Full recomputation by
//! design; see the stats engine docs.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::domain::BetDetails;
use crate::engine::stats::{self, LedgerBet};
use crate::error::Result;
use crate::jobs::{Job, JobContext, JobOutcome, Schedule};

pub struct StatsRollupJob;

#[async_trait]
impl Job for StatsRollupJob {
    fn name(&self) -> &'static str {
        "stats-rollup"
    }

    fn description(&self) -> &'static str {
        "Recompute lifetime bankroll statistics from the bet ledger"
    }

    fn schedule(&self) -> Schedule {
        Schedule::HOURLY
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutcome> {
        let mut users = ctx.store.user_ids_with_settled_bets().await?;
        let candidates = users.len() as u64;
        if let Some(limit) = ctx.limit {
            users.truncate(limit.max(0) as usize);
        }

        let mut item_errors: Vec<String> = Vec::new();
        let mut rolled_up: u64 = 0;

        for user_id in users {
            let bets = ctx.store.settled_ledger(user_id).await?;

            let mut ledger = Vec::with_capacity(bets.len());
            for bet in &bets {
                let Some(settled_at) = bet.settled_at else {
                    item_errors.push(format!("bet {} is settled but has no settled_at", bet.id));
                    continue;
                };
                // Team attribution is best-effort; a malformed details blob
                // already failed settlement loudly, not here
                let team = match bet.parsed_details() {
                    Ok(BetDetails::Spread { team, .. }) => Some(team),
                    Ok(BetDetails::Moneyline { team }) => Some(team),
                    _ => None,
                };
                ledger.push(LedgerBet {
                    settled_at,
                    status: bet.status,
                    stake: bet.stake,
                    actual_win: bet.actual_win.unwrap_or(0),
                    team,
                });
            }

            let rollup = stats::rollup(&ledger);
            if !ctx.dry_run {
                ctx.store.write_rollup(user_id, &rollup).await?;
            }
            rolled_up += 1;
            debug!(user_id = %user_id, bets = ledger.len(), "Stats recomputed");
        }

        Ok(JobOutcome::new(
            rolled_up,
            candidates,
            format!("recomputed stats for {rolled_up}/{candidates} users"),
        )
        .with_details(json!({ "users": rolled_up }))
        .with_item_errors(item_errors))
    }
}
