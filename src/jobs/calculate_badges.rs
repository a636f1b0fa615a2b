//! Weekly badge recalculation
//!
//! Qualification is re-derived from scratch every run over a trailing
//! window of settled bets, and each user's award rows are replaced
//! wholesale. The full replace is deliberate: if a settlement was
//! corrected retroactively, the next run converges without any diffing.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use uuid::Uuid;

use crate::domain::BadgeId;
use crate::engine::badges::{self, UserWindow, WindowBet};
use crate::error::Result;
use crate::jobs::{Job, JobContext, JobOutcome, Schedule};

pub struct CalculateBadgesJob;

#[async_trait]
impl Job for CalculateBadgesJob {
    fn name(&self) -> &'static str {
        "calculate-badges"
    }

    fn description(&self) -> &'static str {
        "Recompute weekly achievement badges from settled-bet history"
    }

    fn schedule(&self) -> Schedule {
        Schedule::HOURLY
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutcome> {
        let window_start = Utc::now() - Duration::days(ctx.config.badges.window_days);

        let bets = ctx.store.settled_bets_since(window_start).await?;
        let post_counts = ctx.store.post_counts_since(window_start).await?;
        let accounts = ctx.store.account_created_at().await?;

        let mut item_errors: Vec<String> = Vec::new();
        let windows = build_windows(&bets, &post_counts, &accounts, &mut item_errors);

        let awards = badges::evaluate_all(&windows, window_start);

        let mut users_touched: u64 = 0;
        let mut badges_awarded: u64 = 0;
        let mut newly_earned: u64 = 0;

        for (user_id, earned) in &awards {
            badges_awarded += earned.len() as u64;

            if ctx.dry_run {
                users_touched += 1;
                continue;
            }

            let previous: BTreeSet<BadgeId> = ctx
                .store
                .badges_for_user(*user_id)
                .await?
                .into_iter()
                .collect();

            let set: Vec<BadgeId> = earned.iter().copied().collect();
            ctx.store.replace_badges(*user_id, &set).await?;
            users_touched += 1;

            for badge in earned.difference(&previous) {
                newly_earned += 1;
                ctx.store
                    .enqueue_notification(
                        *user_id,
                        "badge_earned",
                        json!({
                            "badge_id": badge.as_str(),
                            "description": badge.description(),
                        }),
                    )
                    .await?;
            }
        }

        debug!(
            users = users_touched,
            badges = badges_awarded,
            new = newly_earned,
            "Badge pass complete"
        );

        Ok(JobOutcome::new(
            badges_awarded,
            windows.len() as u64,
            format!(
                "awarded {badges_awarded} badges across {users_touched} users ({newly_earned} new)"
            ),
        )
        .with_details(json!({
            "users": users_touched,
            "badges": badges_awarded,
            "newly_earned": newly_earned,
            "window_days": ctx.config.badges.window_days,
        }))
        .with_item_errors(item_errors))
    }
}

/// Assemble one qualification window per user who bet or posted in the
/// window. Users missing from the accounts table are skipped and reported.
fn build_windows(
    bets: &[crate::domain::Bet],
    post_counts: &std::collections::HashMap<Uuid, i64>,
    accounts: &std::collections::HashMap<Uuid, DateTime<Utc>>,
    item_errors: &mut Vec<String>,
) -> Vec<UserWindow> {
    let mut per_user: BTreeMap<Uuid, Vec<WindowBet>> = BTreeMap::new();

    for bet in bets {
        let settled_at = match bet.settled_at {
            Some(at) => at,
            None => {
                // Terminal status without a settlement time is a data bug
                item_errors.push(format!("bet {} is settled but has no settled_at", bet.id));
                continue;
            }
        };
        per_user.entry(bet.user_id).or_default().push(WindowBet {
            created_at: bet.created_at,
            settled_at,
            status: bet.status,
            stake: bet.stake,
            actual_win: bet.actual_win.unwrap_or(0),
            linkage: bet.linkage,
        });
    }

    let mut user_ids: BTreeSet<Uuid> = per_user.keys().copied().collect();
    user_ids.extend(post_counts.keys().copied());

    let mut windows = Vec::with_capacity(user_ids.len());
    for user_id in user_ids {
        let account_created_at = match accounts.get(&user_id) {
            Some(at) => *at,
            None => {
                item_errors.push(format!("user {user_id} has activity but no account row"));
                continue;
            }
        };

        let mut bets = per_user.remove(&user_id).unwrap_or_default();
        bets.sort_by_key(|b| b.settled_at);

        windows.push(UserWindow {
            user_id,
            bets,
            posts_created: post_counts.get(&user_id).copied().unwrap_or(0).max(0) as u64,
            account_created_at,
        });
    }

    windows
}
