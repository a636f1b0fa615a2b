//! Settle pending bets on completed games

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use crate::engine::settlement;
use crate::error::Result;
use crate::jobs::{Job, JobContext, JobOutcome, Schedule, DEFAULT_BATCH_LIMIT};

pub struct SettleGamesJob;

#[async_trait]
impl Job for SettleGamesJob {
    fn name(&self) -> &'static str {
        "settle-games"
    }

    fn description(&self) -> &'static str {
        "Grade pending bets on completed games, pay out bankrolls"
    }

    fn schedule(&self) -> Schedule {
        Schedule::EVERY_30_MINUTES
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutcome> {
        let limit = ctx.effective_limit(DEFAULT_BATCH_LIMIT);
        let games = ctx.store.completed_games_with_pending_bets(limit).await?;

        let mut candidates: u64 = 0;
        let mut settled: u64 = 0;
        let mut skipped_terminal: u64 = 0;
        let mut item_errors: Vec<String> = Vec::new();

        for game in &games {
            let bets = ctx.store.pending_bets_for_game(game.id).await?;
            candidates += bets.len() as u64;

            let result = match settlement::settle_game(game, &bets) {
                Ok(result) => result,
                Err(e) => {
                    // Input error on the game itself: skip it, keep going
                    item_errors.push(e.to_string());
                    continue;
                }
            };
            item_errors.extend(result.errors);

            if ctx.dry_run {
                settled += result.settlements.len() as u64;
                continue;
            }

            for s in &result.settlements {
                // Bet update, payout, and notification land in one
                // transaction. The status guard means a concurrent settler
                // loses cleanly: zero rows updated, nothing credited here.
                let updated = ctx
                    .store
                    .settle_bet(
                        s.bet_id,
                        s.user_id,
                        s.outcome.to_status(),
                        s.actual_win,
                        json!({
                            "bet_id": s.bet_id,
                            "game_id": game.id,
                            "result": s.outcome.to_status().as_str(),
                            "actual_win": s.actual_win,
                        }),
                    )
                    .await?;
                if updated == 0 {
                    skipped_terminal += 1;
                    continue;
                }
                settled += 1;
            }

            debug!(
                game_id = %game.id,
                settled = result.settlements.len(),
                "Game settled"
            );
        }

        if !games.is_empty() {
            info!(
                games = games.len(),
                settled, candidates, "Settlement pass complete"
            );
        }

        Ok(JobOutcome::new(
            settled,
            candidates,
            format!(
                "settled {settled}/{candidates} bets across {} games ({} skipped)",
                games.len(),
                item_errors.len() as u64 + skipped_terminal
            ),
        )
        .with_details(json!({
            "games": games.len(),
            "settled": settled,
            "candidates": candidates,
            "lost_races": skipped_terminal,
        }))
        .with_item_errors(item_errors))
    }
}
