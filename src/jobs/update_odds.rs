//! Simulate market movement on upcoming games

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use tracing::debug;

use crate::engine::odds::{self, MoveKind, MovementIntensity};
use crate::error::Result;
use crate::jobs::{Job, JobContext, JobOutcome, Schedule};

pub struct UpdateOddsJob;

#[async_trait]
impl Job for UpdateOddsJob {
    fn name(&self) -> &'static str {
        "update-odds"
    }

    fn description(&self) -> &'static str {
        "Seed and evolve posted lines on upcoming games"
    }

    fn schedule(&self) -> Schedule {
        Schedule::EVERY_30_MINUTES
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutcome> {
        let limit = ctx.effective_limit(ctx.config.odds.max_games_per_run);
        let games = ctx.store.upcoming_games(limit).await?;
        let now = Utc::now();
        let mut rng = StdRng::from_entropy();

        let mut seeded: u64 = 0;
        let mut sharp: u64 = 0;
        let mut public: u64 = 0;
        let mut held: u64 = 0;

        for game in &games {
            let new_book = match &game.odds {
                None => {
                    seeded += 1;
                    Some(odds::seed_book(game.sport, &mut rng))
                }
                Some(book) => {
                    let intensity =
                        MovementIntensity::for_hours_until_start(game.hours_until_start(now));
                    match odds::roll_movement(&mut rng, intensity, game.sport, book) {
                        Some(update) => {
                            match update.kind {
                                MoveKind::Sharp => sharp += 1,
                                MoveKind::Public => public += 1,
                            }
                            Some(update.book)
                        }
                        None => {
                            held += 1;
                            None
                        }
                    }
                }
            };

            if let Some(book) = new_book {
                debug!(game_id = %game.id, spread = %book.spread.line, "Line moved");
                if !ctx.dry_run {
                    ctx.store.update_game_odds(game.id, &book).await?;
                }
            }
        }

        let affected = seeded + sharp + public;
        Ok(JobOutcome::new(
            affected,
            games.len() as u64,
            format!(
                "moved {affected}/{} books ({seeded} opened, {sharp} sharp, {public} public, {held} held)",
                games.len()
            ),
        )
        .with_details(json!({
            "games": games.len(),
            "seeded": seeded,
            "sharp": sharp,
            "public": public,
            "held": held,
        })))
    }
}
