//! Bet grading and payout math
//!
//! Pure functions over domain types, no I/O. The settle-games job feeds
//! this engine with a completed game and its pending bets, then applies
//! the returned settlements to the store.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{Bet, BetDetails, BetStatus, Game, TotalSide};
use crate::error::{Result, SidepotError};

/// Graded outcome of a single bet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Lost,
    Push,
}

impl Outcome {
    pub fn to_status(self) -> BetStatus {
        match self {
            Outcome::Won => BetStatus::Won,
            Outcome::Lost => BetStatus::Lost,
            Outcome::Push => BetStatus::Push,
        }
    }
}

/// One settled bet, ready to be written back
#[derive(Debug, Clone)]
pub struct Settlement {
    pub bet_id: Uuid,
    pub user_id: Uuid,
    pub outcome: Outcome,
    /// Credit applied to the bankroll: stake + profit on a win, stake on a
    /// push, zero on a loss
    pub actual_win: i64,
    pub stake: i64,
}

/// Result of settling every eligible bet on one game
#[derive(Debug, Default)]
pub struct GameSettlement {
    pub settlements: Vec<Settlement>,
    /// Per-bet errors; a malformed bet never aborts the batch
    pub errors: Vec<String>,
    /// Bets skipped because they were already terminal
    pub skipped_terminal: usize,
}

/// Profit (winnings excluding the returned stake) for a winning bet at
/// American odds.
///
/// Negative odds (favorite): risk `|odds|` to win 100, so
/// `stake * 100 / |odds|`. Positive odds (underdog): win `odds` per 100
/// risked, so `stake * odds / 100`. Integer division floors; the house
/// keeps the remainder cent.
pub fn profit(stake: i64, odds: i32) -> Result<i64> {
    if odds > -100 && odds < 100 {
        return Err(SidepotError::InvalidBetDetails(format!(
            "invalid American odds {odds}"
        )));
    }
    let odds = i64::from(odds);
    if odds < 0 {
        Ok(stake * 100 / -odds)
    } else {
        Ok(stake * odds / 100)
    }
}

/// Bankroll credit for a graded bet
pub fn actual_win(stake: i64, odds: i32, outcome: Outcome) -> Result<i64> {
    match outcome {
        Outcome::Won => Ok(stake + profit(stake, odds)?),
        Outcome::Lost => Ok(0),
        // Push is principal-neutral: the stake comes back, nothing more
        Outcome::Push => Ok(stake),
    }
}

/// Scores split into (selected team, opponent) for a named side
fn scores_for_team<'a>(game: &'a Game, team: &str) -> Result<(i32, i32)> {
    let (home, away) = game.final_scores()?;
    if team == game.home_team {
        Ok((home, away))
    } else if team == game.away_team {
        Ok((away, home))
    } else {
        Err(SidepotError::InvalidBetDetails(format!(
            "team '{team}' is not playing in game {}",
            game.id
        )))
    }
}

/// Grade a bet's details against a completed game's final scores
pub fn grade(details: &BetDetails, game: &Game) -> Result<Outcome> {
    match details {
        BetDetails::Moneyline { team } => {
            let (selected, opponent) = scores_for_team(game, team)?;
            // A drawn game pushes: the stake is returned. Ties are real in
            // some sports (NFL regular season), and grading a tie as a
            // loss for both sides would be indefensible.
            Ok(match selected.cmp(&opponent) {
                std::cmp::Ordering::Greater => Outcome::Won,
                std::cmp::Ordering::Less => Outcome::Lost,
                std::cmp::Ordering::Equal => Outcome::Push,
            })
        }
        BetDetails::Spread { team, line } => {
            let (selected, opponent) = scores_for_team(game, team)?;
            let adjusted_margin = Decimal::from(selected - opponent) + *line;
            Ok(if adjusted_margin > Decimal::ZERO {
                Outcome::Won
            } else if adjusted_margin < Decimal::ZERO {
                Outcome::Lost
            } else {
                Outcome::Push
            })
        }
        BetDetails::Total { side, line } => {
            let (home, away) = game.final_scores()?;
            let actual_total = Decimal::from(home + away);
            Ok(match (side, actual_total.cmp(line)) {
                (_, std::cmp::Ordering::Equal) => Outcome::Push,
                (TotalSide::Over, std::cmp::Ordering::Greater) => Outcome::Won,
                (TotalSide::Over, std::cmp::Ordering::Less) => Outcome::Lost,
                (TotalSide::Under, std::cmp::Ordering::Less) => Outcome::Won,
                (TotalSide::Under, std::cmp::Ordering::Greater) => Outcome::Lost,
            })
        }
    }
}

/// Settle every eligible bet on one completed game in a single pass.
///
/// Terminal bets are excluded up front, which makes a repeat invocation a
/// no-op. Per-bet failures (malformed details, bad odds) are collected,
/// never thrown.
pub fn settle_game(game: &Game, bets: &[Bet]) -> Result<GameSettlement> {
    // Fail the whole job early if the game itself is not settleable
    game.final_scores()?;

    let mut result = GameSettlement::default();

    for bet in bets {
        if bet.status.is_terminal() {
            result.skipped_terminal += 1;
            continue;
        }

        let settled = bet
            .parsed_details()
            .and_then(|details| grade(&details, game))
            .and_then(|outcome| {
                Ok(Settlement {
                    bet_id: bet.id,
                    user_id: bet.user_id,
                    outcome,
                    actual_win: actual_win(bet.stake, bet.odds, outcome)?,
                    stake: bet.stake,
                })
            });

        match settled {
            Ok(settlement) => result.settlements.push(settlement),
            Err(e) => result.errors.push(e.to_string()),
        }
    }

    Ok(result)
}
