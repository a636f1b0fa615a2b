//! Lifetime statistics rollup
//!
//! Recomputes a user's aggregates from their entire settled-bet ledger.
//! Always a full recomputation: retroactive settlement corrections (a game
//! re-graded, a bet voided) are picked up for free, which an incremental
//! update would silently miss.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::domain::{BankrollStats, BetStatus, DayRecord};

/// Wins needed on a zero-loss day for it to count as perfect
const PERFECT_DAY_MIN_WINS: u32 = 2;

/// One settled bet from the ledger, oldest first
#[derive(Debug, Clone)]
pub struct LedgerBet {
    pub settled_at: DateTime<Utc>,
    pub status: BetStatus,
    pub stake: i64,
    pub actual_win: i64,
    /// Selected team, when the bet type names one
    pub team: Option<String>,
}

/// Full recomputed aggregate for one user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsRollup {
    pub total_wagered: i64,
    pub total_won: i64,
    pub wins: i32,
    pub losses: i32,
    pub pushes: i32,
    pub stats: BankrollStats,
}

/// Recompute every aggregate from the ledger.
///
/// Pushes are principal-neutral throughout: they count in `pushes` and
/// `total_wagered`/`total_won`, but never touch streaks, the daily ledger,
/// or biggest win/loss.
pub fn rollup(ledger: &[LedgerBet]) -> StatsRollup {
    let mut out = StatsRollup::default();
    let mut bets: Vec<&LedgerBet> = ledger.iter().collect();
    bets.sort_by_key(|b| b.settled_at);

    let mut current: i32 = 0;
    let mut daily: BTreeMap<chrono::NaiveDate, DayRecord> = BTreeMap::new();

    for bet in &bets {
        out.total_wagered += bet.stake;
        out.total_won += bet.actual_win;

        if let Some(team) = &bet.team {
            *out.stats.team_counts.entry(team.clone()).or_insert(0) += 1;
        }

        let day = daily.entry(bet.settled_at.date_naive()).or_default();

        match bet.status {
            BetStatus::Won => {
                out.wins += 1;
                day.wins += 1;
                current = if current > 0 { current + 1 } else { 1 };
                out.stats.best_streak = out.stats.best_streak.max(current as u32);
                out.stats.biggest_win = out.stats.biggest_win.max(bet.actual_win - bet.stake);
            }
            BetStatus::Lost => {
                out.losses += 1;
                day.losses += 1;
                current = if current < 0 { current - 1 } else { -1 };
                out.stats.biggest_loss = out.stats.biggest_loss.max(bet.stake);
            }
            BetStatus::Push => {
                out.pushes += 1;
            }
            // Pending/cancelled rows should never reach the ledger
            _ => {}
        }
    }

    out.stats.current_streak = current;
    out.stats.perfect_days = daily
        .iter()
        .filter(|(_, rec)| rec.losses == 0 && rec.wins >= PERFECT_DAY_MIN_WINS)
        .map(|(day, _)| *day)
        .collect();
    out.stats.daily = daily;

    out
}
