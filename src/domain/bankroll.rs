use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Wins/losses recorded for a single calendar day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
    pub wins: u32,
    pub losses: u32,
}

/// Rolled-up performance metadata stored in the bankroll `stats` column.
///
/// Recomputed in full from the settled-bet ledger by the stats rollup job;
/// never patched incrementally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankrollStats {
    /// Signed streak: positive = consecutive wins, negative = consecutive losses
    pub current_streak: i32,
    /// Longest win streak on record
    pub best_streak: u32,
    /// Largest single `actual_win` minus stake (profit, cents)
    pub biggest_win: i64,
    /// Largest single losing stake (cents, positive number)
    pub biggest_loss: i64,
    /// Settled bet count per selected team
    #[serde(default)]
    pub team_counts: BTreeMap<String, u32>,
    /// Per-day win/loss ledger
    #[serde(default)]
    pub daily: BTreeMap<NaiveDate, DayRecord>,
    /// Days with at least two settled bets and zero losses
    #[serde(default)]
    pub perfect_days: Vec<NaiveDate>,
}

/// Per-user bankroll row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bankroll {
    pub user_id: Uuid,
    /// Current balance in minor currency units
    pub balance: i64,
    pub total_wagered: i64,
    pub total_won: i64,
    pub wins: i32,
    pub losses: i32,
    pub pushes: i32,
    pub season_high: i64,
    pub season_low: i64,
    pub stats: BankrollStats,
    pub updated_at: DateTime<Utc>,
}
