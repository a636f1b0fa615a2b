use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SidepotError};

/// The closed catalogue of achievement badges.
///
/// Qualification is re-derived in full every calculation run from a
/// trailing window of settled bets; awards are replaced wholesale per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeId {
    /// Three or more consecutive wins inside the window
    HeatCheck,
    /// Highest positive net profit across all users in the window
    MoneyMaker,
    /// Win rate of at least 60% on at least five settled bets
    SharpShooter,
    /// Ten or more settled bets in the window
    HighRoller,
    /// Three or more winning tail bets
    TailGunner,
    /// Three or more winning fade bets
    Contrarian,
    /// New account with at least three settled bets
    FreshMeat,
    /// Posted content but placed zero bets
    Ghost,
    /// At least two Sunday bets, all won
    PerfectSunday,
}

impl BadgeId {
    /// All badges, in catalogue order
    pub const ALL: [BadgeId; 9] = [
        BadgeId::HeatCheck,
        BadgeId::MoneyMaker,
        BadgeId::SharpShooter,
        BadgeId::HighRoller,
        BadgeId::TailGunner,
        BadgeId::Contrarian,
        BadgeId::FreshMeat,
        BadgeId::Ghost,
        BadgeId::PerfectSunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeId::HeatCheck => "heat_check",
            BadgeId::MoneyMaker => "money_maker",
            BadgeId::SharpShooter => "sharp_shooter",
            BadgeId::HighRoller => "high_roller",
            BadgeId::TailGunner => "tail_gunner",
            BadgeId::Contrarian => "contrarian",
            BadgeId::FreshMeat => "fresh_meat",
            BadgeId::Ghost => "ghost",
            BadgeId::PerfectSunday => "perfect_sunday",
        }
    }

    /// Human-readable description for notification payloads
    pub fn description(&self) -> &'static str {
        match self {
            BadgeId::HeatCheck => "Won 3+ bets in a row this week",
            BadgeId::MoneyMaker => "Top profit on the app this week",
            BadgeId::SharpShooter => "60%+ win rate on 5+ bets this week",
            BadgeId::HighRoller => "Placed 10+ settled bets this week",
            BadgeId::TailGunner => "Cashed 3+ tails this week",
            BadgeId::Contrarian => "Cashed 3+ fades this week",
            BadgeId::FreshMeat => "New here and already betting",
            BadgeId::Ghost => "All talk, no action",
            BadgeId::PerfectSunday => "Swept the Sunday slate",
        }
    }
}

impl TryFrom<&str> for BadgeId {
    type Error = SidepotError;

    fn try_from(s: &str) -> Result<Self> {
        BadgeId::ALL
            .iter()
            .copied()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| SidepotError::InvalidBetDetails(format!("unknown badge '{s}'")))
    }
}

impl std::fmt::Display for BadgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An awarded badge row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeAward {
    pub user_id: Uuid,
    pub badge: BadgeId,
    pub earned_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_all_badges() {
        for badge in BadgeId::ALL {
            assert_eq!(BadgeId::try_from(badge.as_str()).unwrap(), badge);
        }
    }

    #[test]
    fn test_unknown_badge_rejected() {
        assert!(BadgeId::try_from("participation_trophy").is_err());
    }
}
