use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SidepotError};

/// Sport code for a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Nba,
    Nfl,
    Mlb,
    Nhl,
}

impl Sport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Nba => "nba",
            Sport::Nfl => "nfl",
            Sport::Mlb => "mlb",
            Sport::Nhl => "nhl",
        }
    }
}

impl TryFrom<&str> for Sport {
    type Error = SidepotError;

    fn try_from(s: &str) -> Result<Self> {
        match s {
            "nba" => Ok(Sport::Nba),
            "nfl" => Ok(Sport::Nfl),
            "mlb" => Ok(Sport::Mlb),
            "nhl" => Ok(Sport::Nhl),
            other => Err(SidepotError::UnknownSport(other.to_string())),
        }
    }
}

impl std::fmt::Display for Sport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Game lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Scheduled,
    Live,
    Completed,
    Cancelled,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Scheduled => "scheduled",
            GameStatus::Live => "live",
            GameStatus::Completed => "completed",
            GameStatus::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for GameStatus {
    type Error = SidepotError;

    fn try_from(s: &str) -> Result<Self> {
        match s {
            "scheduled" => Ok(GameStatus::Scheduled),
            "live" => Ok(GameStatus::Live),
            "completed" => Ok(GameStatus::Completed),
            "cancelled" => Ok(GameStatus::Cancelled),
            other => Err(SidepotError::GameNotSettleable(format!(
                "unknown game status '{other}'"
            ))),
        }
    }
}

/// Moneyline prices for both sides (American odds)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MoneylinePrices {
    pub home: i32,
    pub away: i32,
}

/// Posted spread with juice on each side.
///
/// The line is signed from the home team's perspective (negative when the
/// home team is favored).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpreadMarket {
    pub line: Decimal,
    pub home_price: i32,
    pub away_price: i32,
}

/// Posted total (over/under) with juice on each side
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TotalMarket {
    pub line: Decimal,
    pub over_price: i32,
    pub under_price: i32,
}

/// The bookmaker odds document stored on a game
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarketBook {
    pub moneyline: MoneylinePrices,
    pub spread: SpreadMarket,
    pub total: TotalMarket,
}

/// A scheduled or played game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: Uuid,
    pub home_team: String,
    pub away_team: String,
    pub sport: Sport,
    pub start_time: DateTime<Utc>,
    pub status: GameStatus,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub odds: Option<MarketBook>,
    pub odds_updated_at: Option<DateTime<Utc>>,
}

impl Game {
    /// Final scores, available only for a settlement-eligible game
    pub fn final_scores(&self) -> Result<(i32, i32)> {
        if self.status != GameStatus::Completed {
            return Err(SidepotError::GameNotSettleable(format!(
                "game {} has status {}",
                self.id,
                self.status.as_str()
            )));
        }
        match (self.home_score, self.away_score) {
            (Some(home), Some(away)) => Ok((home, away)),
            _ => Err(SidepotError::GameNotSettleable(format!(
                "game {} is completed but missing scores",
                self.id
            ))),
        }
    }

    /// Hours until kickoff (negative once the game has started)
    pub fn hours_until_start(&self, now: DateTime<Utc>) -> i64 {
        (self.start_time - now).num_hours()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn game(status: GameStatus, home: Option<i32>, away: Option<i32>) -> Game {
        Game {
            id: Uuid::new_v4(),
            home_team: "Lakers".to_string(),
            away_team: "Celtics".to_string(),
            sport: Sport::Nba,
            start_time: Utc::now() - Duration::hours(3),
            status,
            home_score: home,
            away_score: away,
            odds: None,
            odds_updated_at: None,
        }
    }

    #[test]
    fn test_final_scores_requires_completed() {
        let g = game(GameStatus::Live, Some(50), Some(48));
        assert!(g.final_scores().is_err());

        let g = game(GameStatus::Completed, Some(112), Some(108));
        assert_eq!(g.final_scores().unwrap(), (112, 108));
    }

    #[test]
    fn test_final_scores_requires_both_scores() {
        let g = game(GameStatus::Completed, Some(112), None);
        assert!(g.final_scores().is_err());
    }
}
