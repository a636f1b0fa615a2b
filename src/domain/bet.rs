use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SidepotError};

/// Kind of wager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetType {
    Spread,
    Moneyline,
    Total,
}

impl BetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetType::Spread => "spread",
            BetType::Moneyline => "moneyline",
            BetType::Total => "total",
        }
    }
}

impl TryFrom<&str> for BetType {
    type Error = SidepotError;

    fn try_from(s: &str) -> Result<Self> {
        match s {
            "spread" => Ok(BetType::Spread),
            "moneyline" => Ok(BetType::Moneyline),
            "total" => Ok(BetType::Total),
            other => Err(SidepotError::UnknownBetType(other.to_string())),
        }
    }
}

/// Bet lifecycle status.
///
/// `Won`, `Lost`, `Push` and `Cancelled` are terminal: a bet in any of
/// those states is never settled again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    Pending,
    Won,
    Lost,
    Push,
    Cancelled,
}

impl BetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetStatus::Pending => "pending",
            BetStatus::Won => "won",
            BetStatus::Lost => "lost",
            BetStatus::Push => "push",
            BetStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BetStatus::Pending)
    }
}

impl TryFrom<&str> for BetStatus {
    type Error = SidepotError;

    fn try_from(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(BetStatus::Pending),
            "won" => Ok(BetStatus::Won),
            "lost" => Ok(BetStatus::Lost),
            "push" => Ok(BetStatus::Push),
            "cancelled" => Ok(BetStatus::Cancelled),
            other => Err(SidepotError::InvalidBetDetails(format!(
                "unknown bet status '{other}'"
            ))),
        }
    }
}

/// Side of a total bet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalSide {
    Over,
    Under,
}

/// Structured bet details stored in the `details` JSONB column.
///
/// The tag mirrors the `bet_type` column; `Bet::parsed_details` checks the
/// two agree so a corrupt row is caught before grading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BetDetails {
    /// Selected team against a signed line (negative when laying points)
    Spread { team: String, line: Decimal },
    /// Selected team to win outright
    Moneyline { team: String },
    /// Over/under against a posted combined-score line
    Total { side: TotalSide, line: Decimal },
}

impl BetDetails {
    pub fn bet_type(&self) -> BetType {
        match self {
            BetDetails::Spread { .. } => BetType::Spread,
            BetDetails::Moneyline { .. } => BetType::Moneyline,
            BetDetails::Total { .. } => BetType::Total,
        }
    }
}

/// Tail/fade linkage to another user's original bet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetLinkage {
    Tail,
    Fade,
}

impl BetLinkage {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetLinkage::Tail => "tail",
            BetLinkage::Fade => "fade",
        }
    }
}

impl TryFrom<&str> for BetLinkage {
    type Error = SidepotError;

    fn try_from(s: &str) -> Result<Self> {
        match s {
            "tail" => Ok(BetLinkage::Tail),
            "fade" => Ok(BetLinkage::Fade),
            other => Err(SidepotError::InvalidBetDetails(format!(
                "unknown bet linkage '{other}'"
            ))),
        }
    }
}

/// A wager placed by a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub game_id: Uuid,
    pub bet_type: BetType,
    /// Raw details document; parse with [`Bet::parsed_details`]
    pub details: serde_json::Value,
    /// Stake in minor currency units (cents)
    pub stake: i64,
    /// Quoted price in American odds
    pub odds: i32,
    pub potential_win: i64,
    pub actual_win: Option<i64>,
    pub status: BetStatus,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
    pub original_bet_id: Option<Uuid>,
    pub linkage: Option<BetLinkage>,
}

impl Bet {
    /// Parse and validate the details document against the bet type
    pub fn parsed_details(&self) -> Result<BetDetails> {
        let details: BetDetails = serde_json::from_value(self.details.clone())
            .map_err(|e| SidepotError::InvalidBetDetails(format!("bet {}: {e}", self.id)))?;

        if details.bet_type() != self.bet_type {
            return Err(SidepotError::InvalidBetDetails(format!(
                "bet {}: details type {} does not match bet type {}",
                self.id,
                details.bet_type().as_str(),
                self.bet_type.as_str()
            )));
        }
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn bet(bet_type: BetType, details: serde_json::Value) -> Bet {
        Bet {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            game_id: Uuid::new_v4(),
            bet_type,
            details,
            stake: 1000,
            odds: -110,
            potential_win: 1909,
            actual_win: None,
            status: BetStatus::Pending,
            created_at: Utc::now(),
            settled_at: None,
            original_bet_id: None,
            linkage: None,
        }
    }

    #[test]
    fn test_parse_spread_details() {
        let b = bet(
            BetType::Spread,
            json!({"type": "spread", "team": "Lakers", "line": "-3.5"}),
        );
        let details = b.parsed_details().unwrap();
        assert_eq!(
            details,
            BetDetails::Spread {
                team: "Lakers".to_string(),
                line: dec!(-3.5),
            }
        );
    }

    #[test]
    fn test_parse_total_details() {
        let b = bet(
            BetType::Total,
            json!({"type": "total", "side": "over", "line": "215.5"}),
        );
        let details = b.parsed_details().unwrap();
        assert_eq!(
            details,
            BetDetails::Total {
                side: TotalSide::Over,
                line: dec!(215.5),
            }
        );
    }

    #[test]
    fn test_mismatched_type_is_rejected() {
        let b = bet(BetType::Spread, json!({"type": "moneyline", "team": "Lakers"}));
        assert!(b.parsed_details().is_err());
    }

    #[test]
    fn test_malformed_details_are_rejected() {
        let b = bet(BetType::Total, json!({"type": "total", "side": "sideways"}));
        assert!(b.parsed_details().is_err());
    }
}
