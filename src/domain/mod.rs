pub mod badge;
pub mod bankroll;
pub mod bet;
pub mod game;

pub use badge::{BadgeAward, BadgeId};
pub use bankroll::{Bankroll, BankrollStats, DayRecord};
pub use bet::{Bet, BetDetails, BetLinkage, BetStatus, BetType, TotalSide};
pub use game::{Game, GameStatus, MarketBook, MoneylinePrices, SpreadMarket, Sport, TotalMarket};
