//! Simulated market movement
//!
//! There is no live odds feed; the update-odds job evolves each upcoming
//! game's posted lines probabilistically so the feed looks alive. Movement
//! gets more aggressive as kickoff approaches. Everything here is pure and
//! RNG-parameterized so tests can seed it.

use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::{MarketBook, MoneylinePrices, Sport, SpreadMarket, TotalMarket};

/// Standard two-way juice
const STANDARD_JUICE: i32 = -110;

/// How hard the market moves for a given time-to-kickoff bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementIntensity {
    /// Less than 6 hours out
    High,
    /// Less than 12 hours out
    Medium,
    /// Everything earlier
    Low,
}

impl MovementIntensity {
    pub fn for_hours_until_start(hours: i64) -> Self {
        if hours < 6 {
            MovementIntensity::High
        } else if hours < 12 {
            MovementIntensity::Medium
        } else {
            MovementIntensity::Low
        }
    }

    /// Probability that this invocation moves the line at all
    fn move_probability(self) -> f64 {
        match self {
            MovementIntensity::High => 0.7,
            MovementIntensity::Medium => 0.45,
            MovementIntensity::Low => 0.2,
        }
    }

    /// Share of moves that are sharp (large, one-directional)
    fn sharp_share(self) -> f64 {
        match self {
            MovementIntensity::High => 0.4,
            MovementIntensity::Medium => 0.3,
            MovementIntensity::Low => 0.2,
        }
    }
}

/// Kind of move applied to a book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// Large one-directional move with juice skewed toward the action
    Sharp,
    /// Small symmetric move at standard juice
    Public,
}

/// A rolled book update
#[derive(Debug, Clone)]
pub struct BookUpdate {
    pub book: MarketBook,
    pub kind: MoveKind,
}

/// Baseline combined score per sport, used to seed an opening total
fn baseline_total(sport: Sport) -> (Decimal, Decimal) {
    // (baseline, max variance)
    match sport {
        Sport::Nba => (dec!(225), dec!(12)),
        Sport::Nfl => (dec!(45), dec!(7)),
        Sport::Mlb => (dec!(8.5), dec!(2)),
        Sport::Nhl => (dec!(6.5), dec!(1.5)),
    }
}

/// Lowest total a book would realistically post
fn total_floor(sport: Sport) -> Decimal {
    match sport {
        Sport::Nba => dec!(180),
        Sport::Nfl => dec!(30),
        Sport::Mlb => dec!(5),
        Sport::Nhl => dec!(4.5),
    }
}

/// Widest spread a book would realistically post
fn spread_cap(sport: Sport) -> Decimal {
    match sport {
        Sport::Nba => dec!(16),
        Sport::Nfl => dec!(14),
        Sport::Mlb => dec!(2.5),
        Sport::Nhl => dec!(2.5),
    }
}

/// A random value in [-max, max] quantized to half-point steps
fn half_point_jitter<R: Rng + ?Sized>(rng: &mut R, max: Decimal) -> Decimal {
    let steps = (max * dec!(2)).to_i64().unwrap_or(0).max(1);
    let n = rng.gen_range(-steps..=steps);
    Decimal::from(n) * dec!(0.5)
}

/// Derive a moneyline from a spread via a magnitude-banded lookup.
///
/// The wider the spread, the more lopsided the prices. Negative spread
/// means the home team is favored.
pub fn moneyline_for_spread(spread: Decimal) -> MoneylinePrices {
    let magnitude = spread.abs();
    let (favorite, underdog) = if magnitude < dec!(0.5) {
        (-110, -110)
    } else if magnitude <= dec!(2.5) {
        (-135, 115)
    } else if magnitude <= dec!(5.5) {
        (-190, 160)
    } else if magnitude <= dec!(8.5) {
        (-300, 245)
    } else if magnitude <= dec!(12) {
        (-470, 360)
    } else {
        (-750, 525)
    };

    if spread <= Decimal::ZERO {
        MoneylinePrices {
            home: favorite,
            away: underdog,
        }
    } else {
        MoneylinePrices {
            home: underdog,
            away: favorite,
        }
    }
}

/// Synthesize an opening book for a game with no posted odds yet
pub fn seed_book<R: Rng + ?Sized>(sport: Sport, rng: &mut R) -> MarketBook {
    let (baseline, variance) = baseline_total(sport);
    let total_line = (baseline + half_point_jitter(rng, variance)).max(total_floor(sport));

    let spread_line = half_point_jitter(rng, spread_cap(sport));

    MarketBook {
        moneyline: moneyline_for_spread(spread_line),
        spread: SpreadMarket {
            line: spread_line,
            home_price: STANDARD_JUICE,
            away_price: STANDARD_JUICE,
        },
        total: TotalMarket {
            line: total_line,
            over_price: STANDARD_JUICE,
            under_price: STANDARD_JUICE,
        },
    }
}

/// Roll one movement step for a game's book.
///
/// Returns `None` when the market holds. A sharp move shifts the spread
/// 0.5 to 2 points in one direction, drags the total the same way, and
/// skews the juice toward the side taking the action. A public move nudges
/// a half point at standard juice.
pub fn roll_movement<R: Rng + ?Sized>(
    rng: &mut R,
    intensity: MovementIntensity,
    sport: Sport,
    book: &MarketBook,
) -> Option<BookUpdate> {
    if !rng.gen_bool(intensity.move_probability()) {
        return None;
    }

    let sharp = rng.gen_bool(intensity.sharp_share());
    let toward_home = rng.gen_bool(0.5);

    let (shift, kind) = if sharp {
        // 0.5 to 2.0 in half-point steps
        let steps = rng.gen_range(1..=4);
        (Decimal::from(steps) * dec!(0.5), MoveKind::Sharp)
    } else {
        (dec!(0.5), MoveKind::Public)
    };

    // Action on the home side pulls the spread toward the home team
    // (more negative) and pushes the total up with it.
    let signed = if toward_home { -shift } else { shift };
    let cap = spread_cap(sport);
    let new_spread = (book.spread.line + signed).clamp(-cap, cap);
    let new_total = (book.total.line - signed).max(total_floor(sport));

    let (home_price, away_price) = match kind {
        MoveKind::Sharp if toward_home => (-120, 100),
        MoveKind::Sharp => (100, -120),
        MoveKind::Public => (STANDARD_JUICE, STANDARD_JUICE),
    };

    Some(BookUpdate {
        kind,
        book: MarketBook {
            moneyline: moneyline_for_spread(new_spread),
            spread: SpreadMarket {
                line: new_spread,
                home_price,
                away_price,
            },
            total: TotalMarket {
                line: new_total,
                over_price: STANDARD_JUICE,
                under_price: STANDARD_JUICE,
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_intensity_buckets() {
        assert_eq!(
            MovementIntensity::for_hours_until_start(2),
            MovementIntensity::High
        );
        assert_eq!(
            MovementIntensity::for_hours_until_start(8),
            MovementIntensity::Medium
        );
        assert_eq!(
            MovementIntensity::for_hours_until_start(30),
            MovementIntensity::Low
        );
    }

    #[test]
    fn test_moneyline_bands_get_more_lopsided() {
        let pickem = moneyline_for_spread(dec!(0));
        assert_eq!(pickem.home, pickem.away);

        let small = moneyline_for_spread(dec!(-2.5));
        let big = moneyline_for_spread(dec!(-10.5));
        assert!(small.home > big.home, "wider spread means shorter price");
        assert!(small.away < big.away);
    }

    #[test]
    fn test_moneyline_side_follows_favorite() {
        let home_fav = moneyline_for_spread(dec!(-6.5));
        assert!(home_fav.home < 0 && home_fav.away > 0);

        let away_fav = moneyline_for_spread(dec!(6.5));
        assert!(away_fav.away < 0 && away_fav.home > 0);
    }

    #[test]
    fn test_seed_book_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for sport in [Sport::Nba, Sport::Nfl, Sport::Mlb, Sport::Nhl] {
            for _ in 0..200 {
                let book = seed_book(sport, &mut rng);
                assert!(book.total.line >= total_floor(sport));
                assert!(book.spread.line.abs() <= spread_cap(sport));
                // half-point quantization
                assert!((book.spread.line * dec!(2)).fract().is_zero());
                assert!((book.total.line * dec!(2)).fract().is_zero());
            }
        }
    }

    #[test]
    fn test_roll_movement_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut book = seed_book(Sport::Nba, &mut rng);

        let mut moved = 0;
        for _ in 0..500 {
            if let Some(update) =
                roll_movement(&mut rng, MovementIntensity::High, Sport::Nba, &book)
            {
                let delta = (update.book.spread.line - book.spread.line).abs();
                assert!(delta <= dec!(2), "single move never exceeds 2 points");
                match update.kind {
                    MoveKind::Public => assert!(delta <= dec!(0.5)),
                    MoveKind::Sharp => assert!(
                        update.book.spread.home_price != update.book.spread.away_price
                            || update.book.spread.line.abs() == spread_cap(Sport::Nba)
                    ),
                }
                assert!(update.book.total.line >= total_floor(Sport::Nba));
                book = update.book;
                moved += 1;
            }
        }
        // High intensity moves roughly 70% of the time
        assert!(moved > 250, "expected frequent movement, got {moved}");
    }

    #[test]
    fn test_low_intensity_mostly_holds() {
        let mut rng = StdRng::seed_from_u64(9);
        let book = seed_book(Sport::Nfl, &mut rng);

        let moved = (0..500)
            .filter(|_| {
                roll_movement(&mut rng, MovementIntensity::Low, Sport::Nfl, &book).is_some()
            })
            .count();
        assert!(moved < 175, "low intensity should mostly hold, got {moved}");
    }
}
