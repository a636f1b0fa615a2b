//! Weekly badge qualification
//!
//! Each badge is an independent predicate over a user's trailing window of
//! settled bets. The calculate-badges job builds one [`UserWindow`] per
//! active user, evaluates the battery, and full-replaces the award rows.

use chrono::{DateTime, Datelike, Utc, Weekday};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::domain::{BadgeId, BetLinkage, BetStatus};

/// Minimum consecutive wins for the streak badge
const STREAK_THRESHOLD: u32 = 3;
/// Minimum settled bets before the win-rate badge applies
const RATE_MIN_SAMPLE: usize = 5;
/// Win-rate threshold (percent)
const RATE_THRESHOLD_PCT: u64 = 60;
/// Settled bets needed for the volume badge
const VOLUME_THRESHOLD: usize = 10;
/// Winning tails/fades needed for the behavioral badges
const LINKAGE_THRESHOLD: usize = 3;
/// Settled bets a new account needs for the cohort badge
const FRESH_MIN_BETS: usize = 3;
/// Sunday wins needed (with zero Sunday losses) for the calendar badge
const SUNDAY_MIN_WINS: usize = 2;

/// One settled bet inside the qualification window
#[derive(Debug, Clone)]
pub struct WindowBet {
    pub created_at: DateTime<Utc>,
    pub settled_at: DateTime<Utc>,
    pub status: BetStatus,
    pub stake: i64,
    pub actual_win: i64,
    pub linkage: Option<BetLinkage>,
}

impl WindowBet {
    /// Profit contribution: positive on a win, negative stake on a loss,
    /// zero on a push
    fn net(&self) -> i64 {
        self.actual_win - self.stake
    }
}

/// Everything the predicate battery needs to know about one user
#[derive(Debug, Clone)]
pub struct UserWindow {
    pub user_id: Uuid,
    /// Settled bets inside the window, ascending by settlement time
    pub bets: Vec<WindowBet>,
    /// Posts the user created inside the window
    pub posts_created: u64,
    pub account_created_at: DateTime<Utc>,
}

impl UserWindow {
    /// Net profit over the window in minor currency units
    pub fn net_profit(&self) -> i64 {
        self.bets.iter().map(WindowBet::net).sum()
    }

    fn longest_win_streak(&self) -> u32 {
        let mut best = 0u32;
        let mut run = 0u32;
        for bet in &self.bets {
            match bet.status {
                BetStatus::Won => {
                    run += 1;
                    best = best.max(run);
                }
                BetStatus::Lost => run = 0,
                // Pushes neither extend nor break a streak
                _ => {}
            }
        }
        best
    }

    fn decided(&self) -> (usize, usize) {
        let wins = self
            .bets
            .iter()
            .filter(|b| b.status == BetStatus::Won)
            .count();
        let losses = self
            .bets
            .iter()
            .filter(|b| b.status == BetStatus::Lost)
            .count();
        (wins, losses)
    }

    fn winning_linked(&self, linkage: BetLinkage) -> usize {
        self.bets
            .iter()
            .filter(|b| b.status == BetStatus::Won && b.linkage == Some(linkage))
            .count()
    }

    fn sunday_record(&self) -> (usize, usize) {
        let sunday: Vec<_> = self
            .bets
            .iter()
            .filter(|b| b.created_at.weekday() == Weekday::Sun)
            .collect();
        let wins = sunday
            .iter()
            .filter(|b| b.status == BetStatus::Won)
            .count();
        let losses = sunday
            .iter()
            .filter(|b| b.status == BetStatus::Lost)
            .count();
        (wins, losses)
    }
}

/// Evaluate every per-user badge predicate.
///
/// [`BadgeId::MoneyMaker`] is cross-user and handled by [`evaluate_all`].
pub fn evaluate_user(window: &UserWindow, window_start: DateTime<Utc>) -> BTreeSet<BadgeId> {
    let mut earned = BTreeSet::new();

    if window.longest_win_streak() >= STREAK_THRESHOLD {
        earned.insert(BadgeId::HeatCheck);
    }

    let (wins, losses) = window.decided();
    let decided = wins + losses;
    if decided >= RATE_MIN_SAMPLE && (wins as u64) * 100 >= RATE_THRESHOLD_PCT * decided as u64 {
        earned.insert(BadgeId::SharpShooter);
    }

    if window.bets.len() >= VOLUME_THRESHOLD {
        earned.insert(BadgeId::HighRoller);
    }

    if window.winning_linked(BetLinkage::Tail) >= LINKAGE_THRESHOLD {
        earned.insert(BadgeId::TailGunner);
    }
    if window.winning_linked(BetLinkage::Fade) >= LINKAGE_THRESHOLD {
        earned.insert(BadgeId::Contrarian);
    }

    if window.account_created_at >= window_start && window.bets.len() >= FRESH_MIN_BETS {
        earned.insert(BadgeId::FreshMeat);
    }

    if window.bets.is_empty() && window.posts_created > 0 {
        earned.insert(BadgeId::Ghost);
    }

    let (sunday_wins, sunday_losses) = window.sunday_record();
    if sunday_wins >= SUNDAY_MIN_WINS && sunday_losses == 0 {
        earned.insert(BadgeId::PerfectSunday);
    }

    earned
}

/// Evaluate the full catalogue for every user, including the cross-user
/// profit badge.
///
/// Deterministic for a fixed input set: re-running over unchanged data
/// produces an identical award map.
pub fn evaluate_all(
    windows: &[UserWindow],
    window_start: DateTime<Utc>,
) -> BTreeMap<Uuid, BTreeSet<BadgeId>> {
    let mut awards: BTreeMap<Uuid, BTreeSet<BadgeId>> = windows
        .iter()
        .map(|w| (w.user_id, evaluate_user(w, window_start)))
        .collect();

    // MoneyMaker goes to the top positive profit; ties share it
    let top = windows.iter().map(UserWindow::net_profit).max();
    if let Some(top) = top {
        if top > 0 {
            for w in windows {
                if w.net_profit() == top {
                    if let Some(set) = awards.get_mut(&w.user_id) {
                        set.insert(BadgeId::MoneyMaker);
                    }
                }
            }
        }
    }

    awards
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn window_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap() // a Monday
    }

    fn bet(
        days_in: i64,
        status: BetStatus,
        stake: i64,
        actual_win: i64,
        linkage: Option<BetLinkage>,
    ) -> WindowBet {
        let t = window_start() + Duration::days(days_in) + Duration::hours(12);
        WindowBet {
            created_at: t,
            settled_at: t + Duration::hours(3),
            status,
            stake,
            actual_win,
            linkage,
        }
    }

    fn user(bets: Vec<WindowBet>) -> UserWindow {
        UserWindow {
            user_id: Uuid::new_v4(),
            bets,
            posts_created: 0,
            account_created_at: window_start() - Duration::days(200),
        }
    }

    fn won(stake: i64) -> WindowBet {
        bet(0, BetStatus::Won, stake, stake * 2, None)
    }

    fn lost(stake: i64) -> WindowBet {
        bet(0, BetStatus::Lost, stake, 0, None)
    }

    #[test]
    fn test_heat_check_needs_three_straight() {
        let hot = user(vec![won(100), won(100), won(100)]);
        assert!(evaluate_user(&hot, window_start()).contains(&BadgeId::HeatCheck));

        let broken = user(vec![won(100), won(100), lost(100), won(100)]);
        assert!(!evaluate_user(&broken, window_start()).contains(&BadgeId::HeatCheck));
    }

    #[test]
    fn test_push_does_not_break_streak() {
        let w = user(vec![
            won(100),
            won(100),
            bet(1, BetStatus::Push, 100, 100, None),
            won(100),
        ]);
        assert!(evaluate_user(&w, window_start()).contains(&BadgeId::HeatCheck));
    }

    #[test]
    fn test_sharp_shooter_needs_sample_size() {
        // 3-1 is 75% but only 4 decided bets
        let small = user(vec![won(100), won(100), won(100), lost(100)]);
        assert!(!evaluate_user(&small, window_start()).contains(&BadgeId::SharpShooter));

        // 3-2 on 5 decided bets is exactly 60%
        let qualified = user(vec![won(100), won(100), won(100), lost(100), lost(100)]);
        assert!(evaluate_user(&qualified, window_start()).contains(&BadgeId::SharpShooter));
    }

    #[test]
    fn test_high_roller_counts_volume() {
        let w = user((0..10).map(|_| lost(100)).collect());
        assert!(evaluate_user(&w, window_start()).contains(&BadgeId::HighRoller));
    }

    #[test]
    fn test_tail_and_fade_badges() {
        let tails = user(vec![
            bet(0, BetStatus::Won, 100, 200, Some(BetLinkage::Tail)),
            bet(1, BetStatus::Won, 100, 200, Some(BetLinkage::Tail)),
            bet(2, BetStatus::Won, 100, 200, Some(BetLinkage::Tail)),
        ]);
        let earned = evaluate_user(&tails, window_start());
        assert!(earned.contains(&BadgeId::TailGunner));
        assert!(!earned.contains(&BadgeId::Contrarian));

        // Losing tails don't count
        let cold = user(vec![
            bet(0, BetStatus::Lost, 100, 0, Some(BetLinkage::Tail)),
            bet(1, BetStatus::Lost, 100, 0, Some(BetLinkage::Tail)),
            bet(2, BetStatus::Lost, 100, 0, Some(BetLinkage::Tail)),
        ]);
        assert!(!evaluate_user(&cold, window_start()).contains(&BadgeId::TailGunner));
    }

    #[test]
    fn test_fresh_meat_requires_new_account() {
        let mut w = user(vec![won(100), won(100), lost(100)]);
        assert!(!evaluate_user(&w, window_start()).contains(&BadgeId::FreshMeat));

        w.account_created_at = window_start() + Duration::days(1);
        assert!(evaluate_user(&w, window_start()).contains(&BadgeId::FreshMeat));
    }

    #[test]
    fn test_ghost_badge() {
        let mut w = user(vec![]);
        w.posts_created = 4;
        assert!(evaluate_user(&w, window_start()).contains(&BadgeId::Ghost));

        // One bet is enough to lose it
        let mut active = user(vec![lost(100)]);
        active.posts_created = 4;
        assert!(!evaluate_user(&active, window_start()).contains(&BadgeId::Ghost));
    }

    #[test]
    fn test_perfect_sunday() {
        // window_start is a Monday, so day 6 is Sunday
        let w = user(vec![
            bet(6, BetStatus::Won, 100, 200, None),
            bet(6, BetStatus::Won, 100, 200, None),
            bet(2, BetStatus::Lost, 100, 0, None), // weekday loss is fine
        ]);
        assert!(evaluate_user(&w, window_start()).contains(&BadgeId::PerfectSunday));

        let spoiled = user(vec![
            bet(6, BetStatus::Won, 100, 200, None),
            bet(6, BetStatus::Won, 100, 200, None),
            bet(6, BetStatus::Lost, 100, 0, None),
        ]);
        assert!(!evaluate_user(&spoiled, window_start()).contains(&BadgeId::PerfectSunday));
    }

    #[test]
    fn test_money_maker_goes_to_top_profit() {
        let rich = user(vec![won(1000)]); // +1000
        let poor = user(vec![lost(1000)]); // -1000
        let rich_id = rich.user_id;
        let poor_id = poor.user_id;

        let awards = evaluate_all(&[rich, poor], window_start());
        assert!(awards[&rich_id].contains(&BadgeId::MoneyMaker));
        assert!(!awards[&poor_id].contains(&BadgeId::MoneyMaker));
    }

    #[test]
    fn test_money_maker_requires_positive_profit() {
        let less_bad = user(vec![lost(100)]);
        let worse = user(vec![lost(1000)]);
        let less_bad_id = less_bad.user_id;

        let awards = evaluate_all(&[less_bad, worse], window_start());
        assert!(!awards[&less_bad_id].contains(&BadgeId::MoneyMaker));
    }

    #[test]
    fn test_re_derivation_is_stable() {
        let users = vec![
            user(vec![won(500), won(200), won(100), lost(50)]),
            user(vec![lost(100), won(300)]),
        ];

        let first = evaluate_all(&users, window_start());
        let second = evaluate_all(&users, window_start());
        assert_eq!(first, second);
    }
}
