use crate::domain::{
    BadgeId, Bet, BetLinkage, BetStatus, BetType, Game, GameStatus, MarketBook, Sport,
};
use crate::error::{Result, SidepotError};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::collections::HashMap;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// The closed set of tables the cleanup job may hard-delete from.
///
/// Cleanup never dispatches on a runtime table-name string; every variant
/// maps to a statically known statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupTable {
    Posts,
    Messages,
    MediaAssets,
}

impl CleanupTable {
    pub const ALL: [CleanupTable; 3] = [
        CleanupTable::Posts,
        CleanupTable::Messages,
        CleanupTable::MediaAssets,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupTable::Posts => "posts",
            CleanupTable::Messages => "messages",
            CleanupTable::MediaAssets => "media_assets",
        }
    }

    fn delete_sql(&self) -> &'static str {
        match self {
            CleanupTable::Posts => {
                "DELETE FROM posts WHERE id IN \
                 (SELECT id FROM posts WHERE deleted_at IS NOT NULL AND deleted_at < $1 LIMIT $2)"
            }
            CleanupTable::Messages => {
                "DELETE FROM messages WHERE id IN \
                 (SELECT id FROM messages WHERE deleted_at IS NOT NULL AND deleted_at < $1 LIMIT $2)"
            }
            CleanupTable::MediaAssets => {
                "DELETE FROM media_assets WHERE id IN \
                 (SELECT id FROM media_assets WHERE deleted_at IS NOT NULL AND deleted_at < $1 LIMIT $2)"
            }
        }
    }

    fn count_sql(&self) -> &'static str {
        match self {
            CleanupTable::Posts => {
                "SELECT COUNT(*) AS n FROM posts WHERE deleted_at IS NOT NULL AND deleted_at < $1"
            }
            CleanupTable::Messages => {
                "SELECT COUNT(*) AS n FROM messages WHERE deleted_at IS NOT NULL AND deleted_at < $1"
            }
            CleanupTable::MediaAssets => {
                "SELECT COUNT(*) AS n FROM media_assets WHERE deleted_at IS NOT NULL AND deleted_at < $1"
            }
        }
    }
}

/// A job execution audit row, written once per non-dry-run invocation
#[derive(Debug, Clone)]
pub struct JobExecutionRecord {
    pub job_name: String,
    pub success: bool,
    pub message: String,
    pub affected: i64,
    pub duration_ms: i64,
    pub details: serde_json::Value,
    pub executed_by: String,
}

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create a PostgreSQL store from an existing connection pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ==================== Games ====================

    /// Completed games (with final scores) that still carry pending bets
    #[instrument(skip(self))]
    pub async fn completed_games_with_pending_bets(&self, limit: i64) -> Result<Vec<Game>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT g.id, g.home_team, g.away_team, g.sport, g.start_time,
                   g.status, g.home_score, g.away_score, g.odds, g.odds_updated_at
            FROM games g
            JOIN bets b ON b.game_id = g.id AND b.status = 'pending'
            WHERE g.status = 'completed'
              AND g.home_score IS NOT NULL
              AND g.away_score IS NOT NULL
            ORDER BY g.start_time
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(game_from_row).collect()
    }

    /// Scheduled games that have not started yet, soonest first
    pub async fn upcoming_games(&self, limit: i64) -> Result<Vec<Game>> {
        let rows = sqlx::query(
            r#"
            SELECT id, home_team, away_team, sport, start_time,
                   status, home_score, away_score, odds, odds_updated_at
            FROM games
            WHERE status = 'scheduled' AND start_time > NOW()
            ORDER BY start_time
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(game_from_row).collect()
    }

    /// Write a game's odds document and bump its odds timestamp
    pub async fn update_game_odds(&self, game_id: Uuid, book: &MarketBook) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE games SET odds = $2, odds_updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(game_id)
        .bind(serde_json::to_value(book)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ==================== Bets ====================

    /// Pending bets on one game
    pub async fn pending_bets_for_game(&self, game_id: Uuid) -> Result<Vec<Bet>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, game_id, bet_type, details, stake, odds,
                   potential_win, actual_win, status, created_at, settled_at,
                   original_bet_id, linkage
            FROM bets
            WHERE game_id = $1 AND status = 'pending'
            ORDER BY created_at
            "#,
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(bet_from_row).collect()
    }

    /// Mark one bet terminal, credit the payout, and enqueue the
    /// notification in a single transaction.
    ///
    /// The status guard makes settlement idempotent even under concurrent
    /// runs: only the first writer finds the row still pending. All three
    /// writes commit or roll back together -- a failure mid-sequence can
    /// never leave a terminal bet with an uncredited payout, which no later
    /// run could repair (the guard excludes terminal bets forever).
    pub async fn settle_bet(
        &self,
        bet_id: Uuid,
        user_id: Uuid,
        status: BetStatus,
        actual_win: i64,
        notification: serde_json::Value,
    ) -> Result<u64> {
        let (win_inc, loss_inc, push_inc) = match status {
            BetStatus::Won => (1i32, 0i32, 0i32),
            BetStatus::Lost => (0, 1, 0),
            BetStatus::Push => (0, 0, 1),
            other => {
                return Err(SidepotError::JobFailed {
                    job: "settle-games".to_string(),
                    reason: format!("non-terminal settlement status {}", other.as_str()),
                })
            }
        };

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE bets
            SET status = $2, actual_win = $3, settled_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(bet_id)
        .bind(status.as_str())
        .bind(actual_win)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            // Lost the race to a concurrent settler; nothing to credit
            tx.rollback().await?;
            return Ok(0);
        }

        sqlx::query(
            r#"
            UPDATE bankrolls
            SET balance = balance + $2,
                total_won = total_won + $2,
                wins = wins + $3,
                losses = losses + $4,
                pushes = pushes + $5,
                season_high = GREATEST(season_high, balance + $2),
                season_low = LEAST(season_low, balance + $2),
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(actual_win)
        .bind(win_inc)
        .bind(loss_inc)
        .bind(push_inc)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, notification_type, payload, read, created_at)
            VALUES ($1, 'bet_settled', $2, FALSE, NOW())
            "#,
        )
        .bind(user_id)
        .bind(notification)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Settled bets (won/lost/push) settled at or after `since`
    pub async fn settled_bets_since(&self, since: DateTime<Utc>) -> Result<Vec<Bet>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, game_id, bet_type, details, stake, odds,
                   potential_win, actual_win, status, created_at, settled_at,
                   original_bet_id, linkage
            FROM bets
            WHERE status IN ('won', 'lost', 'push') AND settled_at >= $1
            ORDER BY user_id, settled_at
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(bet_from_row).collect()
    }

    /// Users with at least one settled bet, ever
    pub async fn user_ids_with_settled_bets(&self) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT DISTINCT user_id FROM bets WHERE status IN ('won', 'lost', 'push')",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get("user_id")).collect())
    }

    /// One user's full settled-bet ledger, oldest first
    pub async fn settled_ledger(&self, user_id: Uuid) -> Result<Vec<Bet>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, game_id, bet_type, details, stake, odds,
                   potential_win, actual_win, status, created_at, settled_at,
                   original_bet_id, linkage
            FROM bets
            WHERE user_id = $1 AND status IN ('won', 'lost', 'push')
            ORDER BY settled_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(bet_from_row).collect()
    }

    // ==================== Bankrolls ====================

    /// Write a full stats rollup over a user's bankroll row
    pub async fn write_rollup(
        &self,
        user_id: Uuid,
        rollup: &crate::engine::stats::StatsRollup,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE bankrolls
            SET total_wagered = $2,
                total_won = $3,
                wins = $4,
                losses = $5,
                pushes = $6,
                stats = $7,
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(rollup.total_wagered)
        .bind(rollup.total_won)
        .bind(rollup.wins)
        .bind(rollup.losses)
        .bind(rollup.pushes)
        .bind(serde_json::to_value(&rollup.stats)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Number of bankroll rows
    pub async fn count_bankrolls(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM bankrolls")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Reset every bankroll to the starting balance and zero the aggregates
    #[instrument(skip(self))]
    pub async fn reset_all_bankrolls(&self, starting_balance: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE bankrolls
            SET balance = $1,
                total_wagered = 0,
                total_won = 0,
                wins = 0,
                losses = 0,
                pushes = 0,
                season_high = $1,
                season_low = $1,
                stats = '{}'::jsonb,
                updated_at = NOW()
            "#,
        )
        .bind(starting_balance)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    // ==================== Badges ====================

    /// Current award set for one user
    pub async fn badges_for_user(&self, user_id: Uuid) -> Result<Vec<BadgeId>> {
        let rows = sqlx::query("SELECT badge_id FROM badges WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|r| BadgeId::try_from(r.get::<String, _>("badge_id").as_str()))
            .collect()
    }

    /// Full-replace a user's award set in one transaction.
    ///
    /// Delete-then-insert keeps qualification consistent under retroactive
    /// data corrections; incremental patching would drift.
    pub async fn replace_badges(&self, user_id: Uuid, badges: &[BadgeId]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM badges WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for badge in badges {
            sqlx::query(
                "INSERT INTO badges (user_id, badge_id, earned_at) VALUES ($1, $2, NOW())",
            )
            .bind(user_id)
            .bind(badge.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(user_id = %user_id, count = badges.len(), "Replaced badge set");
        Ok(())
    }

    // ==================== Users / posts ====================

    /// Account creation time per user
    pub async fn account_created_at(&self) -> Result<HashMap<Uuid, DateTime<Utc>>> {
        let rows = sqlx::query("SELECT id, created_at FROM users")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|r| (r.get("id"), r.get("created_at")))
            .collect())
    }

    /// Posts created per user since `since` (soft-deleted included; a ghost
    /// who posted and then expired still posted)
    pub async fn post_counts_since(&self, since: DateTime<Utc>) -> Result<HashMap<Uuid, i64>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, COUNT(*) AS n
            FROM posts
            WHERE created_at >= $1
            GROUP BY user_id
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| (r.get("user_id"), r.get::<i64, _>("n")))
            .collect())
    }

    // ==================== Content lifecycle ====================

    /// Posts past their fixed `expires_at`, not yet soft-deleted
    pub async fn expired_post_ids(&self, limit: i64) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM posts
            WHERE deleted_at IS NULL
              AND expires_at IS NOT NULL
              AND expires_at <= NOW()
            ORDER BY expires_at
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get("id")).collect())
    }

    /// Pick posts whose derived expiry (game start + TTL) has passed.
    ///
    /// The expiry anchors on the linked game's start time, never on the
    /// post's own creation time.
    pub async fn expired_pick_post_ids(&self, ttl_hours: i64, limit: i64) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id
            FROM posts p
            JOIN bets b ON b.id = p.bet_id
            JOIN games g ON g.id = b.game_id
            WHERE p.deleted_at IS NULL
              AND p.post_type = 'pick'
              AND g.start_time + make_interval(hours => $1::int) <= NOW()
            ORDER BY g.start_time
            LIMIT $2
            "#,
        )
        .bind(ttl_hours as i32)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get("id")).collect())
    }

    /// Messages older than the fixed TTL cutoff, not yet soft-deleted
    pub async fn expired_message_ids(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM messages
            WHERE deleted_at IS NULL AND created_at < $1
            ORDER BY created_at
            LIMIT $2
            "#,
        )
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get("id")).collect())
    }

    /// Stamp a deletion timestamp on posts
    pub async fn soft_delete_posts(&self, ids: &[Uuid]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result =
            sqlx::query("UPDATE posts SET deleted_at = NOW() WHERE id = ANY($1) AND deleted_at IS NULL")
                .bind(ids)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Stamp a deletion timestamp on messages
    pub async fn soft_delete_messages(&self, ids: &[Uuid]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE messages SET deleted_at = NOW() WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(ids)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Hard-delete rows soft-deleted before `cutoff` from one table
    pub async fn hard_delete_expired(
        &self,
        table: CleanupTable,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<u64> {
        let result = sqlx::query(table.delete_sql())
            .bind(cutoff)
            .bind(limit)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Count rows eligible for hard deletion from one table
    pub async fn count_hard_deletable(
        &self,
        table: CleanupTable,
        cutoff: DateTime<Utc>,
    ) -> Result<i64> {
        let row = sqlx::query(table.count_sql())
            .bind(cutoff)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Media rows whose owning post is gone, or soft-deleted past `cutoff`
    pub async fn orphaned_media_ids(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            r#"
            SELECT m.id
            FROM media_assets m
            LEFT JOIN posts p ON p.id = m.post_id
            WHERE m.deleted_at IS NULL
              AND (p.id IS NULL OR (p.deleted_at IS NOT NULL AND p.deleted_at < $1))
            LIMIT $2
            "#,
        )
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get("id")).collect())
    }

    /// Soft-delete media rows (hard deletion happens via db-cleanup)
    pub async fn soft_delete_media(&self, ids: &[Uuid]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE media_assets SET deleted_at = NOW() WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(ids)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    // ==================== Notifications ====================

    /// Enqueue a notification row (delivery is someone else's problem)
    pub async fn enqueue_notification(
        &self,
        user_id: Uuid,
        notification_type: &str,
        payload: serde_json::Value,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, notification_type, payload, read, created_at)
            VALUES ($1, $2, $3, FALSE, NOW())
            "#,
        )
        .bind(user_id)
        .bind(notification_type)
        .bind(payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ==================== Job executions ====================

    /// Append one audit row; never updated afterwards
    pub async fn record_job_execution(&self, record: &JobExecutionRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO job_executions
                (job_name, success, message, affected, duration_ms, details, executed_by, executed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            "#,
        )
        .bind(&record.job_name)
        .bind(record.success)
        .bind(&record.message)
        .bind(record.affected)
        .bind(record.duration_ms)
        .bind(&record.details)
        .bind(&record.executed_by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn game_from_row(row: &sqlx::postgres::PgRow) -> Result<Game> {
    let odds: Option<serde_json::Value> = row.get("odds");
    let odds: Option<MarketBook> = odds.map(serde_json::from_value).transpose()?;

    Ok(Game {
        id: row.get("id"),
        home_team: row.get("home_team"),
        away_team: row.get("away_team"),
        sport: Sport::try_from(row.get::<String, _>("sport").as_str())?,
        start_time: row.get("start_time"),
        status: GameStatus::try_from(row.get::<String, _>("status").as_str())?,
        home_score: row.get("home_score"),
        away_score: row.get("away_score"),
        odds,
        odds_updated_at: row.get("odds_updated_at"),
    })
}

fn bet_from_row(row: &sqlx::postgres::PgRow) -> Result<Bet> {
    let linkage: Option<String> = row.get("linkage");
    let linkage = linkage
        .as_deref()
        .map(BetLinkage::try_from)
        .transpose()?;

    Ok(Bet {
        id: row.get("id"),
        user_id: row.get("user_id"),
        game_id: row.get("game_id"),
        bet_type: BetType::try_from(row.get::<String, _>("bet_type").as_str())?,
        details: row.get("details"),
        stake: row.get("stake"),
        odds: row.get("odds"),
        potential_win: row.get("potential_win"),
        actual_win: row.get("actual_win"),
        status: BetStatus::try_from(row.get::<String, _>("status").as_str())?,
        created_at: row.get("created_at"),
        settled_at: row.get("settled_at"),
        original_bet_id: row.get("original_bet_id"),
        linkage,
    })
}
