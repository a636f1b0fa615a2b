//! Cron-like schedule evaluation and the sequential job dispatcher
//!
//! Schedules are three fields -- `minute hour weekday` -- where each field
//! is `*`, `*/N`, or an exact number. Weekday 0 is Monday. The scheduler
//! wakes once per minute and runs every due job sequentially: the shared
//! aggregate tables (bankrolls, badges) make concurrent jobs a lost-update
//! hazard, and none of these batches is latency-sensitive.

use chrono::{Datelike, Timelike, Utc};
use tracing::{info, warn};

use crate::error::{Result, SidepotError};
use crate::jobs::{
    self, calculate_badges::CalculateBadgesJob, db_cleanup::DbCleanupJob,
    expire_content::ExpireContentJob, media_cleanup::MediaCleanupJob,
    reset_bankrolls::ResetBankrollsJob, settle_games::SettleGamesJob,
    stats_rollup::StatsRollupJob, update_odds::UpdateOddsJob, Job, JobContext, JobReport,
};

/// One field of a schedule expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    /// `*` -- always due
    Any,
    /// `*/N` -- due when `current % N == 0`
    Step(u32),
    /// Exact value match
    Exact(u32),
}

impl Field {
    fn matches(&self, current: u32) -> bool {
        match self {
            Field::Any => true,
            Field::Step(n) => current % n == 0,
            Field::Exact(v) => current == *v,
        }
    }
}

fn parse_field(s: &str, max: u32, expr: &str) -> Result<Field> {
    if s == "*" {
        return Ok(Field::Any);
    }
    if let Some(step) = s.strip_prefix("*/") {
        let n: u32 = step
            .parse()
            .map_err(|_| SidepotError::InvalidSchedule(expr.to_string()))?;
        if n == 0 || n > max {
            return Err(SidepotError::InvalidSchedule(expr.to_string()));
        }
        return Ok(Field::Step(n));
    }
    let v: u32 = s
        .parse()
        .map_err(|_| SidepotError::InvalidSchedule(expr.to_string()))?;
    if v >= max {
        return Err(SidepotError::InvalidSchedule(expr.to_string()));
    }
    Ok(Field::Exact(v))
}

/// A `minute hour weekday` schedule gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    minute: Field,
    hour: Field,
    weekday: Field,
}

impl Schedule {
    /// Top of every hour
    pub const HOURLY: Schedule = Schedule {
        minute: Field::Exact(0),
        hour: Field::Any,
        weekday: Field::Any,
    };

    /// On the hour and half hour
    pub const EVERY_30_MINUTES: Schedule = Schedule {
        minute: Field::Step(30),
        hour: Field::Any,
        weekday: Field::Any,
    };

    /// Monday 00:00
    pub const WEEKLY_MONDAY_MIDNIGHT: Schedule = Schedule {
        minute: Field::Exact(0),
        hour: Field::Exact(0),
        weekday: Field::Exact(0),
    };

    /// Once a day at the given hour
    pub const fn daily_at(hour: u32) -> Schedule {
        Schedule {
            minute: Field::Exact(0),
            hour: Field::Exact(hour),
            weekday: Field::Any,
        }
    }

    /// Parse a three-field expression, e.g. `"0 3 *"` or `"*/30 * *"`
    pub fn parse(expr: &str) -> Result<Self> {
        let parts: Vec<&str> = expr.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(SidepotError::InvalidSchedule(expr.to_string()));
        }
        Ok(Self {
            minute: parse_field(parts[0], 60, expr)?,
            hour: parse_field(parts[1], 24, expr)?,
            weekday: parse_field(parts[2], 7, expr)?,
        })
    }

    /// Evaluate the gate for a wall-clock position (weekday 0 = Monday)
    pub fn is_due(&self, minute: u32, hour: u32, weekday: u32) -> bool {
        self.minute.matches(minute) && self.hour.matches(hour) && self.weekday.matches(weekday)
    }

    /// Human-readable form for the schedule table
    pub fn describe(&self) -> String {
        fn field(f: Field) -> String {
            match f {
                Field::Any => "*".to_string(),
                Field::Step(n) => format!("*/{n}"),
                Field::Exact(v) => v.to_string(),
            }
        }
        format!(
            "{} {} {}",
            field(self.minute),
            field(self.hour),
            field(self.weekday)
        )
    }
}

/// The static job registry, in declaration order
pub struct Scheduler {
    jobs: Vec<Box<dyn Job>>,
}

impl Scheduler {
    /// Build the standard registry.
    ///
    /// Order matters: `run_once(None)` and due-job dispatch both follow it,
    /// and settlement must precede the badge/stat rollups that read its
    /// output within the same tick.
    pub fn with_default_jobs() -> Self {
        Self {
            jobs: vec![
                Box::new(ExpireContentJob),
                Box::new(SettleGamesJob),
                Box::new(UpdateOddsJob),
                Box::new(CalculateBadgesJob),
                Box::new(StatsRollupJob),
                Box::new(ResetBankrollsJob),
                Box::new(DbCleanupJob),
                Box::new(MediaCleanupJob),
            ],
        }
    }

    pub fn jobs(&self) -> &[Box<dyn Job>] {
        &self.jobs
    }

    /// Run every job whose schedule matches the given wall-clock position,
    /// sequentially, in registry order. A failure is logged and does not
    /// block the jobs after it.
    pub async fn run_due(
        &self,
        ctx: &JobContext,
        minute: u32,
        hour: u32,
        weekday: u32,
    ) -> Vec<JobReport> {
        let mut reports = Vec::new();
        for job in &self.jobs {
            if !job.schedule().is_due(minute, hour, weekday) {
                continue;
            }
            let report = jobs::execute(job.as_ref(), ctx).await;
            if !report.success {
                warn!(
                    job = report.job_name.as_str(),
                    message = report.message.as_str(),
                    "Job failed; continuing with remaining jobs"
                );
            }
            reports.push(report);
        }
        reports
    }

    /// Run one named job, or -- with `None` -- the whole registry except the
    /// destructive bankroll reset, ignoring the schedule gate.
    pub async fn run_once(&self, ctx: &JobContext, name: Option<&str>) -> Result<Vec<JobReport>> {
        match name {
            Some(name) => {
                let job = self
                    .jobs
                    .iter()
                    .find(|j| j.name() == name)
                    .ok_or_else(|| SidepotError::UnknownJob(name.to_string()))?;
                Ok(vec![jobs::execute(job.as_ref(), ctx).await])
            }
            None => {
                let mut reports = Vec::new();
                for job in &self.jobs {
                    if job.name() == ResetBankrollsJob.name() {
                        continue;
                    }
                    reports.push(jobs::execute(job.as_ref(), ctx).await);
                }
                Ok(reports)
            }
        }
    }

    /// Minute-tick dispatch loop: evaluate once at startup, then once per
    /// minute until SIGINT. Jobs within a tick run strictly sequentially.
    pub async fn run_forever(&self, ctx: &JobContext) -> Result<()> {
        info!(jobs = self.jobs.len(), "Scheduler starting");

        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = Utc::now();
                    let reports = self
                        .run_due(
                            ctx,
                            now.minute(),
                            now.hour(),
                            now.weekday().num_days_from_monday(),
                        )
                        .await;
                    if !reports.is_empty() {
                        let failed = reports.iter().filter(|r| !r.success).count();
                        info!(ran = reports.len(), failed, "Scheduler tick complete");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received, scheduler stopping");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_describe() {
        for expr in ["0 * *", "*/30 * *", "0 0 0", "0 3 *", "* * *"] {
            let schedule = Schedule::parse(expr).unwrap();
            assert_eq!(schedule.describe(), expr);
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Schedule::parse("").is_err());
        assert!(Schedule::parse("0 *").is_err());
        assert!(Schedule::parse("0 * * *").is_err());
        assert!(Schedule::parse("61 * *").is_err());
        assert!(Schedule::parse("0 24 *").is_err());
        assert!(Schedule::parse("0 0 7").is_err());
        assert!(Schedule::parse("*/0 * *").is_err());
        assert!(Schedule::parse("x * *").is_err());
    }

    #[test]
    fn test_exact_match() {
        let weekly = Schedule::parse("0 0 0").unwrap(); // Monday midnight
        assert!(weekly.is_due(0, 0, 0));
        assert!(!weekly.is_due(0, 0, 6));
        assert!(!weekly.is_due(1, 0, 0));
        assert!(!weekly.is_due(0, 12, 0));
    }

    #[test]
    fn test_wildcard_and_step() {
        let hourly = Schedule::parse("0 * *").unwrap();
        assert!(hourly.is_due(0, 7, 3));
        assert!(!hourly.is_due(30, 7, 3));

        let half_hourly = Schedule::parse("*/30 * *").unwrap();
        assert!(half_hourly.is_due(0, 7, 3));
        assert!(half_hourly.is_due(30, 7, 3));
        assert!(!half_hourly.is_due(15, 7, 3));

        let every_minute = Schedule::parse("* * *").unwrap();
        assert!(every_minute.is_due(59, 23, 6));
    }

    #[test]
    fn test_registry_order_and_schedules() {
        let scheduler = Scheduler::with_default_jobs();
        let names: Vec<&str> = scheduler.jobs().iter().map(|j| j.name()).collect();
        assert_eq!(
            names,
            vec![
                "expire-content",
                "settle-games",
                "update-odds",
                "calculate-badges",
                "stats-rollup",
                "reset-bankrolls",
                "db-cleanup",
                "media-cleanup",
            ]
        );

        // Every declared schedule must parse and describe round-trip
        for job in scheduler.jobs() {
            let described = job.schedule().describe();
            assert_eq!(Schedule::parse(&described).unwrap(), job.schedule());
        }
    }

    #[test]
    fn test_due_set_at_monday_midnight() {
        let scheduler = Scheduler::with_default_jobs();
        let due: Vec<&str> = scheduler
            .jobs()
            .iter()
            .filter(|j| j.schedule().is_due(0, 0, 0))
            .map(|j| j.name())
            .collect();
        // Hourly + half-hourly + weekly all line up at Monday 00:00
        assert_eq!(
            due,
            vec![
                "expire-content",
                "settle-games",
                "update-odds",
                "calculate-badges",
                "stats-rollup",
                "reset-bankrolls",
            ]
        );
    }
}
