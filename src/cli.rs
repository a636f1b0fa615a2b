//! Sidepot job runner CLI
//!
//! One subcommand per job plus `all` (the standard set), `schedule`
//! (print the dispatch table), and `daemon` (run the minute-tick
//! scheduler). `--dry-run`, `--verbose`, and `--limit` apply everywhere.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::jobs::{JobReport, Scheduler};

/// Sidepot background job runner
#[derive(Parser, Debug)]
#[command(name = "sidepot")]
#[command(author, version, about = "Background jobs and bet settlement for the Sidepot app")]
pub struct Cli {
    /// Config file path (default: config/default.toml + SIDEPOT_* env)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Compute and report everything, write nothing
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Cap rows mutated per job (safe incremental rollout)
    #[arg(long, global = true)]
    pub limit: Option<i64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Soft-delete expired posts, pick posts, and messages
    Expire,
    /// Grade pending bets on completed games and pay out bankrolls
    SettleGames,
    /// Seed and evolve posted odds on upcoming games
    UpdateOdds,
    /// Recompute weekly achievement badges
    Badges,
    /// Recompute lifetime bankroll statistics
    Stats,
    /// Hard-delete soft-deleted rows past the retention window
    Cleanup,
    /// Flag media rows whose owning post is gone
    MediaCleanup,
    /// Reset every bankroll to the starting balance (destructive)
    ResetBankrolls {
        /// Skip the interactive confirmation
        #[arg(long)]
        force: bool,
    },
    /// Run the standard job set once (excludes reset-bankrolls)
    All,
    /// Print the job schedule table
    Schedule,
    /// Run the minute-tick scheduler until SIGINT
    Daemon,
}

impl Commands {
    /// Registry name for single-job subcommands
    pub fn job_name(&self) -> Option<&'static str> {
        match self {
            Commands::Expire => Some("expire-content"),
            Commands::SettleGames => Some("settle-games"),
            Commands::UpdateOdds => Some("update-odds"),
            Commands::Badges => Some("calculate-badges"),
            Commands::Stats => Some("stats-rollup"),
            Commands::Cleanup => Some("db-cleanup"),
            Commands::MediaCleanup => Some("media-cleanup"),
            Commands::ResetBankrolls { .. } => Some("reset-bankrolls"),
            Commands::All | Commands::Schedule | Commands::Daemon => None,
        }
    }
}

#[derive(Tabled)]
struct ScheduleRow {
    #[tabled(rename = "Job")]
    job: &'static str,
    #[tabled(rename = "Schedule (min hr wday)")]
    schedule: String,
    #[tabled(rename = "Description")]
    description: &'static str,
}

/// Print the dispatch table in registry order
pub fn print_schedule(scheduler: &Scheduler) {
    let rows: Vec<ScheduleRow> = scheduler
        .jobs()
        .iter()
        .map(|job| ScheduleRow {
            job: job.name(),
            schedule: job.schedule().describe(),
            description: job.description(),
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::sharp()));
}

/// Print one ✅/❌ line per report; returns true when every job succeeded
pub fn print_reports(reports: &[JobReport]) -> bool {
    let mut all_ok = true;
    for report in reports {
        let mark = if report.success { "✅" } else { "❌" };
        let mode = if report.dry_run { " [dry-run]" } else { "" };
        println!(
            "{mark} {}{mode}: {} ({} affected, {}ms)",
            report.job_name, report.message, report.affected, report.duration_ms
        );
        all_ok &= report.success;
    }
    all_ok
}

/// Interactive confirmation for the bankroll reset
pub fn confirm_reset() -> bool {
    print!("This resets EVERY bankroll and cannot be undone. Type 'yes' to continue: ");
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    answer.trim().eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["sidepot", "settle-games", "--dry-run", "--limit", "50"]);
        assert!(cli.dry_run);
        assert_eq!(cli.limit, Some(50));
        assert_eq!(cli.command.job_name(), Some("settle-games"));
    }

    #[test]
    fn test_job_names_match_registry() {
        let scheduler = Scheduler::with_default_jobs();
        let registry: Vec<&str> = scheduler.jobs().iter().map(|j| j.name()).collect();

        for cmd in [
            Commands::Expire,
            Commands::SettleGames,
            Commands::UpdateOdds,
            Commands::Badges,
            Commands::Stats,
            Commands::Cleanup,
            Commands::MediaCleanup,
            Commands::ResetBankrolls { force: true },
        ] {
            let name = cmd.job_name().expect("job subcommand");
            assert!(registry.contains(&name), "{name} missing from registry");
        }
    }
}
