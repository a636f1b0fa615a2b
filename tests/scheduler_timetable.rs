//! Drive the schedule gates across a simulated week of minute ticks and
//! check every job fires exactly as often as its schedule promises.

use std::collections::HashMap;

use sidepot::jobs::Scheduler;

#[test]
fn weekly_tick_counts_match_schedules() {
    let scheduler = Scheduler::with_default_jobs();
    let mut runs: HashMap<&str, u32> = HashMap::new();

    // One full week, Monday 00:00 through Sunday 23:59
    for day in 0u32..7 {
        for hour in 0u32..24 {
            for minute in 0u32..60 {
                for job in scheduler.jobs() {
                    if job.schedule().is_due(minute, hour, day) {
                        *runs.entry(job.name()).or_default() += 1;
                    }
                }
            }
        }
    }

    assert_eq!(runs["expire-content"], 7 * 24); // hourly
    assert_eq!(runs["settle-games"], 7 * 24 * 2); // every 30 minutes
    assert_eq!(runs["update-odds"], 7 * 24 * 2);
    assert_eq!(runs["calculate-badges"], 7 * 24);
    assert_eq!(runs["stats-rollup"], 7 * 24);
    assert_eq!(runs["reset-bankrolls"], 1); // Monday 00:00 only
    assert_eq!(runs["db-cleanup"], 7); // daily 03:00
    assert_eq!(runs["media-cleanup"], 7); // daily 04:00
}

#[test]
fn nothing_runs_off_the_minute_grid_jobs_expect() {
    let scheduler = Scheduler::with_default_jobs();

    // 12:17 on a Wednesday: no schedule in the registry matches
    let due: Vec<&str> = scheduler
        .jobs()
        .iter()
        .filter(|j| j.schedule().is_due(17, 12, 2))
        .map(|j| j.name())
        .collect();
    assert!(due.is_empty(), "unexpected due jobs: {due:?}");
}
