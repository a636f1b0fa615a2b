use anyhow::Context;
use clap::Parser;
use sidepot::adapters::PostgresStore;
use sidepot::cli::{self, Cli, Commands};
use sidepot::config::AppConfig;
use sidepot::jobs::{JobContext, Scheduler};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let scheduler = Scheduler::with_default_jobs();

    // The schedule table needs neither config nor a database
    if matches!(cli.command, Commands::Schedule) {
        cli::print_schedule(&scheduler);
        return Ok(());
    }

    // Fail fast on configuration before touching anything
    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;

    let store = PostgresStore::new(&config.database.url, config.database.max_connections)
        .await
        .context("connecting to database")?;
    store.migrate().await.context("running migrations")?;

    let executed_by = if matches!(cli.command, Commands::Daemon) {
        "scheduler"
    } else {
        "cli"
    };
    let ctx = JobContext {
        store,
        config,
        dry_run: cli.dry_run,
        limit: cli.limit,
        executed_by: executed_by.to_string(),
    };

    let reports = match &cli.command {
        Commands::Daemon => {
            scheduler.run_forever(&ctx).await?;
            return Ok(());
        }
        Commands::All => scheduler.run_once(&ctx, None).await?,
        Commands::ResetBankrolls { force } => {
            if !force && !cli.dry_run && !cli::confirm_reset() {
                println!("Aborted.");
                std::process::exit(1);
            }
            scheduler.run_once(&ctx, Some("reset-bankrolls")).await?
        }
        other => {
            let name = other
                .job_name()
                .expect("every remaining subcommand maps to a job");
            scheduler.run_once(&ctx, Some(name)).await?
        }
    };

    if !cli::print_reports(&reports) {
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "sidepot=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
