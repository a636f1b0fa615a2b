use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub badges: BadgeConfig,
    #[serde(default)]
    pub odds: OddsConfig,
    #[serde(default)]
    pub bankroll: BankrollConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

/// Content lifecycle tuning
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    /// Hours after the linked game's start time before a pick post expires
    #[serde(default = "default_pick_ttl_hours")]
    pub pick_ttl_hours: i64,
    /// Hours after creation before a chat message expires
    #[serde(default = "default_message_ttl_hours")]
    pub message_ttl_hours: i64,
    /// Days a soft-deleted row is retained before hard deletion
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

fn default_pick_ttl_hours() -> i64 {
    24
}

fn default_message_ttl_hours() -> i64 {
    48
}

fn default_retention_days() -> i64 {
    30
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            pick_ttl_hours: default_pick_ttl_hours(),
            message_ttl_hours: default_message_ttl_hours(),
            retention_days: default_retention_days(),
        }
    }
}

/// Badge calculation tuning
#[derive(Debug, Clone, Deserialize)]
pub struct BadgeConfig {
    /// Trailing window (days) of settled bets considered per run
    #[serde(default = "default_window_days")]
    pub window_days: i64,
}

fn default_window_days() -> i64 {
    7
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
        }
    }
}

/// Odds simulation tuning
#[derive(Debug, Clone, Deserialize)]
pub struct OddsConfig {
    /// Maximum upcoming games to touch per run (0 = unlimited)
    #[serde(default = "default_max_games_per_run")]
    pub max_games_per_run: i64,
}

fn default_max_games_per_run() -> i64 {
    200
}

impl Default for OddsConfig {
    fn default() -> Self {
        Self {
            max_games_per_run: default_max_games_per_run(),
        }
    }
}

/// Bankroll reset tuning
#[derive(Debug, Clone, Deserialize)]
pub struct BankrollConfig {
    /// Balance (minor currency units) every bankroll is reset to
    #[serde(default = "default_starting_balance")]
    pub starting_balance: i64,
}

fn default_starting_balance() -> i64 {
    100_000 // $1,000.00
}

impl Default for BankrollConfig {
    fn default() -> Self {
        Self {
            starting_balance: default_starting_balance(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (overridden by RUST_LOG)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment.
    ///
    /// Environment variables use the `SIDEPOT_` prefix with `__` as the
    /// nesting separator, e.g. `SIDEPOT_DATABASE__URL`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        } else {
            builder = builder.add_source(File::with_name("config/default").required(false));
        }

        // prefix_separator stays a single underscore: setting separator()
        // alone would silently require SIDEPOT__DATABASE__URL
        builder = builder.add_source(
            Environment::with_prefix("SIDEPOT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let lifecycle = LifecycleConfig::default();
        assert_eq!(lifecycle.pick_ttl_hours, 24);
        assert_eq!(lifecycle.message_ttl_hours, 48);
        assert_eq!(lifecycle.retention_days, 30);

        let badges = BadgeConfig::default();
        assert_eq!(badges.window_days, 7);

        let bankroll = BankrollConfig::default();
        assert_eq!(bankroll.starting_balance, 100_000);
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("SIDEPOT_DATABASE__URL", "postgres://localhost/sidepot_test");
        std::env::set_var("SIDEPOT_BADGES__WINDOW_DAYS", "14");

        let cfg = AppConfig::load(None).expect("config should load from env");
        assert_eq!(cfg.database.url, "postgres://localhost/sidepot_test");
        assert_eq!(cfg.badges.window_days, 14);

        std::env::remove_var("SIDEPOT_DATABASE__URL");
        std::env::remove_var("SIDEPOT_BADGES__WINDOW_DAYS");
    }
}
