use thiserror::Error;

/// Main error type for the job runner
#[derive(Error, Debug)]
pub enum SidepotError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Domain errors
    #[error("Invalid bet details: {0}")]
    InvalidBetDetails(String),

    #[error("Game not settleable: {0}")]
    GameNotSettleable(String),

    #[error("Unknown bet type: {0}")]
    UnknownBetType(String),

    #[error("Unknown sport: {0}")]
    UnknownSport(String),

    // Scheduling errors
    #[error("Invalid schedule expression: {0}")]
    InvalidSchedule(String),

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Job '{job}' timed out after {timeout_secs}s")]
    JobTimeout { job: String, timeout_secs: u64 },

    #[error("Job '{job}' failed: {reason}")]
    JobFailed { job: String, reason: String },
}

pub type Result<T> = std::result::Result<T, SidepotError>;
