pub mod postgres;

pub use postgres::{CleanupTable, JobExecutionRecord, PostgresStore};
