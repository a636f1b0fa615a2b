pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod jobs;

pub use config::AppConfig;
pub use error::{Result, SidepotError};
