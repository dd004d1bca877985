//! A cooperative scheduler for polite, multi-site web scraping.
//!
//! Runs one registered operation per authority (domain) on its own OS
//! thread, interleaving them under the Scheduler's control so that no two
//! operations' user code ever runs concurrently, while a bounded
//! [`pool::ThreadPool`] performs the actual blocking collaborator calls
//! (typically HTTP requests) off to the side. A per-domain
//! [`delay::AdaptiveDelay`] keeps presented load on each remote server under
//! a configured ceiling, and [`planner::DateRangePlanner`] decides which
//! date ranges are due for a recheck on any given day.

pub mod authority;
pub mod client;
pub mod config;
pub mod delay;
pub mod planner;
pub mod pool;
pub mod registry;
pub mod scheduler;
pub mod worker;

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors, kept separate so `config::load_config`
/// can return a narrower type than the crate-wide [`SchedulerError`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;

pub use authority::Authority;
pub use scheduler::{Scheduler, SchedulerConfig};
pub use worker::{OperationError, OperationHandle, UserBlock};
