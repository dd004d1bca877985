//! Configuration
//!
//! Loads a TOML file into [`Config`], then layers the `MORPH_*` environment
//! variables from spec.md §6 on top via [`apply_env_overrides`], mirroring
//! the teacher's "load, then validate" two-step in `load_config_with_hash`.
//!
//! ```no_run
//! use scraper_sched::config::{apply_env_overrides, load_config};
//! use std::path::Path;
//!
//! let mut config = load_config(Path::new("config.toml")).unwrap();
//! let overrides = apply_env_overrides(&mut config).unwrap();
//! ```

mod env;
mod parser;
mod types;
mod validation;

pub use env::{apply_env_overrides, substitute_today, RunOverrides};
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{ClientConfig, Config, DelayConfig, PlannerConfig, PoolConfig, UserAgentConfig};
pub use validation::validate_proxy_url;
