//! Configuration module
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use cadence_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("cadence.toml")).unwrap();
//! println!("Requests retry {} times", config.executor.max_retries);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CategoryEntry, Config, ExecutorConfig, OutputConfig, PaginationConfig, RateLimitEntry,
    SchedulerConfig, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
