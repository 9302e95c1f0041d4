//! State module for crawl bookkeeping
//!
//! # Components
//!
//! - `RateState`: Per-domain throttling state owned by the rate limiter
//! - `Task` / `TaskId`: Units of crawl work moved through the queue and scheduler

mod rate_state;
mod task;

// Re-export main types
pub use rate_state::RateState;
pub use task::{Task, TaskId};
