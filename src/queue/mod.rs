//! Task queue and deferred-task scheduler
//!
//! # Components
//!
//! - `TaskQueue`: FIFO of immediate tasks; consumers suspend while it is empty
//! - `TaskScheduler`: time-indexed deferred tasks, promoted into the queue on a fixed tick

mod scheduler;
mod task_queue;

pub use scheduler::{ScheduledTask, TaskScheduler};
pub use task_queue::TaskQueue;
