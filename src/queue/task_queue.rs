use crate::state::Task;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Strict FIFO of tasks ready to run
///
/// Shared between producers and consumers as `Arc<TaskQueue>`.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: Mutex<VecDeque<Task>>,
    available: Notify,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a task and wakes one waiting consumer
    pub fn push_task(&self, task: Task) {
        tracing::trace!("Queued {}", task.url);
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(task);
        self.available.notify_one();
    }

    /// Removes the oldest task, suspending until one is available
    ///
    /// Cancel safe: dropping the future never loses a task.
    pub async fn pop_task(&self) -> Task {
        loop {
            if let Some(task) = self.try_pop_task() {
                return task;
            }
            self.available.notified().await;
        }
    }

    /// Like `pop_task`, but gives up with `None` once `cancel` fires
    pub async fn pop_task_or_cancel(&self, cancel: &CancellationToken) -> Option<Task> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            task = self.pop_task() => Some(task),
        }
    }

    /// Removes the oldest task without waiting
    pub fn try_pop_task(&self) -> Option<Task> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
