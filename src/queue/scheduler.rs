use crate::queue::TaskQueue;
use crate::state::{Task, TaskId};
use crate::CrawlError;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// A deferred task waiting for its dispatch time
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub task: Task,
    pub when: DateTime<Utc>,
}

/// Holds deferred tasks and promotes them into a `TaskQueue` when due
///
/// A background loop (`run`) wakes every tick and dispatches every task
/// whose time has come, so a task due at T reaches the queue at the first
/// tick at or after T.
pub struct TaskScheduler {
    queue: Arc<TaskQueue>,
    next_id: AtomicU64,
    scheduled: Mutex<BTreeMap<TaskId, ScheduledTask>>,
    tick: Duration,
}

impl TaskScheduler {
    /// Creates a scheduler feeding `queue`
    ///
    /// # Returns
    ///
    /// * `Ok(TaskScheduler)` - Ready to accept tasks
    /// * `Err(CrawlError::Scheduler)` - `tick` is zero
    pub fn new(queue: Arc<TaskQueue>, tick: Duration) -> Result<Self, CrawlError> {
        if tick.is_zero() {
            return Err(CrawlError::Scheduler(
                "tick interval must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            queue,
            next_id: AtomicU64::new(1),
            scheduled: Mutex::new(BTreeMap::new()),
            tick,
        })
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Stores a task to be dispatched at `when`
    ///
    /// Ids come from a counter and are never reused, even after the task
    /// is cancelled or dispatched.
    pub fn schedule_task(&self, mut task: Task, when: DateTime<Utc>) -> TaskId {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        task.id = Some(id);
        task.schedule_time = Some(when);

        tracing::debug!("Scheduled task {} for {} at {}", id, task.url, when);
        self.lock_scheduled()
            .insert(id, ScheduledTask { id, task, when });
        id
    }

    /// Stores a task to be dispatched `delay` from now
    pub fn schedule_in(&self, task: Task, delay: Duration) -> Result<TaskId, CrawlError> {
        let delay = chrono::Duration::from_std(delay)
            .map_err(|e| CrawlError::Scheduler(format!("delay out of range: {}", e)))?;
        let when = Utc::now()
            .checked_add_signed(delay)
            .ok_or_else(|| CrawlError::Scheduler("dispatch time out of range".to_string()))?;
        Ok(self.schedule_task(task, when))
    }

    /// Removes a task that has not been dispatched yet
    ///
    /// Returns false for unknown ids and for tasks already dispatched.
    pub fn cancel_task(&self, id: TaskId) -> bool {
        let removed = self.lock_scheduled().remove(&id).is_some();
        if removed {
            tracing::debug!("Cancelled task {}", id);
        }
        removed
    }

    /// Tasks still waiting, in id order
    pub fn get_scheduled_tasks(&self) -> Vec<ScheduledTask> {
        self.lock_scheduled().values().cloned().collect()
    }

    /// Moves every task due at `now` into the queue
    ///
    /// Due tasks are pushed in order of dispatch time, then id. Returns how
    /// many were dispatched.
    pub fn dispatch_due(&self, now: DateTime<Utc>) -> usize {
        let mut scheduled = self.lock_scheduled();

        let mut due: Vec<(DateTime<Utc>, TaskId)> = scheduled
            .values()
            .filter(|entry| entry.when <= now)
            .map(|entry| (entry.when, entry.id))
            .collect();
        due.sort();

        for (_, id) in &due {
            if let Some(entry) = scheduled.remove(id) {
                tracing::info!("Dispatching task {} ({})", id, entry.task.url);
                self.queue.push_task(entry.task);
            }
        }

        due.len()
    }

    /// Dispatches due tasks every tick until `cancel` fires
    pub async fn run(&self, cancel: &CancellationToken) {
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!("Scheduler loop started (tick {:?})", self.tick);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.dispatch_due(Utc::now());
                }
            }
        }
        tracing::debug!(
            "Scheduler loop stopped with {} task(s) pending",
            self.lock_scheduled().len()
        );
    }

    fn lock_scheduled(&self) -> std::sync::MutexGuard<'_, BTreeMap<TaskId, ScheduledTask>> {
        self.scheduled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
