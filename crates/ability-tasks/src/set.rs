//! Groups of tasks that end together.

use std::sync::Arc;

use ability_tasks_core::logging::targets;
use parking_lot::Mutex;

use crate::task::{AsyncTask, TaskState};

/// The tasks started by one ability.
///
/// Dropping the set cancels every task still in it.
#[derive(Default)]
pub struct TaskSet {
    tasks: Mutex<Vec<Arc<dyn AsyncTask>>>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a task. It is not activated.
    pub fn add(&self, task: Arc<dyn AsyncTask>) {
        self.tasks.lock().push(task);
    }

    /// Activate a task and track it.
    pub fn activate<T: AsyncTask>(&self, task: &Arc<T>) {
        task.activate();
        self.add(task.clone());
    }

    /// Cancel and forget every tracked task.
    pub fn cancel_all(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        if tasks.is_empty() {
            return;
        }
        tracing::debug!(target: targets::TASK, count = tasks.len(), "cancelling task set");
        for task in tasks {
            task.cancel();
        }
    }

    /// Forget tasks that have ended. Returns how many were removed.
    pub fn prune_ended(&self) -> usize {
        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|task| task.state() != TaskState::Ended);
        before - tasks.len()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

impl Drop for TaskSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
