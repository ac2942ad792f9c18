//! In-memory task book: per-user ordered task lists with stable ids.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use duebot_core::types::{Task, UserId};
use serde::{Deserialize, Serialize};

/// One user's tasks, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserTasks {
    /// Next id to hand out. Only ever grows.
    pub next_id: u64,
    pub tasks: Vec<Task>,
}

/// What a sweep changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub promoted: usize,
    pub pruned: usize,
}

/// All users' tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskBook {
    users: BTreeMap<UserId, UserTasks>,
}

impl TaskBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task for `user`, creating the list on first use.
    pub fn add(&mut self, user: UserId, text: &str, date: NaiveDate) -> Task {
        let entry = self.users.entry(user).or_default();
        let task = Task::new(entry.next_id, text, date);
        entry.next_id += 1;
        entry.tasks.push(task.clone());
        task
    }

    /// Tasks that are not done and due on or before `today`, in list order.
    pub fn pending(&self, user: UserId, today: NaiveDate) -> Vec<Task> {
        self.users
            .get(&user)
            .map(|u| {
                u.tasks
                    .iter()
                    .filter(|t| t.is_pending(today))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Mark `id` done. Returns the task, or `None` if the user has no such task.
    /// Marking an already-done task is a no-op that still returns it.
    pub fn mark_done(&mut self, user: UserId, id: u64) -> Option<Task> {
        let task = self
            .users
            .get_mut(&user)?
            .tasks
            .iter_mut()
            .find(|t| t.id == id)?;
        task.mark_done();
        Some(task.clone())
    }

    pub fn tasks(&self, user: UserId) -> &[Task] {
        self.users
            .get(&user)
            .map(|u| u.tasks.as_slice())
            .unwrap_or_default()
    }

    /// Every user that has ever added a task.
    pub fn users(&self) -> Vec<UserId> {
        self.users.keys().copied().collect()
    }

    pub fn task_count(&self) -> usize {
        self.users.values().map(|u| u.tasks.len()).sum()
    }

    /// Move overdue unfinished tasks to `today`, then drop done tasks finished
    /// more than `retain_done_days` before `now` (0 keeps everything).
    pub fn sweep(
        &mut self,
        today: NaiveDate,
        now: DateTime<Utc>,
        retain_done_days: u32,
    ) -> SweepReport {
        let mut report = SweepReport::default();
        let cutoff =
            (retain_done_days > 0).then(|| now - Duration::days(i64::from(retain_done_days)));

        for user in self.users.values_mut() {
            for task in user.tasks.iter_mut() {
                if task.is_overdue(today) {
                    task.date = today;
                    report.promoted += 1;
                }
            }

            if let Some(cutoff) = cutoff {
                let before = user.tasks.len();
                user.tasks
                    .retain(|t| !(t.done && t.done_at.is_some_and(|at| at < cutoff)));
                report.pruned += before - user.tasks.len();
            }
        }
        report
    }
}
