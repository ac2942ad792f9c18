//! Reminder engine: the task book plus its optional store.
//! Every mutation is written through to disk when a store is attached.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use duebot_core::types::{Task, UserId};
use tokio::sync::Mutex;

use crate::book::{SweepReport, TaskBook};
use crate::store::TaskStore;

/// The engine as shared between handlers and the digest loop.
pub type SharedEngine = Arc<Mutex<ReminderEngine>>;

pub struct ReminderEngine {
    book: TaskBook,
    store: Option<TaskStore>,
    retain_done_days: u32,
}

impl ReminderEngine {
    /// Memory-only engine; tasks are lost on restart.
    pub fn in_memory() -> Self {
        Self {
            book: TaskBook::new(),
            store: None,
            retain_done_days: 0,
        }
    }

    /// Engine backed by `store`, loading whatever it already holds.
    pub fn with_store(store: TaskStore) -> Self {
        let book = store.load();
        tracing::info!(
            "Loaded {} tasks for {} users from {}",
            book.task_count(),
            book.users().len(),
            store.path().display()
        );
        Self {
            book,
            store: Some(store),
            retain_done_days: 0,
        }
    }

    pub fn retain_done_days(mut self, days: u32) -> Self {
        self.retain_done_days = days;
        self
    }

    pub fn into_shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }

    pub fn add_task(&mut self, user: UserId, text: &str, date: NaiveDate) -> Task {
        let task = self.book.add(user, text, date);
        tracing::info!("Task added for {user}: #{} '{}' on {}", task.id, task.text, task.date);
        self.save();
        task
    }

    pub fn pending(&self, user: UserId, today: NaiveDate) -> Vec<Task> {
        self.book.pending(user, today)
    }

    pub fn mark_done(&mut self, user: UserId, id: u64) -> Option<Task> {
        let task = self.book.mark_done(user, id)?;
        tracing::info!("Task done for {user}: #{} '{}'", task.id, task.text);
        self.save();
        Some(task)
    }

    pub fn users(&self) -> Vec<UserId> {
        self.book.users()
    }

    pub fn book(&self) -> &TaskBook {
        &self.book
    }

    /// Daily maintenance pass; saves only if something changed.
    pub fn sweep(&mut self, today: NaiveDate, now: DateTime<Utc>) -> SweepReport {
        let report = self.book.sweep(today, now, self.retain_done_days);
        if report != SweepReport::default() {
            self.save();
        }
        report
    }

    fn save(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.book) {
                tracing::warn!("Failed to save tasks: {e}");
            }
        }
    }
}

impl Default for ReminderEngine {
    fn default() -> Self {
        Self::in_memory()
    }
}
