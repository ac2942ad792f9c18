//! User-facing reply texts.

use chrono::NaiveDate;
use duebot_core::types::{Task, TaskButton};

use crate::commands::done_callback;

pub const ADD_USAGE: &str = "Usage: /add YYYY-MM-DD task text";
pub const BAD_DATE: &str = "Invalid date format. Use YYYY-MM-DD.";
pub const NO_TASKS: &str = "You have no tasks for today!";
pub const TASKS_HEADER: &str = "Tasks for today:";
pub const TASK_NOT_FOUND: &str = "Error: task not found.";
pub const AI_DISABLED: &str = "AI is not configured (no API key).";
pub const ASK_USAGE: &str = "Write your question after /ask";
pub const AI_FAILED: &str = "AI request failed, try again later.";
pub const UNKNOWN_COMMAND: &str = "Unknown command. Send /help to see what I can do.";

pub fn help(ai_enabled: bool) -> String {
    let mut text = String::from(
        "Hi! I'm your task secretary.\n\n\
         • /add <YYYY-MM-DD> <task text> - add a task.\n\
         • /tasks - show today's tasks.\n",
    );
    if ai_enabled {
        text.push_str("• /ask <question> - ask the AI.\n");
    } else {
        text.push_str("• /ask <question> - ask the AI (needs an API key).\n");
    }
    text.push_str("Every morning I'll remind you about unfinished tasks!");
    text
}

pub fn task_added(text: &str, date: NaiveDate) -> String {
    format!("Task added: {text} on {date}")
}

pub fn task_done(text: &str) -> String {
    format!("Task done: {text}")
}

/// One "mark done" button per pending task.
pub fn task_buttons(tasks: &[Task]) -> Vec<TaskButton> {
    tasks
        .iter()
        .map(|t| TaskButton {
            label: format!("✅ {} (due {})", t.text, t.date),
            callback_data: done_callback(t.id),
        })
        .collect()
}
