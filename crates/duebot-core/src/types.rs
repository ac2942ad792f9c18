//! Shared data types: tasks and transport-neutral chat events.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Telegram user ids and chat ids are both 64-bit integers.
pub type UserId = i64;
pub type ChatId = i64;

/// A user-entered reminder with a due date and completion flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Per-user id, never reused once assigned.
    pub id: u64,
    pub text: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub done: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub done_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(id: u64, text: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id,
            text: text.into(),
            date,
            done: false,
            created_at: Utc::now(),
            done_at: None,
        }
    }

    /// Not done and due on or before `today`.
    pub fn is_pending(&self, today: NaiveDate) -> bool {
        !self.done && self.date <= today
    }

    /// Not done and due strictly before `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.done && self.date < today
    }

    pub fn mark_done(&mut self) {
        if !self.done {
            self.done = true;
            self.done_at = Some(Utc::now());
        }
    }
}

/// An event received from the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// A text message (command or plain text).
    Message {
        user_id: UserId,
        chat_id: ChatId,
        text: String,
    },
    /// An inline keyboard button press.
    Callback {
        query_id: String,
        user_id: UserId,
        chat_id: Option<ChatId>,
        message_id: Option<i64>,
        data: String,
    },
}

impl Incoming {
    pub fn user_id(&self) -> UserId {
        match self {
            Self::Message { user_id, .. } | Self::Callback { user_id, .. } => *user_id,
        }
    }
}

/// One inline keyboard button, rendered one per row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskButton {
    pub label: String,
    pub callback_data: String,
}
