//! Chat command and button-callback parsing.

use chrono::NaiveDate;
use duebot_core::error::{DueBotError, Result};

/// A recognised `/command`. Arguments are kept raw; handlers validate them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// `/add <date> <text...>`, whitespace-split.
    Add(Vec<String>),
    Tasks,
    /// `/ask <question...>`, words rejoined with single spaces.
    Ask(String),
    Unknown(String),
}

/// Parse a message. Returns `None` for text that is not a command.
pub fn parse(text: &str) -> Option<Command> {
    let mut words = text.split_whitespace();
    let head = words.next()?.strip_prefix('/')?;
    // `/add@DueBot` in group chats.
    let name = head.split('@').next().unwrap_or(head).to_lowercase();
    if name.is_empty() {
        return None;
    }
    let args: Vec<String> = words.map(str::to_string).collect();

    Some(match name.as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "add" => Command::Add(args),
        "tasks" => Command::Tasks,
        "ask" => Command::Ask(args.join(" ")),
        _ => Command::Unknown(name),
    })
}

/// Parse exactly `YYYY-MM-DD`: four digits, dash, two digits, dash, two
/// digits, forming a real calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let invalid = || DueBotError::InvalidDate(s.to_string());
    let bytes = s.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| if i == 4 || i == 7 { *b == b'-' } else { b.is_ascii_digit() });
    if !shape_ok {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| invalid())
}

/// Callback data prefix for "mark done" buttons.
pub const DONE_PREFIX: &str = "done_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Done(u64),
    /// Has the `done_` prefix but no usable id.
    Malformed,
}

pub fn done_callback(id: u64) -> String {
    format!("{DONE_PREFIX}{id}")
}

/// Parse button data. `None` means the data is not ours.
pub fn parse_callback(data: &str) -> Option<CallbackAction> {
    let rest = data.strip_prefix(DONE_PREFIX)?;
    Some(match rest.parse::<u64>() {
        Ok(id) => CallbackAction::Done(id),
        Err(_) => CallbackAction::Malformed,
    })
}
