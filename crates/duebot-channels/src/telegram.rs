//! Telegram Bot channel: long polling + message sending via Bot API.

use async_trait::async_trait;
use duebot_core::error::{DueBotError, Result};
use duebot_core::traits::Channel;
use duebot_core::types::{ChatId, Incoming, TaskButton};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// Telegram rejects message text longer than this many UTF-16 code units.
pub const MAX_MESSAGE_UTF16: usize = 4096;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Server-side long-poll wait for `getUpdates`, in seconds.
const LONG_POLL_SECS: u64 = 30;

/// Telegram Bot channel. Cheap to clone; clones share the HTTP connection pool.
#[derive(Clone)]
pub struct TelegramChannel {
    bot_token: String,
    api_base: String,
    poll_interval: u64,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: impl Into<String>, poll_interval: u64) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_base: DEFAULT_API_BASE.into(),
            poll_interval,
            client: reqwest::Client::new(),
        }
    }

    /// Point at a different Bot API server (e.g. a self-hosted one).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    /// POST a Bot API method and unwrap the `{ok, result, description}` envelope.
    async fn call<T: for<'de> Deserialize<'de>>(&self, method: &str, body: &Value) -> Result<T> {
        self.call_with_timeout(method, body, REQUEST_TIMEOUT).await
    }

    async fn call_with_timeout<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(&format!("Telegram {method} failed"), e))?;

        let envelope: TelegramApiResponse<T> = response
            .json()
            .await
            .map_err(|e| request_error(&format!("Invalid {method} response"), e))?;
        envelope.into_result(method)
    }

    /// Get updates using long polling, starting after `last_update_id`.
    pub async fn get_updates(&self, last_update_id: i64) -> Result<Vec<TelegramUpdate>> {
        let timeout = Duration::from_secs(LONG_POLL_SECS + 10);
        self.call_with_timeout("getUpdates", &get_updates_body(last_update_id), timeout).await
    }

    /// Get bot info.
    pub async fn get_me(&self) -> Result<TelegramUser> {
        self.call("getMe", &json!({})).await
    }

    /// Check the token and log which bot we are.
    pub async fn connect(&self) -> Result<TelegramUser> {
        let me = self.get_me().await?;
        tracing::info!(
            "Telegram bot: @{} ({})",
            me.username.as_deref().unwrap_or("unknown"),
            me.first_name
        );
        Ok(me)
    }

    /// Start polling loop: returns a stream of incoming events.
    pub fn start_polling(&self) -> TelegramPollingStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let channel = self.clone();

        tokio::spawn(async move {
            let mut last_update_id = 0_i64;
            tracing::info!("Telegram polling loop started");

            loop {
                match channel.get_updates(last_update_id).await {
                    Ok(updates) => {
                        let (last, events) = drain_batch(last_update_id, updates);
                        last_update_id = last;
                        for event in events {
                            if tx.send(event).is_err() {
                                tracing::info!("Telegram polling stopped (receiver dropped)");
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("Telegram polling error: {e}");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }

                tokio::time::sleep(Duration::from_secs(channel.poll_interval)).await;
            }
        });

        TelegramPollingStream { rx }
    }
}

/// reqwest errors print the request URL, and ours carries the bot token.
fn request_error(context: &str, e: reqwest::Error) -> DueBotError {
    DueBotError::Channel(format!("{context}: {}", e.without_url()))
}

fn get_updates_body(last_update_id: i64) -> Value {
    json!({
        "offset": last_update_id + 1,
        "timeout": LONG_POLL_SECS,
        "allowed_updates": ["message", "callback_query"],
    })
}

/// Advance the offset past every update in the batch, including ones that
/// `to_incoming` drops, and collect the events worth handling.
fn drain_batch(last_update_id: i64, updates: Vec<TelegramUpdate>) -> (i64, Vec<Incoming>) {
    let mut last = last_update_id;
    let mut events = Vec::with_capacity(updates.len());
    for update in updates {
        last = last.max(update.update_id);
        if let Some(event) = update.to_incoming() {
            events.push(event);
        }
    }
    (last, events)
}

/// Stream of incoming Telegram events from polling.
pub struct TelegramPollingStream {
    rx: tokio::sync::mpsc::UnboundedReceiver<Incoming>,
}

impl Stream for TelegramPollingStream {
    type Item = Incoming;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Split `text` into chunks of at most `limit` UTF-16 code units, never inside
/// a char. A chunk ends after its last newline when it has one.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text;
    loop {
        let mut units = 0;
        let mut end = rest.len();
        for (i, c) in rest.char_indices() {
            units += c.len_utf16();
            if units > limit {
                end = i;
                break;
            }
        }
        if end == rest.len() {
            chunks.push(rest.to_string());
            return chunks;
        }
        if end == 0 {
            // `limit` is smaller than the first char; emit it alone.
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let cut = match rest[..end].rfind('\n') {
            Some(nl) if nl > 0 => nl + 1,
            _ => end,
        };
        chunks.push(rest[..cut].to_string());
        rest = &rest[cut..];
        if rest.is_empty() {
            return chunks;
        }
    }
}

/// Build the `sendMessage` body. Buttons go one per row.
fn send_message_body(chat_id: ChatId, text: &str, buttons: &[TaskButton]) -> Value {
    let mut body = json!({
        "chat_id": chat_id,
        "text": text,
    });
    if !buttons.is_empty() {
        let rows: Vec<Value> = buttons
            .iter()
            .map(|b| json!([{ "text": b.label, "callback_data": b.callback_data }]))
            .collect();
        body["reply_markup"] = json!({ "inline_keyboard": rows });
    }
    body
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    /// Long text goes out as several messages; buttons ride on the last one.
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        buttons: &[TaskButton],
    ) -> Result<()> {
        let chunks = split_message(text, MAX_MESSAGE_UTF16);
        let last = chunks.len() - 1;
        for (i, chunk) in chunks.iter().enumerate() {
            let row_buttons: &[TaskButton] = if i == last { buttons } else { &[] };
            let body = send_message_body(chat_id, chunk, row_buttons);
            let _: Value = self.call("sendMessage", &body).await?;
        }
        Ok(())
    }

    async fn answer_callback(&self, query_id: &str) -> Result<()> {
        let _: Value = self
            .call("answerCallbackQuery", &json!({ "callback_query_id": query_id }))
            .await?;
        Ok(())
    }

    /// Edits cannot grow into several messages, so overlong text is cut.
    async fn edit_message(&self, chat_id: ChatId, message_id: i64, text: &str) -> Result<()> {
        let text = split_message(text, MAX_MESSAGE_UTF16)
            .into_iter()
            .next()
            .unwrap_or_default();
        let body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });
        let _: Value = self.call("editMessageText", &body).await?;
        Ok(())
    }
}

// --- Telegram API Types ---

#[derive(Debug, Deserialize)]
pub struct TelegramApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

impl<T> TelegramApiResponse<T> {
    fn into_result(self, method: &str) -> Result<T> {
        if !self.ok {
            return Err(DueBotError::Channel(format!(
                "Telegram {method} error: {}",
                self.description.unwrap_or_default()
            )));
        }
        self.result
            .ok_or_else(|| DueBotError::Channel(format!("Telegram {method}: empty result")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
    pub callback_query: Option<TelegramCallbackQuery>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
    pub date: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramCallbackQuery {
    pub id: String,
    pub from: TelegramUser,
    pub message: Option<TelegramMessage>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
}

impl TelegramUpdate {
    /// Convert to a transport-neutral event. Bot senders and non-text messages are dropped.
    pub fn to_incoming(&self) -> Option<Incoming> {
        if let Some(msg) = &self.message {
            let text = msg.text.as_ref()?;
            let from = msg.from.as_ref()?;
            if from.is_bot {
                return None;
            }
            return Some(Incoming::Message {
                user_id: from.id,
                chat_id: msg.chat.id,
                text: text.clone(),
            });
        }

        let query = self.callback_query.as_ref()?;
        if query.from.is_bot {
            return None;
        }
        Some(Incoming::Callback {
            query_id: query.id.clone(),
            user_id: query.from.id,
            chat_id: query.message.as_ref().map(|m| m.chat.id),
            message_id: query.message.as_ref().map(|m| m.message_id),
            data: query.data.clone().unwrap_or_default(),
        })
    }
}
