//! Chat transport trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatId, TaskButton};

/// Outbound side of a chat transport.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Send plain text, optionally with an inline keyboard (one button per row).
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        buttons: &[TaskButton],
    ) -> Result<()>;

    /// Acknowledge a button press so the client stops its spinner.
    async fn answer_callback(&self, query_id: &str) -> Result<()>;

    /// Replace the text of a message the bot sent earlier.
    async fn edit_message(&self, chat_id: ChatId, message_id: i64, text: &str) -> Result<()>;
}
