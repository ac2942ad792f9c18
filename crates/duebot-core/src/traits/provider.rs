//! AI provider trait used by `/ask`.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// Send a single question and return the answer text.
    async fn ask(&self, question: &str) -> Result<String>;
}
