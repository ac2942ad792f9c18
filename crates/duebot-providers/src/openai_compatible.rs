//! OpenAI-compatible chat completion provider.
//!
//! Sends one system prompt plus the user's question to `/chat/completions`
//! and returns the first choice. Works with any endpoint speaking the OpenAI
//! wire format; only the base URL and key differ.

use async_trait::async_trait;
use duebot_core::config::AiConfig;
use duebot_core::error::{DueBotError, Result};
use duebot_core::traits::Provider;
use serde_json::{Value, json};

pub struct OpenAiCompatibleProvider {
    /// Provider name, for logs ("openai" or "custom").
    name: String,
    api_key: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    base_url: String,
    model: String,
    system_prompt: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn from_config(config: &AiConfig) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let name = if base_url.contains("api.openai.com") {
            "openai"
        } else {
            "custom"
        };
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            name: name.to_string(),
            api_key: config.api_key.clone(),
            base_url,
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            client,
        }
    }

    fn request_body(&self, question: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": self.system_prompt },
                { "role": "user", "content": question },
            ],
        })
    }
}

/// Pull the first choice's content out of a completion response.
fn parse_answer(json: &Value) -> Result<String> {
    let choice = json["choices"]
        .get(0)
        .ok_or_else(|| DueBotError::Provider("No choices in response".into()))?;
    let content = choice["message"]["content"]
        .as_str()
        .ok_or_else(|| DueBotError::Provider("Choice has no message content".into()))?;
    Ok(content.trim().to_string())
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ask(&self, question: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(DueBotError::ApiKeyMissing(self.name.clone()));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request_body(question))
            .send()
            .await
            .map_err(|e| {
                DueBotError::Http(format!("{} connection failed ({}): {}", self.name, url, e))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(DueBotError::Provider(format!(
                "{} API error {}: {}",
                self.name, status, text
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| DueBotError::Http(e.to_string()))?;

        let answer = parse_answer(&json)?;
        tracing::debug!("{} answered with {} chars", self.name, answer.len());
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(base_url: &str) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::from_config(&AiConfig {
            api_key: "sk-test".into(),
            base_url: base_url.into(),
            ..AiConfig::default()
        })
    }

    #[test]
    fn test_name_and_trailing_slash() {
        let p = provider("https://api.openai.com/v1/");
        assert_eq!(p.name(), "openai");
        assert_eq!(p.base_url, "https://api.openai.com/v1");

        assert_eq!(provider("http://localhost:11434/v1").name(), "custom");
    }

    #[test]
    fn test_request_body_has_system_then_user() {
        let body = provider("https://api.openai.com/v1").request_body("What is Rust?");
        assert_eq!(body["model"], "gpt-3.5-turbo");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "You are a helpful assistant.");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "What is Rust?");
    }

    #[test]
    fn test_parse_answer_trims_first_choice() {
        let json = json!({
            "choices": [
                { "message": { "role": "assistant", "content": "  A language.\n" } },
                { "message": { "role": "assistant", "content": "ignored" } }
            ]
        });
        assert_eq!(parse_answer(&json).unwrap(), "A language.");
    }

    #[test]
    fn test_parse_answer_without_choices_fails() {
        assert!(matches!(
            parse_answer(&json!({ "choices": [] })),
            Err(DueBotError::Provider(_))
        ));
        assert!(parse_answer(&json!({ "error": "nope" })).is_err());
    }
}
