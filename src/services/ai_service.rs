use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::error::{Error, Result};

/// Opaque text-in/text-out generation service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

#[derive(Clone)]
pub struct OpenAiTextGenerator {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAiTextGenerator {
    pub fn new(api_key: String, model: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiTextGenerator {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let payload = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.2
        });

        let res = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(Duration::from_secs(120))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::TextGeneration(format!(
                "OpenAI API Error {}: {}",
                status, text
            )));
        }

        let body: JsonValue = res.json().await?;
        message_content(&body)
            .map(str::to_string)
            .ok_or_else(|| Error::TextGeneration("Invalid OpenAI response format".to_string()))
    }
}

fn message_content(body: &JsonValue) -> Option<&str> {
    body.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
}
