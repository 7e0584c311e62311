//! docqa-llm: Text generation providers.
//!
//! The answerer and the memory extractor both depend on an external,
//! non-deterministic model service. This crate keeps that dependency
//! behind a narrow trait so deterministic fakes can be substituted in
//! tests.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

/// Wall-clock budget for a single generation request. A timed-out call
/// surfaces as an error, never as text.
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Trait for generating text from a system + user prompt pair.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider identifier.
    fn id(&self) -> &str;
    /// Model name.
    fn model(&self) -> &str;
    /// Generate a completion for the given prompts.
    async fn generate(&self, system: &str, user: &str) -> Result<String>;
}

/// OpenAI chat-completions generation provider.
pub struct OpenAiGeneration {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiGeneration {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: "gpt-4o-mini".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_model(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl GenerationProvider for OpenAiGeneration {
    fn id(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ],
            "temperature": 0,
        });

        let resp = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(GENERATION_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let json: serde_json::Value = resp.json().await?;

        if !status.is_success() {
            let msg = json
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown error");
            return Err(anyhow::anyhow!("OpenAI generation error: {msg}"));
        }

        let content = json
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| anyhow::anyhow!("Missing completion content"))?;

        Ok(content.trim().to_string())
    }
}

/// Auto-select a generation provider based on available API keys.
pub fn auto_select_provider(model: Option<String>) -> Option<Box<dyn GenerationProvider>> {
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        return Some(match model {
            Some(model) => Box::new(OpenAiGeneration::with_model(key, model)),
            None => Box::new(OpenAiGeneration::new(key)),
        });
    }
    // Add more providers here as they are implemented
    None
}
