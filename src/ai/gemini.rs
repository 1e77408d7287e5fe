#![forbid(unsafe_code)]

//! Gemini `generateContent` client with a JSON response schema.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::ai::schema::{build_prompt, parse_tasks, response_schema};
use crate::ai::{GenerationError, GeneratedTask, TaskGenerator};
use crate::config::AiConfig;
use crate::error::TodogenError;

pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f64,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn from_config(cfg: &AiConfig, api_key: String) -> Result<Self, TodogenError> {
        let mut builder = Client::builder();
        if cfg.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(cfg.request_timeout_secs));
        }
        let http = builder
            .build()
            .map_err(|e| TodogenError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            model: cfg.model.clone(),
            api_key,
            temperature: cfg.temperature,
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Request text from the service, without interpreting it yet.
    async fn request_text(&self, goal: &str) -> Result<String, GenerationError> {
        let body = build_request_body(goal, self.temperature);
        tracing::debug!(url = %self.endpoint(), "sending generateContent request");

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::service(format!("request timeout: {e}"))
                } else if e.is_connect() {
                    GenerationError::service(format!("connection failed: {e}"))
                } else {
                    GenerationError::service(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| GenerationError::service(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(GenerationError::service(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate(&raw, 500)
            )));
        }

        if raw.trim().is_empty() {
            return Err(GenerationError::empty_response());
        }

        let envelope: GenerateContentResponse = serde_json::from_str(&raw).map_err(|e| {
            GenerationError::malformed(format!("unreadable service envelope: {e}"))
        })?;
        if let Some(reason) = envelope
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            tracing::warn!(reason, "prompt was blocked by the service");
        }
        Ok(envelope.text())
    }
}

#[async_trait]
impl TaskGenerator for GeminiClient {
    #[tracing::instrument(skip(self, goal), fields(model = %self.model))]
    async fn generate(&self, goal: &str) -> Result<Vec<GeneratedTask>, GenerationError> {
        let result = match self.request_text(goal).await {
            Ok(text) => parse_tasks(&text),
            Err(e) => Err(e),
        };
        match &result {
            Ok(tasks) => tracing::info!(count = tasks.len(), "generated tasks"),
            Err(e) => tracing::error!(kind = ?e.kind, detail = %e.detail, "task generation failed"),
        }
        result
    }
}

/// `generateContent` body asking for schema-constrained JSON.
#[must_use]
pub fn build_request_body(goal: &str, temperature: f64) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": build_prompt(goal) }]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema(),
            "temperature": temperature
        }
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate; empty if there is none.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

fn truncate(s: &str, max: usize) -> String {
    let mut out: String = s.chars().take(max).collect();
    if s.chars().count() > max {
        out.push_str("...");
    }
    out
}
