//! OpenAI-compatible chat completions provider.
//!
//! Feedback and summaries are requested as structured outputs via a JSON
//! schema response format. When the model returns text that does not parse
//! against the schema, the raw text becomes the primary feedback field
//! instead of being discarded.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::llm::provider::{CoachModel, Feedback, FeedbackSummary};

const PROVIDER: &str = "openai";

/// Production `CoachModel` speaking the chat completions API.
pub struct OpenAiCoach {
    client: Client,
    config: LlmConfig,
}

impl OpenAiCoach {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        if config.api_key.expose_secret().is_empty() {
            return Err(LlmError::AuthFailed {
                provider: PROVIDER.to_string(),
            });
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self { client, config })
    }

    fn api_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Send one completion request and return the first choice's content.
    async fn send_request(&self, body: &ChatCompletionRequest) -> Result<String, LlmError> {
        let url = self.api_url();

        tracing::debug!(model = %body.model, "sending chat completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key.expose_secret()))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let response_text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            if status.as_u16() == 401 {
                return Err(LlmError::AuthFailed {
                    provider: PROVIDER.to_string(),
                });
            }
            if status.as_u16() == 429 {
                return Err(LlmError::RateLimited {
                    provider: PROVIDER.to_string(),
                });
            }
            return Err(LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("HTTP {}: {}", status, response_text),
            });
        }

        let resp: ChatCompletionResponse =
            serde_json::from_str(&response_text).map_err(|e| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: format!("JSON parse error: {}", e),
            })?;

        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "no choices in response".to_string(),
            })?;

        Ok(choice.message.content.unwrap_or_default())
    }

    fn request(&self, user_content: String, format: ResponseFormat) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatCompletionMessage::system(self.config.system_prompt.clone()),
                ChatCompletionMessage::user(user_content),
            ],
            response_format: Some(format),
        }
    }
}

#[async_trait]
impl CoachModel for OpenAiCoach {
    async fn feedback(
        &self,
        code: &str,
        thoughts: &str,
        statement: &str,
    ) -> Result<Feedback, LlmError> {
        let user_content = format!(
            "Problem statement:\n{}\n\nMy code:\n{}\n\nMy thoughts:\n{}\n",
            statement, code, thoughts
        );
        let request = self.request(
            user_content,
            ResponseFormat::json_schema("coach_feedback", feedback_schema()),
        );
        let raw = self.send_request(&request).await?;
        Ok(parse_feedback(raw))
    }

    async fn summarize(
        &self,
        statement: &str,
        feedbacks: &[String],
        proofs: &[String],
        meta_cognition: &[String],
    ) -> Result<FeedbackSummary, LlmError> {
        let mut prompt = format!("Problem statement:\n{}\n\n", statement);
        push_section(&mut prompt, "Feedback history", feedbacks);
        push_section(&mut prompt, "Proofs", proofs);
        push_section(&mut prompt, "Meta-cognition notes", meta_cognition);
        prompt.push_str("Condense the history above into one consolidated review.\n");

        let request = self.request(
            prompt,
            ResponseFormat::json_schema("coach_summary", summary_schema()),
        );
        let raw = self.send_request(&request).await?;
        Ok(parse_summary(raw))
    }
}

fn push_section(prompt: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    prompt.push_str(title);
    prompt.push_str(":\n");
    for (i, item) in items.iter().enumerate() {
        prompt.push_str(&format!("Entry #{}:\n{}\n\n", i + 1, item));
    }
}

fn parse_feedback(raw: String) -> Feedback {
    match serde_json::from_str(&raw) {
        Ok(feedback) => feedback,
        Err(e) => {
            tracing::warn!("feedback output failed schema validation, keeping raw text: {}", e);
            Feedback {
                feedback: raw,
                ..Feedback::default()
            }
        }
    }
}

fn parse_summary(raw: String) -> FeedbackSummary {
    match serde_json::from_str(&raw) {
        Ok(summary) => summary,
        Err(e) => {
            tracing::warn!("summary output failed schema validation, keeping raw text: {}", e);
            FeedbackSummary {
                feedback: raw,
                ..FeedbackSummary::default()
            }
        }
    }
}

fn feedback_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["feedback", "suggestions", "proofs", "meta_cognition"],
        "properties": {
            "feedback": {
                "type": "string",
                "description": "Assessment of the quality of the thinking process"
            },
            "suggestions": {
                "type": "array",
                "items": { "type": "string" },
                "description": "How the code and thinking should improve in this situation"
            },
            "proofs": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Proof obligations for every step of the approach"
            },
            "meta_cognition": {
                "type": "array",
                "items": { "type": "string" },
                "description": "What a top competitor would be thinking in this situation"
            }
        }
    })
}

fn summary_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["feedback", "proof", "meta_cognition"],
        "properties": {
            "feedback": { "type": "string" },
            "proof": { "type": "string" },
            "meta_cognition": { "type": "string" }
        }
    })
}

// Chat completions wire types.

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatCompletionMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionMessage {
    role: String,
    content: String,
}

impl ChatCompletionMessage {
    fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: String,
    strict: bool,
    schema: serde_json::Value,
}

impl ResponseFormat {
    fn json_schema(name: &str, schema: serde_json::Value) -> Self {
        Self {
            format_type: "json_schema".to_string(),
            json_schema: JsonSchemaFormat {
                name: name.to_string(),
                strict: true,
                schema,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponseMessage {
    content: Option<String>,
}
