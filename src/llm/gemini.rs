//! Google Gemini chat backend
//!
//! SECURITY: API keys are ONLY sent to official Google endpoints.
//! The credential is never sent to any third-party service.

use super::{
    Attachment, ChatBackend, Conversation, LlmError, Message, Role, SessionResetError,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Official Google Gemini API endpoint
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: usize,
    conversation: Conversation,
}

impl GeminiBackend {
    pub fn new(api_key: &str) -> Result<Self, LlmError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(LlmError::InvalidCredential(
                "Gemini API key is empty".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: "gemini-1.5-flash".to_string(),
            max_tokens: 8192,
            conversation: Conversation::new(),
        })
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, turn: &str) -> GeminiRequest {
        let mut contents: Vec<GeminiContent> = self
            .conversation
            .history()
            .iter()
            .map(GeminiContent::from)
            .collect();
        contents.push(GeminiContent::from(&Message::user(turn)));

        GeminiRequest {
            contents,
            system_instruction: self.conversation.attachment_context().map(|text| {
                GeminiSystemInstruction {
                    parts: vec![GeminiPart { text }],
                }
            }),
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: Some(self.max_tokens),
                temperature: Some(1.0),
            }),
        }
    }

    async fn send_request(&self, request: &GeminiRequest) -> Result<GeminiResponse, LlmError> {
        let url = format!("{}/{}:generateContent", GEMINI_API_BASE, self.model);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(LlmError::from_network_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_http_status(status, error_text));
        }

        response
            .json::<GeminiResponse>()
            .await
            .map_err(LlmError::from_network_error)
    }
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn reset(&mut self) -> Result<(), SessionResetError> {
        self.conversation.clear();
        Ok(())
    }

    fn attach_file(&mut self, path: &Path) -> Result<(), LlmError> {
        let attachment = Attachment::read(path)?;
        tracing::debug!("Attached {} to Gemini conversation", path.display());
        self.conversation.attach(attachment);
        Ok(())
    }

    async fn send(&mut self, turn: &str) -> Result<String, LlmError> {
        let request = self.build_request(turn);
        let response = self.send_request(&request).await?;

        if let Some(usage) = &response.usage_metadata {
            tracing::debug!(
                "Gemini usage: {} prompt + {} candidate tokens",
                usage.prompt_token_count,
                usage.candidates_token_count
            );
        }

        let reply = response.text();
        self.conversation.push(Message::user(turn));
        self.conversation.push(Message::model(reply.clone()));
        Ok(reply)
    }

    fn history(&self) -> &[Message] {
        self.conversation.history()
    }

    fn teardown(&mut self) {
        self.conversation.clear();
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

impl From<&Message> for GeminiContent {
    fn from(message: &Message) -> Self {
        let role = match message.role {
            Role::User => "user",
            Role::Model => "model",
        };
        Self {
            role: role.to_string(),
            parts: vec![GeminiPart {
                text: message.text.clone(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsageMetadata>,
}

impl GeminiResponse {
    /// Text of the first candidate, parts joined by newlines
    fn text(&self) -> String {
        self.candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiUsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
}
