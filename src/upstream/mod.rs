pub mod gemini;
pub mod mock;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// A raw reply from the upstream API. Any HTTP status lands here;
/// only transport failures are reported as `Err` by [`Upstream::send`].
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: String,
}

impl UpstreamReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The thing that actually talks to the generative API.
/// Could be Gemini over HTTPS or a test script.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Send one request. Single attempt, no retry.
    async fn send(&self, api_key: &str, payload: &UpstreamPayload) -> Result<UpstreamReply>;

    /// Model identifier, for logs and the banner.
    fn model(&self) -> &str;
}

// --- outbound payload ---

/// The `generateContent` request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamPayload {
    pub contents: Vec<Content>,
    pub system_instruction: Content,
    pub generation_config: GenerationConfig,
}

impl UpstreamPayload {
    /// The CSS goes in as the only user turn; the instruction stays in its
    /// own field so the model can tell instructions from data.
    pub fn new(css: &str, system_instruction: &str) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(css)],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part::text(system_instruction)],
            },
            generation_config: GenerationConfig::conversion_result(),
        }
    }

    /// The user-supplied text, if any.
    pub fn user_text(&self) -> Option<&str> {
        self.contents
            .first()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: serde_json::Value,
}

impl GenerationConfig {
    /// JSON object with two required strings: `output` and `analysis`.
    pub fn conversion_result() -> Self {
        Self {
            response_mime_type: "application/json".to_string(),
            response_schema: json!({
                "type": "OBJECT",
                "properties": {
                    "output": { "type": "STRING" },
                    "analysis": { "type": "STRING" }
                },
                "required": ["output", "analysis"]
            }),
        }
    }
}

// --- reply envelope ---

/// Successful `generateContent` reply. Every field is optional so that an
/// unexpected shape decodes to "nothing there" instead of failing halfway.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u64,
    #[serde(default)]
    pub candidates_token_count: u64,
    #[serde(default)]
    pub total_token_count: Option<u64>,
}

impl UsageMetadata {
    /// Gemini's own total when present (it counts thinking tokens too).
    pub fn total(&self) -> u64 {
        self.total_token_count.unwrap_or_else(|| {
            self.prompt_token_count
                .saturating_add(self.candidates_token_count)
        })
    }
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate. Blank text counts as missing.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .as_ref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    /// Why the reply carries no text, when the upstream says so.
    pub fn stop_reason(&self) -> Option<&str> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Some(reason);
        }
        self.candidates
            .as_ref()?
            .first()?
            .finish_reason
            .as_deref()
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Pull `error.message` out of an upstream error body, if it has one.
pub fn upstream_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()?
        .error?
        .message
        .filter(|m| !m.is_empty())
}
