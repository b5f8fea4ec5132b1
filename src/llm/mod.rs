pub mod claude;
pub mod openai;
pub mod prompts;
pub mod service;

pub use service::LlmService;

use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A prior chat turn as the frontend sends it: `{"type": "user", "content": "..."}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConversationMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub content: String,
}

impl From<&ConversationMessage> for ChatMessage {
    fn from(msg: &ConversationMessage) -> Self {
        if msg.kind == "user" {
            ChatMessage::user(msg.content.clone())
        } else {
            ChatMessage::assistant(msg.content.clone())
        }
    }
}

/// Base64 image payload sent inline with a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub media_type: String,
    pub data: String,
}

impl InlineImage {
    /// Encodes raw image bytes, sniffing the media type from magic bytes.
    /// Unknown formats are labelled `image/jpeg`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let media_type = infer::get(bytes)
            .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
            .map(|kind| kind.mime_type())
            .unwrap_or("image/jpeg")
            .to_string();
        Self {
            media_type,
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// Provider-neutral completion request. `image`, when present, belongs to the
/// last user message.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub image: Option<InlineImage>,
    pub max_tokens: u32,
}

/// Wire convention used to talk to a provider. Chosen once when the adapter
/// is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStyle {
    Current,
    Legacy,
}

impl FromStr for ApiStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "current" => Ok(ApiStyle::Current),
            "legacy" => Ok(ApiStyle::Legacy),
            other => Err(format!("unknown API style '{}' (expected current or legacy)", other)),
        }
    }
}

/// Credentials and model choices for the chat/vision providers. A `None`
/// entry means the credential was absent.
#[derive(Debug, Clone, Default)]
pub struct LlmSettings {
    pub claude: Option<claude::ClaudeConfig>,
    pub openai: Option<openai::OpenAiConfig>,
}

/// A configured chat/vision provider.
#[derive(Debug, Clone)]
pub enum Provider {
    Claude(claude::ClaudeConfig),
    OpenAi(openai::OpenAiConfig),
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Claude(_) => "anthropic",
            Provider::OpenAi(_) => "openai",
        }
    }

    pub fn chat_model(&self) -> &str {
        match self {
            Provider::Claude(config) => &config.model,
            Provider::OpenAi(config) => &config.chat_model,
        }
    }

    pub fn vision_model(&self) -> &str {
        match self {
            Provider::Claude(config) => &config.model,
            Provider::OpenAi(config) => &config.vision_model,
        }
    }

    pub async fn complete(
        &self,
        client: &Client,
        request: &CompletionRequest,
    ) -> Result<String, LlmError> {
        match self {
            Provider::Claude(config) => claude::complete(client, config, request).await,
            Provider::OpenAi(config) => openai::complete(client, config, request).await,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Unsupported request: {0}")]
    Unsupported(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads an error response body into an [`LlmError::Api`].
pub(crate) async fn api_error(resp: reqwest::Response) -> LlmError {
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    LlmError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_roles_map_to_provider_vocabulary() {
        let user = ConversationMessage {
            kind: "user".into(),
            content: "hello".into(),
        };
        let bot = ConversationMessage {
            kind: "ai".into(),
            content: "hi there".into(),
        };
        assert_eq!(ChatMessage::from(&user).role, "user");
        assert_eq!(ChatMessage::from(&bot).role, "assistant");
    }

    #[test]
    fn inline_image_sniffs_png() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        let image = InlineImage::from_bytes(&png);
        assert_eq!(image.media_type, "image/png");
        assert!(image.data_url().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn inline_image_defaults_to_jpeg() {
        let image = InlineImage::from_bytes(b"not really an image");
        assert_eq!(image.media_type, "image/jpeg");
    }

    #[test]
    fn api_style_parses_case_insensitively() {
        assert_eq!("Legacy".parse::<ApiStyle>(), Ok(ApiStyle::Legacy));
        assert_eq!(" current ".parse::<ApiStyle>(), Ok(ApiStyle::Current));
        assert!("v2".parse::<ApiStyle>().is_err());
    }
}
