use super::{api_error, ApiStyle, CompletionRequest, LlmError};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub style: ApiStyle,
}

impl ClaudeConfig {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            model: "claude-sonnet-4-20250514".to_string(),
            style: ApiStyle::Current,
        }
    }
}

// Messages API

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Serialize)]
struct ClaudeMessage {
    role: String,
    content: ClaudeContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ClaudeContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Image { source: ImageSource },
    Text { text: String },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: String,
    data: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: Option<String>,
}

// Text Completions API

#[derive(Serialize)]
struct CompleteRequest {
    model: String,
    prompt: String,
    max_tokens_to_sample: u32,
}

#[derive(Deserialize)]
struct CompleteResponse {
    completion: String,
}

fn build_messages_request(request: &CompletionRequest) -> MessagesRequest {
    let last = request.messages.len().saturating_sub(1);
    let messages = request
        .messages
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let content = match request.image.as_ref().filter(|_| i == last && m.role == "user") {
                Some(image) => ClaudeContent::Blocks(vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            kind: "base64",
                            media_type: image.media_type.clone(),
                            data: image.data.clone(),
                        },
                    },
                    ContentBlock::Text {
                        text: m.content.clone(),
                    },
                ]),
                None => ClaudeContent::Text(m.content.clone()),
            };
            ClaudeMessage {
                role: m.role.clone(),
                content,
            }
        })
        .collect();

    MessagesRequest {
        model: request.model.clone(),
        max_tokens: request.max_tokens,
        messages,
        system: request.system.clone(),
    }
}

fn legacy_prompt(request: &CompletionRequest) -> String {
    let mut prompt = String::new();
    if let Some(system) = &request.system {
        prompt.push_str(system);
    }
    for m in &request.messages {
        let speaker = if m.role == "user" { "Human" } else { "Assistant" };
        prompt.push_str(&format!("\n\n{}: {}", speaker, m.content));
    }
    prompt.push_str("\n\nAssistant:");
    prompt
}

pub async fn complete(
    client: &Client,
    config: &ClaudeConfig,
    request: &CompletionRequest,
) -> Result<String, LlmError> {
    match config.style {
        ApiStyle::Current => complete_messages(client, config, request).await,
        ApiStyle::Legacy => complete_legacy(client, config, request).await,
    }
}

async fn complete_messages(
    client: &Client,
    config: &ClaudeConfig,
    request: &CompletionRequest,
) -> Result<String, LlmError> {
    let body = build_messages_request(request);

    let resp = client
        .post(format!("{}/v1/messages", config.base_url))
        .header("Content-Type", "application/json")
        .header("x-api-key", &config.api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(api_error(resp).await);
    }

    let data: MessagesResponse = resp.json().await?;
    data.content
        .into_iter()
        .find_map(|block| block.text)
        .ok_or_else(|| LlmError::Parse("response contained no text block".into()))
}

async fn complete_legacy(
    client: &Client,
    config: &ClaudeConfig,
    request: &CompletionRequest,
) -> Result<String, LlmError> {
    if request.image.is_some() {
        return Err(LlmError::Unsupported(
            "the text completions API cannot accept images".into(),
        ));
    }

    let body = CompleteRequest {
        model: request.model.clone(),
        prompt: legacy_prompt(request),
        max_tokens_to_sample: request.max_tokens,
    };

    let resp = client
        .post(format!("{}/v1/complete", config.base_url))
        .header("Content-Type", "application/json")
        .header("x-api-key", &config.api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(api_error(resp).await);
    }

    let data: CompleteResponse = resp.json().await?;
    Ok(data.completion.trim_start().to_string())
}
