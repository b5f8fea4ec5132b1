use super::{api_error, ApiStyle, CompletionRequest, LlmError};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub vision_model: String,
    pub style: ApiStyle,
}

impl OpenAiConfig {
    pub fn new(api_key: String, base_url: String) -> Self {
        let style = detect_style(&base_url, None);
        Self {
            api_key,
            base_url,
            chat_model: "gpt-4o".to_string(),
            vision_model: "gpt-4o".to_string(),
            style,
        }
    }
}

/// Picks the wire convention for an OpenAI-compatible host. An explicit
/// setting wins; otherwise the official API gets the current convention and
/// self-hosted compatible servers get the legacy one.
pub fn detect_style(base_url: &str, explicit: Option<ApiStyle>) -> ApiStyle {
    if let Some(style) = explicit {
        return style;
    }
    if base_url.contains("api.openai.com") {
        ApiStyle::Current
    } else {
        ApiStyle::Legacy
    }
}

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: String,
    content: OpenAiContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum OpenAiContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiReply,
}

#[derive(Deserialize)]
struct OpenAiReply {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

fn build_request(request: &CompletionRequest, style: ApiStyle) -> OpenAiRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = &request.system {
        messages.push(OpenAiMessage {
            role: "system".to_string(),
            content: OpenAiContent::Text(system.clone()),
        });
    }

    let last = request.messages.len().saturating_sub(1);
    for (i, m) in request.messages.iter().enumerate() {
        let image = request.image.as_ref().filter(|_| i == last && m.role == "user");
        let content = match (image, style) {
            (Some(image), _) => OpenAiContent::Parts(vec![
                ContentPart::Text {
                    text: m.content.clone(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.data_url(),
                    },
                },
            ]),
            (None, ApiStyle::Current) if m.role == "user" => {
                OpenAiContent::Parts(vec![ContentPart::Text {
                    text: m.content.clone(),
                }])
            }
            (None, _) => OpenAiContent::Text(m.content.clone()),
        };
        messages.push(OpenAiMessage {
            role: m.role.clone(),
            content,
        });
    }

    let (max_completion_tokens, max_tokens) = match style {
        ApiStyle::Current => (Some(request.max_tokens), None),
        ApiStyle::Legacy => (None, Some(request.max_tokens)),
    };

    OpenAiRequest {
        model: request.model.clone(),
        messages,
        max_completion_tokens,
        max_tokens,
    }
}

pub async fn complete(
    client: &Client,
    config: &OpenAiConfig,
    request: &CompletionRequest,
) -> Result<String, LlmError> {
    let body = build_request(request, config.style);

    let mut req = client
        .post(format!("{}/chat/completions", config.base_url))
        .header("Content-Type", "application/json")
        .json(&body);

    if !config.api_key.is_empty() {
        req = req.header("Authorization", format!("Bearer {}", config.api_key));
    }

    let resp = req.send().await?;

    if !resp.status().is_success() {
        return Err(api_error(resp).await);
    }

    let data: OpenAiResponse = resp.json().await?;
    let reply = data
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| LlmError::Parse("response contained no choices".into()))?;

    match (reply.content, reply.refusal) {
        (Some(content), _) if !content.is_empty() => Ok(content),
        (_, Some(refusal)) => Err(LlmError::Api {
            status: 200,
            message: format!("model refused: {}", refusal),
        }),
        _ => Err(LlmError::Parse("response contained no content".into())),
    }
}
