use super::tools::ToolSpec;
use super::AgentError;
use crate::llm::openai::OpenAiConfig;
use crate::llm::InlineImage;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// JSON-encoded arguments, as produced by the model.
    pub arguments: String,
}

/// One entry of the agent conversation.
#[derive(Debug, Clone)]
pub enum AgentMessage {
    System(String),
    User(String),
    Image { path: String, image: InlineImage },
    ToolCalls(Vec<ToolCall>),
    ToolResult { call_id: String, content: String },
}

/// What the model wants next.
#[derive(Debug, Clone)]
pub enum Turn {
    ToolCalls(Vec<ToolCall>),
    Answer(String),
}

/// LLM side of the agent loop.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    async fn next_turn(
        &self,
        transcript: &[AgentMessage],
        tools: &[ToolSpec],
        response_schema: &Value,
    ) -> Result<Turn, AgentError>;
}

/// OpenAI-compatible Chat Completions with function tools and a JSON-schema
/// response format.
pub struct OpenAiAgentBackend {
    config: OpenAiConfig,
    model: String,
}

impl OpenAiAgentBackend {
    pub fn new(config: OpenAiConfig, model: String) -> Self {
        Self { config, model }
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn wire_message(message: &AgentMessage) -> Value {
    match message {
        AgentMessage::System(content) => json!({ "role": "system", "content": content }),
        AgentMessage::User(content) => json!({ "role": "user", "content": content }),
        AgentMessage::Image { path, image } => json!({
            "role": "user",
            "content": [
                { "type": "text", "text": format!("Image file: {}", path) },
                { "type": "image_url", "image_url": { "url": image.data_url() } }
            ]
        }),
        AgentMessage::ToolCalls(calls) => json!({
            "role": "assistant",
            "content": null,
            "tool_calls": calls.iter().map(|c| json!({
                "id": c.id,
                "type": "function",
                "function": { "name": c.name, "arguments": c.arguments }
            })).collect::<Vec<_>>()
        }),
        AgentMessage::ToolResult { call_id, content } => json!({
            "role": "tool",
            "tool_call_id": call_id,
            "content": content
        }),
    }
}

pub(crate) fn build_body(
    model: &str,
    transcript: &[AgentMessage],
    tools: &[ToolSpec],
    response_schema: &Value,
) -> Value {
    json!({
        "model": model,
        "messages": transcript.iter().map(wire_message).collect::<Vec<_>>(),
        "tools": tools.iter().map(|t| json!({
            "type": "function",
            "function": {
                "name": t.name,
                "description": t.description,
                "parameters": t.parameters
            }
        })).collect::<Vec<_>>(),
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": "feedback_result",
                "schema": response_schema,
                "strict": false
            }
        }
    })
}

#[async_trait]
impl AgentBackend for OpenAiAgentBackend {
    async fn next_turn(
        &self,
        transcript: &[AgentMessage],
        tools: &[ToolSpec],
        response_schema: &Value,
    ) -> Result<Turn, AgentError> {
        let client = Client::new();
        let body = build_body(&self.model, transcript, tools, response_schema);

        let mut req = client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Content-Type", "application/json")
            .json(&body);

        if !self.config.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.config.api_key));
        }

        let resp = req.send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(AgentError::Api {
                status,
                message: text,
            });
        }

        let data: CompletionResponse = resp.json().await?;
        let reply = data
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| AgentError::InvalidResponse("response contained no choices".into()))?;

        let tool_calls = reply.tool_calls.unwrap_or_default();
        if !tool_calls.is_empty() {
            let calls = tool_calls
                .into_iter()
                .map(|c| ToolCall {
                    id: c.id,
                    name: c.function.name,
                    arguments: c.function.arguments,
                })
                .collect();
            return Ok(Turn::ToolCalls(calls));
        }

        if let Some(refusal) = reply.refusal {
            return Err(AgentError::Refused(refusal));
        }

        match reply.content {
            Some(content) if !content.trim().is_empty() => Ok(Turn::Answer(content)),
            _ => Err(AgentError::InvalidResponse(
                "response contained neither tool calls nor content".into(),
            )),
        }
    }
}
