//! Directory-scanning feedback agent.
//!
//! Each [`FeedbackAgent::query`] opens a [`SandboxedFs`] on the document
//! directory, runs a tool-calling loop against the configured backend, and
//! validates the final answer against the Feedback Result shape. Nothing is
//! reused between calls.

pub mod backend;
pub mod prompt;
pub mod sandbox;
pub mod tools;

use backend::{AgentBackend, AgentMessage, OpenAiAgentBackend, Turn};
use sandbox::{SandboxError, SandboxedFs};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tools::{ToolOutput, ToolSpec};

use crate::llm::openai::OpenAiConfig;

pub const DEFAULT_MAX_TURNS: usize = 12;

/// Base64 bytes of images one query may attach to its transcript.
pub const DEFAULT_IMAGE_BUDGET: usize = 32 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FeedbackSection {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tips: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FeedbackResult {
    pub sections: Vec<FeedbackSection>,
}

impl FeedbackResult {
    /// Parses a model answer and checks every section has a title and body.
    pub fn parse(raw: &str) -> Result<Self, AgentError> {
        let result: FeedbackResult = serde_json::from_str(raw.trim())
            .map_err(|e| AgentError::InvalidResponse(format!("not a feedback result: {}", e)))?;
        result.validate()?;
        Ok(result)
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        for (i, section) in self.sections.iter().enumerate() {
            if section.title.trim().is_empty() {
                return Err(AgentError::InvalidResponse(format!(
                    "section {} has an empty title",
                    i
                )));
            }
            if section.body.trim().is_empty() {
                return Err(AgentError::InvalidResponse(format!(
                    "section {} has an empty body",
                    i
                )));
            }
        }
        Ok(())
    }
}

/// JSON schema the backend is asked to answer with.
pub fn feedback_schema() -> Value {
    let string_list = json!({ "type": "array", "items": { "type": "string" } });
    json!({
        "type": "object",
        "properties": {
            "sections": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "minLength": 1 },
                        "body": { "type": "string", "minLength": 1 },
                        "tips": string_list,
                        "steps": string_list,
                        "resources": string_list,
                        "tags": string_list
                    },
                    "required": ["title", "body"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["sections"],
        "additionalProperties": false
    })
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),
    #[error("No agent backend configured (set OPENAI_API_KEY)")]
    NotConfigured,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Model refused: {0}")]
    Refused(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Agent did not finish within {0} turns")]
    TurnLimit(usize),
}

/// Backend credential and loop bound for the agent.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub openai: Option<OpenAiConfig>,
    pub model: String,
    pub max_turns: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            openai: None,
            model: "gpt-4o".to_string(),
            max_turns: DEFAULT_MAX_TURNS,
        }
    }
}

pub struct FeedbackAgent {
    backend: Option<Arc<dyn AgentBackend>>,
    max_turns: usize,
    image_budget: usize,
}

impl FeedbackAgent {
    pub fn new(settings: &AgentSettings) -> Self {
        let backend = settings.openai.clone().map(|config| {
            Arc::new(OpenAiAgentBackend::new(config, settings.model.clone())) as Arc<dyn AgentBackend>
        });
        Self {
            backend,
            max_turns: settings.max_turns,
            image_budget: DEFAULT_IMAGE_BUDGET,
        }
    }

    pub fn with_backend(backend: Arc<dyn AgentBackend>, max_turns: usize) -> Self {
        Self {
            backend: Some(backend),
            max_turns,
            image_budget: DEFAULT_IMAGE_BUDGET,
        }
    }

    pub fn with_image_budget(mut self, bytes: usize) -> Self {
        self.image_budget = bytes;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    pub async fn query(&self, filepath: &Path, message: &str) -> Result<FeedbackResult, AgentError> {
        let sandbox = SandboxedFs::open(filepath)?;
        let backend = self.backend.as_deref().ok_or(AgentError::NotConfigured)?;

        let runtime = AgentRuntime {
            sandbox,
            backend,
            tools: tools::tool_specs(),
            schema: feedback_schema(),
            max_turns: self.max_turns,
            images: ImageBudget::new(self.image_budget),
        };
        let result = runtime.run(message).await?;

        tracing::info!(
            root = %filepath.display(),
            sections = result.sections.len(),
            "feedback generated"
        );
        Ok(result)
    }
}

/// Per-call agent state; dropped when the call ends.
struct AgentRuntime<'a> {
    sandbox: SandboxedFs,
    backend: &'a dyn AgentBackend,
    tools: Vec<ToolSpec>,
    schema: Value,
    max_turns: usize,
    images: ImageBudget,
}

/// Tracks which images are already in the transcript and how many encoded
/// bytes they take.
struct ImageBudget {
    attached: HashSet<String>,
    used: usize,
    limit: usize,
}

impl ImageBudget {
    fn new(limit: usize) -> Self {
        Self {
            attached: HashSet::new(),
            used: 0,
            limit,
        }
    }

    /// `Ok` when the image should be attached, otherwise the text to send
    /// back for the tool call instead.
    fn admit(&mut self, path: &str, encoded_len: usize) -> Result<(), String> {
        if self.attached.contains(path) {
            return Err(format!(
                "{} was already loaded earlier in this conversation; look at that copy.",
                path
            ));
        }
        if self.used + encoded_len > self.limit {
            return Err(format!(
                "Error: {} was not attached; the image budget of {} bytes for this conversation is used up.",
                path, self.limit
            ));
        }
        self.used += encoded_len;
        self.attached.insert(path.to_string());
        Ok(())
    }
}

impl AgentRuntime<'_> {
    async fn run(mut self, message: &str) -> Result<FeedbackResult, AgentError> {
        let mut transcript = vec![
            AgentMessage::System(prompt::FEEDBACK_SYSTEM_PROMPT.to_string()),
            AgentMessage::User(format!(
                "{}\n\nThe documents are in the folder \".\". Use the filesystem tools to explore it.",
                message
            )),
        ];

        for turn in 0..self.max_turns {
            match self
                .backend
                .next_turn(&transcript, &self.tools, &self.schema)
                .await?
            {
                Turn::Answer(raw) => return FeedbackResult::parse(&raw),
                Turn::ToolCalls(calls) => {
                    tracing::debug!(turn, calls = calls.len(), "agent requested tools");
                    let mut images = Vec::new();
                    let mut results = Vec::with_capacity(calls.len());
                    for call in &calls {
                        let content = match tools::dispatch(&self.sandbox, call) {
                            ToolOutput::Text(text) => text,
                            ToolOutput::Media { note, path, image } => {
                                match self.images.admit(&path, image.data.len()) {
                                    Ok(()) => {
                                        images.push(AgentMessage::Image { path, image });
                                        note
                                    }
                                    Err(refusal) => {
                                        tracing::debug!(path = %path, "image not attached");
                                        refusal
                                    }
                                }
                            }
                        };
                        results.push(AgentMessage::ToolResult {
                            call_id: call.id.clone(),
                            content,
                        });
                    }
                    // Tool results must directly follow the calls; images come after.
                    transcript.push(AgentMessage::ToolCalls(calls));
                    transcript.extend(results);
                    transcript.extend(images);
                }
            }
        }

        Err(AgentError::TurnLimit(self.max_turns))
    }
}

#[cfg(test)]
mod tests {
    use super::backend::ToolCall;
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Replays canned turns and records every transcript it was shown.
    struct ScriptedBackend {
        turns: Mutex<VecDeque<Turn>>,
        seen: Mutex<Vec<Vec<AgentMessage>>>,
    }

    impl ScriptedBackend {
        fn new(turns: Vec<Turn>) -> Arc<Self> {
            Arc::new(Self {
                turns: Mutex::new(turns.into()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl AgentBackend for ScriptedBackend {
        async fn next_turn(
            &self,
            transcript: &[AgentMessage],
            _tools: &[ToolSpec],
            _schema: &Value,
        ) -> Result<Turn, AgentError> {
            self.seen.lock().unwrap().push(transcript.to_vec());
            self.turns
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AgentError::InvalidResponse("script exhausted".into()))
        }
    }

    fn call(id: &str, name: &str, path: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: name.into(),
            arguments: json!({ "path": path }).to_string(),
        }
    }

    const VALID: &str = r#"{"sections": [
        {"title": "Your Child's Current Progress", "body": "Fractions are going well."},
        {"title": "Practice at Home", "body": "Short daily practice.", "tips": ["Bake together"]}
    ]}"#;

    fn doc_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("meta.json"), r#"{"score": "8/10"}"#).unwrap();
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        std::fs::write(dir.path().join("page1.png"), png).unwrap();
        dir
    }

    #[test]
    fn validation_rejects_blank_fields() {
        assert!(FeedbackResult::parse(VALID).is_ok());
        assert!(matches!(
            FeedbackResult::parse(r#"{"sections": [{"title": "t", "body": "  "}]}"#),
            Err(AgentError::InvalidResponse(_))
        ));
        assert!(matches!(
            FeedbackResult::parse(r#"{"sections": [{"title": "t"}]}"#),
            Err(AgentError::InvalidResponse(_))
        ));
        assert!(matches!(
            FeedbackResult::parse("Here is your feedback!"),
            Err(AgentError::InvalidResponse(_))
        ));
    }

    #[test]
    fn optional_fields_are_omitted_when_absent() {
        let result = FeedbackResult::parse(VALID).unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert!(value["sections"][0].get("tips").is_none());
        assert_eq!(value["sections"][1]["tips"], json!(["Bake together"]));
    }

    #[tokio::test]
    async fn runs_tools_then_returns_validated_feedback() {
        let dir = doc_dir();
        let backend = ScriptedBackend::new(vec![
            Turn::ToolCalls(vec![call("c1", "list_directory", ".")]),
            Turn::ToolCalls(vec![
                call("c2", "read_text_file", "meta.json"),
                call("c3", "read_media_file", "page1.png"),
                call("c4", "read_text_file", "../../etc/passwd"),
            ]),
            Turn::Answer(VALID.into()),
        ]);
        let agent = FeedbackAgent::with_backend(backend.clone(), DEFAULT_MAX_TURNS);

        let result = agent.query(dir.path(), prompt::DASHBOARD_INSTRUCTION).await.unwrap();
        assert_eq!(result.sections.len(), 2);

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);

        let second = &seen[1];
        assert!(matches!(
            &second[3],
            AgentMessage::ToolResult { content, .. } if content == "[FILE] meta.json\n[FILE] page1.png"
        ));

        let last = &seen[2];
        let tail: Vec<_> = last.iter().skip(4).collect();
        assert!(matches!(tail[0], AgentMessage::ToolCalls(calls) if calls.len() == 3));
        assert!(matches!(
            tail[1],
            AgentMessage::ToolResult { content, .. } if content == r#"{"score": "8/10"}"#
        ));
        assert!(matches!(
            tail[3],
            AgentMessage::ToolResult { content, .. } if content.contains("outside allowed directory")
        ));
        assert!(matches!(
            tail[4],
            AgentMessage::Image { path, image } if path == "page1.png" && image.media_type == "image/png"
        ));
    }

    fn images_in(transcript: &[AgentMessage]) -> Vec<&str> {
        transcript
            .iter()
            .filter_map(|m| match m {
                AgentMessage::Image { path, .. } => Some(path.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn repeated_image_is_attached_once() {
        let dir = doc_dir();
        let backend = ScriptedBackend::new(vec![
            Turn::ToolCalls(vec![call("c1", "read_media_file", "page1.png")]),
            Turn::ToolCalls(vec![
                call("c2", "read_media_file", "./page1.png"),
                call("c3", "read_media_file", "page1.png"),
            ]),
            Turn::Answer(VALID.into()),
        ]);
        let agent = FeedbackAgent::with_backend(backend.clone(), DEFAULT_MAX_TURNS);
        agent.query(dir.path(), "scan").await.unwrap();

        let seen = backend.seen.lock().unwrap();
        let last = &seen[2];
        assert_eq!(images_in(last), vec!["page1.png"]);
        let repeats = last
            .iter()
            .filter(|m| matches!(m, AgentMessage::ToolResult { content, .. } if content.contains("already loaded")))
            .count();
        assert_eq!(repeats, 2);
    }

    #[tokio::test]
    async fn images_past_the_budget_are_refused() {
        let dir = doc_dir();
        std::fs::copy(dir.path().join("page1.png"), dir.path().join("page2.png")).unwrap();
        let backend = ScriptedBackend::new(vec![
            Turn::ToolCalls(vec![
                call("c1", "read_media_file", "page1.png"),
                call("c2", "read_media_file", "page2.png"),
            ]),
            Turn::Answer(VALID.into()),
        ]);
        // Room for one 12-byte PNG, which is 16 bytes of base64.
        let agent = FeedbackAgent::with_backend(backend.clone(), DEFAULT_MAX_TURNS).with_image_budget(16);
        agent.query(dir.path(), "scan").await.unwrap();

        let seen = backend.seen.lock().unwrap();
        let last = &seen[1];
        assert_eq!(images_in(last), vec!["page1.png"]);
        assert!(last.iter().any(|m| matches!(
            m,
            AgentMessage::ToolResult { call_id, content } if call_id == "c2" && content.contains("image budget")
        )));
    }

    #[tokio::test]
    async fn invalid_answer_is_an_error() {
        let dir = doc_dir();
        let backend = ScriptedBackend::new(vec![Turn::Answer(
            r#"{"sections": [{"title": "", "body": "text"}]}"#.into(),
        )]);
        let agent = FeedbackAgent::with_backend(backend, DEFAULT_MAX_TURNS);
        let err = agent.query(dir.path(), "scan").await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn bad_root_fails_before_calling_backend() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::new(vec![Turn::Answer(VALID.into())]);
        let agent = FeedbackAgent::with_backend(backend.clone(), DEFAULT_MAX_TURNS);
        let err = agent
            .query(&dir.path().join("missing"), "scan")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Sandbox(_)));
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_agent_fails() {
        let dir = doc_dir();
        let agent = FeedbackAgent::new(&AgentSettings::default());
        assert!(!agent.is_configured());
        let err = agent.query(dir.path(), "scan").await.unwrap_err();
        assert!(matches!(err, AgentError::NotConfigured));
    }

    #[tokio::test]
    async fn turn_limit_is_enforced() {
        let dir = doc_dir();
        let looping = (0..3)
            .map(|i| Turn::ToolCalls(vec![call(&format!("c{}", i), "list_directory", ".")]))
            .collect();
        let agent = FeedbackAgent::with_backend(ScriptedBackend::new(looping), 2);
        let err = agent.query(dir.path(), "scan").await.unwrap_err();
        assert!(matches!(err, AgentError::TurnLimit(2)));
    }
}
