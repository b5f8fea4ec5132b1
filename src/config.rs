//! Environment-driven configuration.
//!
//! Every key is optional. Empty values are treated as unset, so a blank
//! `OPENAI_API_KEY=` line in `.env` means "no OpenAI".

use crate::agent::{AgentSettings, DEFAULT_MAX_TURNS};
use crate::llm::claude::{self, ClaudeConfig};
use crate::llm::openai::{self, OpenAiConfig};
use crate::llm::{ApiStyle, LlmSettings};
use crate::translate::{self, DeeplConfig};
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_MEDIA_ROOT: &str = "media";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
#[error("invalid value for {key}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub media_root: PathBuf,
    pub database_path: PathBuf,
    pub max_upload_bytes: usize,
    pub llm: LlmSettings,
    pub agent: AgentSettings,
    pub deepl: Option<DeeplConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let media_root = PathBuf::from(get("MEDIA_ROOT").unwrap_or_else(|| DEFAULT_MEDIA_ROOT.into()));
        let database_path = get("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| media_root.join("documents.db"));

        let claude = match get("ANTHROPIC_API_KEY") {
            Some(api_key) => {
                let base_url = get("ANTHROPIC_BASE_URL").unwrap_or_else(|| claude::DEFAULT_BASE_URL.into());
                let mut config = ClaudeConfig::new(api_key, base_url);
                if let Some(model) = get("ANTHROPIC_MODEL") {
                    config.model = model;
                }
                if let Some(style) = parse::<ApiStyle>(&get, "ANTHROPIC_API_STYLE")? {
                    config.style = style;
                }
                Some(config)
            }
            None => None,
        };

        let openai = match get("OPENAI_API_KEY") {
            Some(api_key) => {
                let base_url = get("OPENAI_BASE_URL").unwrap_or_else(|| openai::DEFAULT_BASE_URL.into());
                let explicit = parse::<ApiStyle>(&get, "OPENAI_API_STYLE")?;
                let mut config = OpenAiConfig::new(api_key, base_url);
                config.style = openai::detect_style(&config.base_url, explicit);
                if let Some(model) = get("OPENAI_CHAT_MODEL") {
                    config.chat_model = model;
                }
                if let Some(model) = get("OPENAI_VISION_MODEL") {
                    config.vision_model = model;
                }
                Some(config)
            }
            None => None,
        };

        let agent = AgentSettings {
            openai: openai.clone(),
            model: get("AGENT_MODEL").unwrap_or_else(|| "gpt-4o".into()),
            max_turns: parse(&get, "AGENT_MAX_TURNS")?.unwrap_or(DEFAULT_MAX_TURNS),
        };
        if agent.max_turns == 0 {
            return Err(ConfigError {
                key: "AGENT_MAX_TURNS",
                reason: "must be at least 1".into(),
            });
        }

        let deepl = get("DEEPL_API_KEY").map(|api_key| DeeplConfig {
            api_key,
            base_url: get("DEEPL_BASE_URL").unwrap_or_else(|| translate::DEFAULT_BASE_URL.into()),
        });

        Ok(Self {
            bind_addr: get("PITL_ADDR").unwrap_or_else(|| DEFAULT_ADDR.into()),
            media_root,
            database_path,
            max_upload_bytes: parse(&get, "MAX_UPLOAD_BYTES")?.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            llm: LlmSettings { claude, openai },
            agent,
            deepl,
        })
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError {
                key,
                reason: e.to_string(),
            })
        })
        .transpose()
}
