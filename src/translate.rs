use reqwest::Client;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api-free.deepl.com";

#[derive(Debug, Clone)]
pub struct DeeplConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("DeepL API key not configured")]
    NotConfigured,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("DeepL API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("DeepL returned no translations")]
    Empty,
}

#[derive(Deserialize)]
struct TranslateResponse {
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
struct Translation {
    text: String,
}

/// Client for the DeepL translate endpoint used by the dashboard's language
/// switcher.
pub struct Translator {
    client: Client,
    config: Option<DeeplConfig>,
}

impl Translator {
    pub fn new(config: Option<DeeplConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub async fn translate(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: Option<&str>,
    ) -> Result<String, TranslateError> {
        let config = self.config.as_ref().ok_or(TranslateError::NotConfigured)?;
        let source_lang = source_lang.filter(|s| !s.is_empty()).unwrap_or("EN");

        tracing::debug!(source_lang, target_lang, chars = text.len(), "translating");

        let resp = self
            .client
            .post(format!("{}/v2/translate", config.base_url))
            .header("Authorization", format!("DeepL-Auth-Key {}", config.api_key))
            .form(&[
                ("text", text),
                ("source_lang", source_lang),
                ("target_lang", target_lang),
                ("preserve_formatting", "1"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(TranslateError::Api { status, message });
        }

        let data: TranslateResponse = resp.json().await?;
        data.translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or(TranslateError::Empty)
    }
}
