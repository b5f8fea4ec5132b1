use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub target_lang: Option<String>,
    #[serde(default)]
    pub source_lang: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub translated_text: String,
}

pub async fn translate(
    State(state): State<AppState>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> Response {
    let missing = || ApiError::BadRequest("Missing text or targetLang".into()).into_response();

    let Ok(Json(req)) = payload else {
        return missing();
    };
    let (Some(text), Some(target_lang)) = (
        req.text.filter(|t| !t.is_empty()),
        req.target_lang.filter(|t| !t.is_empty()),
    ) else {
        return missing();
    };

    match state
        .translator
        .translate(&text, &target_lang, req.source_lang.as_deref())
        .await
    {
        Ok(translated_text) => Json(TranslateResponse { translated_text }).into_response(),
        Err(e) => {
            tracing::error!(error = %e, target_lang = %target_lang, "translation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Translation failed", "details": e.to_string() })),
            )
                .into_response()
        }
    }
}
