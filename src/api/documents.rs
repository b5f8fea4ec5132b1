use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use super::{ApiError, ApiResult, AppState};
use crate::agent::prompt::DASHBOARD_INSTRUCTION;
use crate::db::models::{Document, DocumentStatus};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub status: DocumentStatus,
    pub upload_date: DateTime<Utc>,
}

impl From<Document> for UploadResponse {
    fn from(doc: Document) -> Self {
        Self {
            name: doc.name,
            doc_type: doc.doc_type,
            status: doc.status,
            upload_date: doc.upload_date,
        }
    }
}

struct FilePart {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// `file` is required; `name` and `type` fall back to the file part's own
/// file name and content type.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let mut multipart =
        multipart.map_err(|e| ApiError::BadRequest(format!("Expected a multipart form: {}", e)))?;

    let mut file: Option<FilePart> = None;
    let mut name: Option<String> = None;
    let mut doc_type: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                file = Some(FilePart {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("name") => {
                name = Some(field.text().await?);
            }
            Some("type") => {
                doc_type = Some(field.text().await?);
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::BadRequest("No file was submitted".into()))?;

    let name = name
        .filter(|n| !n.trim().is_empty())
        .or_else(|| file.file_name.clone())
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("A document name is required".into()))?;
    let doc_type = doc_type
        .filter(|t| !t.trim().is_empty())
        .or_else(|| file.content_type.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let doc = state
        .store
        .create(&file.bytes, file.file_name.as_deref(), &name, &doc_type)?;

    Ok((StatusCode::CREATED, Json(doc.into())))
}

/// Runs the feedback agent over the document's directory.
pub async fn dashboard(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    let doc = state.store.get(&name)?;
    let root = state.store.absolute_dir(&doc);

    let result = state.agent.query(&root, DASHBOARD_INSTRUCTION).await?;
    Ok(Json(json!({ "message": result })))
}

pub async fn analyze(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    let doc = state.store.get(&name)?;
    let feedback = state
        .llm
        .analyze_homework_image(&state.store.absolute_file(&doc))
        .await;
    Ok(Json(json!({ "feedback": feedback })))
}
