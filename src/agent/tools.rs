//! Filesystem tools exposed to the agent model, all backed by [`SandboxedFs`].

use super::backend::ToolCall;
use super::sandbox::SandboxedFs;
use crate::doc_processor::FileKind;
use crate::llm::InlineImage;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// Result of running one tool call.
#[derive(Debug, Clone)]
pub enum ToolOutput {
    Text(String),
    /// An image to attach to the conversation, with the text answer for the
    /// tool call itself.
    Media {
        note: String,
        path: String,
        image: InlineImage,
    },
}

impl ToolOutput {
    pub fn text(&self) -> &str {
        match self {
            ToolOutput::Text(text) => text,
            ToolOutput::Media { note, .. } => note,
        }
    }
}

#[derive(Deserialize)]
struct PathArgs {
    #[serde(default)]
    path: String,
}

fn path_parameters(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "path": { "type": "string", "description": description }
        },
        "required": ["path"],
        "additionalProperties": false
    })
}

pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "list_directory",
            description: "List the files and sub-directories of a directory. Entries are prefixed with [FILE] or [DIR].",
            parameters: path_parameters("Directory to list, relative to the document folder. Use \".\" for the folder itself."),
        },
        ToolSpec {
            name: "read_text_file",
            description: "Read a text, JSON or PDF file and return its text content.",
            parameters: path_parameters("File to read, relative to the document folder."),
        },
        ToolSpec {
            name: "read_media_file",
            description: "Load an image file (for example a photo of a homework page) so you can look at it.",
            parameters: path_parameters("Image file to load, relative to the document folder."),
        },
        ToolSpec {
            name: "get_file_info",
            description: "Get the size, kind and modification time of a file or directory.",
            parameters: path_parameters("File or directory, relative to the document folder."),
        },
    ]
}

/// Runs a tool call. Failures are reported as text for the model rather than
/// ending the run.
pub fn dispatch(sandbox: &SandboxedFs, call: &ToolCall) -> ToolOutput {
    let args: PathArgs = match serde_json::from_str(&call.arguments) {
        Ok(args) => args,
        Err(e) => return ToolOutput::Text(format!("Error: invalid arguments: {}", e)),
    };

    tracing::debug!(tool = %call.name, path = %args.path, "agent tool call");

    let result = match call.name.as_str() {
        "list_directory" => list_directory(sandbox, &args.path),
        "read_text_file" => sandbox.read_text(&args.path).map(ToolOutput::Text).map_err(|e| e.to_string()),
        "read_media_file" => read_media_file(sandbox, &args.path),
        "get_file_info" => get_file_info(sandbox, &args.path),
        other => Err(format!("unknown tool '{}'", other)),
    };

    result.unwrap_or_else(|e| ToolOutput::Text(format!("Error: {}", e)))
}

fn list_directory(sandbox: &SandboxedFs, path: &str) -> Result<ToolOutput, String> {
    let entries = sandbox.list_directory(path).map_err(|e| e.to_string())?;
    if entries.is_empty() {
        return Ok(ToolOutput::Text("(empty directory)".to_string()));
    }
    let listing = entries
        .iter()
        .map(|e| format!("{} {}", if e.is_dir { "[DIR]" } else { "[FILE]" }, e.name))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(ToolOutput::Text(listing))
}

fn read_media_file(sandbox: &SandboxedFs, path: &str) -> Result<ToolOutput, String> {
    let media = sandbox.read_media(path).map_err(|e| e.to_string())?;
    let image = InlineImage {
        media_type: media.media_type,
        data: base64::engine::general_purpose::STANDARD.encode(&media.bytes),
    };
    Ok(ToolOutput::Media {
        note: format!(
            "Loaded {} ({}, {} bytes). The image follows in the next message.",
            media.path,
            image.media_type,
            media.bytes.len()
        ),
        path: media.path,
        image,
    })
}

fn get_file_info(sandbox: &SandboxedFs, path: &str) -> Result<ToolOutput, String> {
    let info = sandbox.file_info(path).map_err(|e| e.to_string())?;
    let kind = if info.is_dir {
        "directory"
    } else {
        match sandbox.kind(path).map_err(|e| e.to_string())? {
            FileKind::Text => "text",
            FileKind::Pdf => "pdf",
            FileKind::Image => "image",
            FileKind::Other => "binary",
        }
    };
    let modified = info
        .modified
        .map(|m| m.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string());
    Ok(ToolOutput::Text(format!(
        "kind: {}\nsize: {}\nmodified: {}",
        kind, info.size, modified
    )))
}
