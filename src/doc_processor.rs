use std::path::Path;

/// How a stored file can be presented to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Pdf,
    Image,
    Other,
}

/// Classify a file by extension, falling back to magic bytes when given.
pub fn classify(path: &Path, head: Option<&[u8]>) -> FileKind {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "txt" | "md" | "markdown" | "json" | "csv" => return FileKind::Text,
        "pdf" => return FileKind::Pdf,
        "png" | "jpg" | "jpeg" | "gif" | "webp" => return FileKind::Image,
        _ => {}
    }

    match head.and_then(infer::get) {
        Some(kind) if kind.mime_type() == "application/pdf" => FileKind::Pdf,
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => FileKind::Image,
        Some(_) => FileKind::Other,
        None => match head {
            Some(bytes) if std::str::from_utf8(bytes).is_ok() => FileKind::Text,
            _ => FileKind::Other,
        },
    }
}

/// Extract plain text from a text or PDF payload.
pub fn extract_text(kind: FileKind, bytes: &[u8]) -> Result<String, String> {
    match kind {
        FileKind::Text => {
            String::from_utf8(bytes.to_vec()).map_err(|_| "file is not valid UTF-8 text".to_string())
        }
        FileKind::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| format!("PDF parse error: {}", e)),
        FileKind::Image => Err("file is an image; use read_media_file".to_string()),
        FileKind::Other => Err("unsupported binary file".to_string()),
    }
}
