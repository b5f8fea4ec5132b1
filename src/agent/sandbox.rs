//! Read-only filesystem capability confined to a single directory.

use crate::doc_processor::{self, FileKind};
use chrono::{DateTime, Utc};
use std::io::Read;
use std::path::{Component, Path, PathBuf};

const MAX_TEXT_BYTES: u64 = 5 * 1024 * 1024;
const MAX_MEDIA_BYTES: u64 = 20 * 1024 * 1024;
const SNIFF_BYTES: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("sandbox root {path} is not accessible: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("sandbox root {0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("access denied - path outside allowed directory: {0}")]
    OutsideRoot(String),
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {reason}")]
    Unreadable { path: String, reason: String },
    #[error("{path} is larger than the {limit} byte read limit")]
    TooLarge { path: String, limit: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub is_dir: bool,
}

#[derive(Debug, Clone)]
pub struct FileInfo {
    pub size: u64,
    pub is_dir: bool,
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct MediaFile {
    /// Root-relative path of the resolved file.
    pub path: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// Every path handed to this type is resolved against `root`, and anything
/// that lands outside it after canonicalization is refused.
#[derive(Debug)]
pub struct SandboxedFs {
    root: PathBuf,
}

impl SandboxedFs {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, SandboxError> {
        let root = root.as_ref();
        let canonical = root.canonicalize().map_err(|source| SandboxError::Root {
            path: root.to_path_buf(),
            source,
        })?;
        if !canonical.is_dir() {
            return Err(SandboxError::NotADirectory(canonical));
        }
        Ok(Self { root: canonical })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a requested path to a canonical path inside the root.
    pub fn resolve(&self, requested: &str) -> Result<PathBuf, SandboxError> {
        let requested = requested.trim();
        let path = Path::new(requested);

        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(SandboxError::OutsideRoot(requested.to_string()));
        }

        let candidate = if requested.is_empty() || requested == "." {
            self.root.clone()
        } else if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        // Reject before touching the filesystem so outside paths reveal nothing.
        if candidate.is_absolute() && !candidate.starts_with(&self.root) {
            return Err(SandboxError::OutsideRoot(requested.to_string()));
        }

        let resolved = candidate.canonicalize().map_err(|source| SandboxError::Io {
            path: requested.to_string(),
            source,
        })?;
        // Symlinks may still point elsewhere.
        if !resolved.starts_with(&self.root) {
            return Err(SandboxError::OutsideRoot(requested.to_string()));
        }
        Ok(resolved)
    }

    /// Root-relative display form of a resolved path.
    fn display(&self, resolved: &Path) -> String {
        match resolved.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.to_string_lossy().into_owned(),
            Err(_) => resolved.to_string_lossy().into_owned(),
        }
    }

    pub fn list_directory(&self, requested: &str) -> Result<Vec<Entry>, SandboxError> {
        let dir = self.resolve(requested)?;
        let io_err = |source| SandboxError::Io {
            path: requested.to_string(),
            source,
        };
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let is_dir = entry.file_type().map_err(io_err)?.is_dir();
            entries.push(Entry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    pub fn file_info(&self, requested: &str) -> Result<FileInfo, SandboxError> {
        let path = self.resolve(requested)?;
        let meta = std::fs::metadata(&path).map_err(|source| SandboxError::Io {
            path: requested.to_string(),
            source,
        })?;
        Ok(FileInfo {
            size: meta.len(),
            is_dir: meta.is_dir(),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    pub fn kind(&self, requested: &str) -> Result<FileKind, SandboxError> {
        let path = self.resolve(requested)?;
        let head = self.read_head(&path, requested)?;
        Ok(doc_processor::classify(&path, Some(&head)))
    }

    /// Text content of a text or PDF file.
    pub fn read_text(&self, requested: &str) -> Result<String, SandboxError> {
        let path = self.resolve(requested)?;
        let bytes = self.read_limited(&path, requested, MAX_TEXT_BYTES)?;
        let kind = doc_processor::classify(&path, Some(&bytes[..bytes.len().min(SNIFF_BYTES)]));
        doc_processor::extract_text(kind, &bytes).map_err(|reason| SandboxError::Unreadable {
            path: requested.to_string(),
            reason,
        })
    }

    /// Raw bytes of an image file with its detected media type.
    pub fn read_media(&self, requested: &str) -> Result<MediaFile, SandboxError> {
        let path = self.resolve(requested)?;
        let bytes = self.read_limited(&path, requested, MAX_MEDIA_BYTES)?;
        let media_type = infer::get(&bytes)
            .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
            .map(|kind| kind.mime_type().to_string())
            .ok_or_else(|| SandboxError::Unreadable {
                path: requested.to_string(),
                reason: "file is not a recognised image".to_string(),
            })?;
        Ok(MediaFile {
            path: self.display(&path),
            media_type,
            bytes,
        })
    }

    fn read_limited(&self, path: &Path, requested: &str, limit: u64) -> Result<Vec<u8>, SandboxError> {
        let io_err = |source| SandboxError::Io {
            path: requested.to_string(),
            source,
        };
        let meta = std::fs::metadata(path).map_err(io_err)?;
        if meta.is_dir() {
            return Err(SandboxError::Unreadable {
                path: requested.to_string(),
                reason: "is a directory".to_string(),
            });
        }
        if meta.len() > limit {
            return Err(SandboxError::TooLarge {
                path: requested.to_string(),
                limit,
            });
        }
        std::fs::read(path).map_err(io_err)
    }

    fn read_head(&self, path: &Path, requested: &str) -> Result<Vec<u8>, SandboxError> {
        if path.is_dir() {
            return Ok(Vec::new());
        }
        let io_err = |source| SandboxError::Io {
            path: requested.to_string(),
            source,
        };
        let mut head = Vec::with_capacity(SNIFF_BYTES);
        std::fs::File::open(path)
            .map_err(io_err)?
            .take(SNIFF_BYTES as u64)
            .read_to_end(&mut head)
            .map_err(io_err)?;
        Ok(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SandboxedFs) {
        let outer = TempDir::new().unwrap();
        let root = outer.path().join("uploads").join("math-hw-1");
        std::fs::create_dir_all(root.join("pages")).unwrap();
        std::fs::write(root.join("notes.txt"), "Student solved 8 of 10").unwrap();
        std::fs::write(outer.path().join("secret.txt"), "do not read").unwrap();
        let sandbox = SandboxedFs::open(&root).unwrap();
        (outer, sandbox)
    }

    #[test]
    fn open_rejects_missing_and_file_roots() {
        let outer = TempDir::new().unwrap();
        assert!(matches!(
            SandboxedFs::open(outer.path().join("missing")).unwrap_err(),
            SandboxError::Root { .. }
        ));
        let file = outer.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(
            SandboxedFs::open(&file).unwrap_err(),
            SandboxError::NotADirectory(_)
        ));
    }

    #[test]
    fn lists_and_reads_inside_root() {
        let (_outer, sandbox) = setup();
        let entries = sandbox.list_directory(".").unwrap();
        assert_eq!(
            entries,
            vec![
                Entry { name: "notes.txt".into(), is_dir: false },
                Entry { name: "pages".into(), is_dir: true },
            ]
        );
        assert_eq!(sandbox.read_text("notes.txt").unwrap(), "Student solved 8 of 10");
        let abs = sandbox.root().join("notes.txt");
        assert_eq!(sandbox.read_text(abs.to_str().unwrap()).unwrap(), "Student solved 8 of 10");
    }

    #[test]
    fn parent_traversal_is_refused() {
        let (_outer, sandbox) = setup();
        assert!(matches!(
            sandbox.read_text("../../secret.txt").unwrap_err(),
            SandboxError::OutsideRoot(_)
        ));
        assert!(matches!(
            sandbox.list_directory("pages/../..").unwrap_err(),
            SandboxError::OutsideRoot(_)
        ));
    }

    #[test]
    fn absolute_paths_outside_root_are_refused() {
        let (outer, sandbox) = setup();
        let secret = outer.path().join("secret.txt");
        assert!(matches!(
            sandbox.read_text(secret.to_str().unwrap()).unwrap_err(),
            SandboxError::OutsideRoot(_)
        ));
        assert!(matches!(
            sandbox.list_directory("/").unwrap_err(),
            SandboxError::OutsideRoot(_)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_escape_is_refused() {
        let (outer, sandbox) = setup();
        std::os::unix::fs::symlink(outer.path().join("secret.txt"), sandbox.root().join("link.txt"))
            .unwrap();
        assert!(matches!(
            sandbox.read_text("link.txt").unwrap_err(),
            SandboxError::OutsideRoot(_)
        ));
    }

    #[test]
    fn media_read_requires_an_image() {
        let (_outer, sandbox) = setup();
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        std::fs::write(sandbox.root().join("scan.png"), png).unwrap();
        let media = sandbox.read_media("scan.png").unwrap();
        assert_eq!(media.media_type, "image/png");
        assert!(matches!(
            sandbox.read_media("notes.txt").unwrap_err(),
            SandboxError::Unreadable { .. }
        ));
        assert_eq!(sandbox.kind("scan.png").unwrap(), FileKind::Image);
    }

    #[test]
    fn media_path_is_root_relative() {
        let (_outer, sandbox) = setup();
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        std::fs::write(sandbox.root().join("pages").join("p1.png"), png).unwrap();

        assert_eq!(sandbox.read_media("pages/p1.png").unwrap().path, "pages/p1.png");
        assert_eq!(sandbox.read_media("./pages/p1.png").unwrap().path, "pages/p1.png");
        let abs = sandbox.root().join("pages").join("p1.png");
        assert_eq!(sandbox.read_media(abs.to_str().unwrap()).unwrap().path, "pages/p1.png");
        assert_eq!(sandbox.display(sandbox.root()), ".");
    }
}
