use crate::error::IngestError;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Flat-directory storage for uploaded files. The file is written before the
/// store commit; a store failure afterwards leaves the file behind as an
/// orphan, which the observed design accepts.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the upload under a sanitised, uuid-prefixed name and returns
    /// the full path. Uploads with colliding names never overwrite each
    /// other.
    pub fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, IngestError> {
        fs::create_dir_all(&self.root)?;

        let stored_name = format!("{}_{}", Uuid::new_v4(), sanitize_file_name(file_name));
        let path = self.root.join(stored_name);
        fs::write(&path, bytes)?;
        Ok(path)
    }
}

fn sanitize_file_name(file_name: &str) -> String {
    let cleaned: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .replace("..", "_");

    if cleaned.trim_matches('_').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
