use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::{json, Value};

/// What the user has entered so far. Survives across operations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IngestForm {
    pub file: Option<PathBuf>,
    pub title: String,
    pub tags: String,
    pub language: String,
}

/// A validated submission, ready for the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestRequest {
    pub file: PathBuf,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    NoFileSelected,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::NoFileSelected => write!(f, "Please select a media file to upload."),
        }
    }
}

impl IngestForm {
    pub fn to_request(&self) -> Result<IngestRequest, ValidationError> {
        let file = self
            .file
            .as_ref()
            .filter(|path| !path.as_os_str().is_empty())
            .cloned()
            .ok_or(ValidationError::NoFileSelected)?;
        Ok(IngestRequest {
            file,
            title: non_empty(&self.title),
            tags: parse_tags(&self.tags),
            language: non_empty(&self.language),
        })
    }
}

impl IngestRequest {
    pub fn file_name(&self) -> String {
        self.file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file.display().to_string())
    }

    /// Request half of the ingestion telemetry record.
    pub fn telemetry_value(&self, payload_bytes: Option<u64>) -> Value {
        json!({
            "file_name": self.file_name(),
            "size_bytes": payload_bytes,
            "title": self.title,
            "tags": self.tags,
            "language": self.language,
        })
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Splits on commas and whitespace, dropping empties.
fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
