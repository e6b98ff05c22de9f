use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form per-stage payload (durations, byte sizes, model names...).
pub type StageDetail = BTreeMap<String, Value>;

/// Canonical ingestion stages, in display order.
pub const DEFAULT_STAGE_NAMES: [&str; 4] = [
    "Transfer",
    "Transcription",
    "Embedding generation",
    "Persistence",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    InProgress,
    Completed,
    Errored,
    Cancelled,
}

impl StageStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StageStatus::Completed | StageStatus::Errored | StageStatus::Cancelled
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::InProgress => "in progress",
            StageStatus::Completed => "completed",
            StageStatus::Errored => "error",
            StageStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// 1-based display position, unique within an operation.
    pub index: u32,
    pub name: String,
    pub status: StageStatus,
    pub detail: StageDetail,
}

impl Stage {
    pub fn new(index: u32, name: impl Into<String>, status: StageStatus) -> Self {
        Self {
            index,
            name: name.into(),
            status,
            detail: StageDetail::new(),
        }
    }

    pub fn in_progress(index: u32, name: impl Into<String>) -> Self {
        Self::new(index, name, StageStatus::InProgress)
    }

    /// Reported duration in milliseconds, if the detail carries one.
    pub fn duration_ms(&self) -> Option<f64> {
        ["duration_ms", "elapsed_ms"]
            .iter()
            .find_map(|key| self.detail.get(*key).and_then(Value::as_f64))
    }

    /// Reported payload size in bytes, if the detail carries one.
    pub fn size_bytes(&self) -> Option<u64> {
        ["size_bytes", "file_size_bytes", "bytes"]
            .iter()
            .find_map(|key| self.detail.get(*key).and_then(Value::as_u64))
    }
}

/// Ordered stage names the simulator walks through.
///
/// Always holds at least one name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct StageTemplate {
    names: Vec<String>,
}

impl StageTemplate {
    /// Returns `None` when `names` is empty.
    pub fn new(names: Vec<String>) -> Option<Self> {
        if names.is_empty() {
            None
        } else {
            Some(Self { names })
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn first(&self) -> &str {
        &self.names[0]
    }

    /// Looks up the name at a 1-based stage index.
    pub fn name_at(&self, index: u32) -> Option<&str> {
        let position = usize::try_from(index).ok()?.checked_sub(1)?;
        self.names.get(position).map(String::as_str)
    }
}

impl Default for StageTemplate {
    fn default() -> Self {
        Self {
            names: DEFAULT_STAGE_NAMES.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl TryFrom<Vec<String>> for StageTemplate {
    type Error = String;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names).ok_or_else(|| "stage template needs at least one stage".to_string())
    }
}

impl From<StageTemplate> for Vec<String> {
    fn from(template: StageTemplate) -> Self {
        template.names
    }
}
