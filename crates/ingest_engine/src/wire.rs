//! JSON bodies exchanged with the ingestion endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub title: String,
    #[serde(default)]
    pub mongodb_operation: Option<StorageOperation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageOperation {
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub result: Option<StorageResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageResult {
    #[serde(default)]
    pub workflow_steps: Option<Vec<WorkflowStep>>,
    #[serde(default)]
    pub total_duration_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub step: u32,
    pub name: String,
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl IngestResponse {
    pub fn workflow_steps(&self) -> Option<&[WorkflowStep]> {
        self.mongodb_operation
            .as_ref()?
            .result
            .as_ref()?
            .workflow_steps
            .as_deref()
    }

    pub fn total_duration_ms(&self) -> Option<f64> {
        self.mongodb_operation
            .as_ref()?
            .result
            .as_ref()?
            .total_duration_ms
    }

    pub fn operation(&self) -> Option<&str> {
        self.mongodb_operation
            .as_ref()
            .map(|op| op.operation.as_str())
            .filter(|op| !op.is_empty())
    }
}

/// Error body of a non-2xx response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: Value,
}

impl ErrorBody {
    /// `detail` is usually a string; validation errors send a list.
    pub(crate) fn message(&self) -> String {
        match &self.detail {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}
