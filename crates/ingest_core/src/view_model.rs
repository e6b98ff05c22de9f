use crate::{OperationId, OperationOutcome, Stage, StageStatus, StatusMessage, TelemetryCategory};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub can_submit: bool,
    pub can_cancel: bool,
    pub status: Option<StatusMessage>,
    pub operation_id: Option<OperationId>,
    pub outcome: Option<OperationOutcome>,
    pub stages: Vec<StageRowView>,
    pub elapsed_ms: Option<i64>,
    pub telemetry_categories: Vec<TelemetryCategory>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageRowView {
    pub index: u32,
    pub name: String,
    pub status: StageStatus,
    pub duration_ms: Option<f64>,
    pub size_bytes: Option<u64>,
    /// Remaining detail entries as `key=value` strings, sorted by key.
    pub extra: Vec<String>,
}

impl StageRowView {
    pub(crate) fn from_stage(stage: &Stage) -> Self {
        let extra = stage
            .detail
            .iter()
            .filter(|(key, _)| !is_summarized_key(key))
            .map(|(key, value)| match value.as_str() {
                Some(text) => format!("{key}={text}"),
                None => format!("{key}={value}"),
            })
            .collect();
        Self {
            index: stage.index,
            name: stage.name.clone(),
            status: stage.status,
            duration_ms: stage.duration_ms(),
            size_bytes: stage.size_bytes(),
            extra,
        }
    }
}

fn is_summarized_key(key: &str) -> bool {
    matches!(
        key,
        "duration_ms" | "elapsed_ms" | "size_bytes" | "file_size_bytes" | "bytes"
    )
}
