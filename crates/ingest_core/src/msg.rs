use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User picked (or cleared) the media file.
    FileSelected(Option<PathBuf>),
    /// User edited the optional title.
    TitleChanged(String),
    /// User edited the raw tag list.
    TagsChanged(String),
    /// User edited the language hint.
    LanguageChanged(String),
    /// User submitted the form for ingestion.
    SubmitClicked { at: DateTime<Utc> },
    /// User asked to cancel the running ingestion.
    CancelClicked { at: DateTime<Utc> },
    /// Progress simulator fired for an operation.
    SimulatorTick { op_id: crate::OperationId },
    /// The network half of an operation reached a terminal result.
    OperationSettled {
        op_id: crate::OperationId,
        result: crate::SettleResult,
        /// Raw response body, kept verbatim for telemetry.
        raw_response: Option<Value>,
        payload_bytes: Option<u64>,
        at: DateTime<Utc>,
    },
    /// Another collaborator (search, chat, listing) captured telemetry.
    TelemetryCaptured(crate::TelemetryRecord),
    /// UI/render tick to coalesce rendering.
    Tick,
}
