use std::fmt;
use std::path::PathBuf;

use serde_json::Value;

use crate::wire::IngestResponse;

pub type OperationId = u64;

/// Media file plus the optional form fields sent alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestPayload {
    pub file: PathBuf,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitSuccess {
    pub body: IngestResponse,
    /// The body as received, for telemetry.
    pub raw: Value,
    pub payload_bytes: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The progress simulator fired; `tick` counts from 1.
    SimulatorTick { op_id: OperationId, tick: u32 },
    /// The ingestion request reached a terminal result.
    Settled {
        op_id: OperationId,
        result: Result<SubmitSuccess, SubmitError>,
    },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct SubmitError {
    pub kind: FailureKind,
    pub message: String,
    /// Error body as received, when it was JSON.
    pub raw: Option<Value>,
}

impl SubmitError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            raw: None,
        }
    }

    pub(crate) fn aborted() -> Self {
        Self::new(FailureKind::Aborted, "request aborted by cancellation")
    }

    pub(crate) fn with_raw(mut self, raw: Option<Value>) -> Self {
        self.raw = raw;
        self
    }

    pub fn is_aborted(&self) -> bool {
        self.kind == FailureKind::Aborted
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    UnreadableFile,
    /// Non-2xx response; the message carries the server's `detail`.
    Backend { status: u16 },
    MalformedResponse,
    Timeout,
    Network,
    Aborted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::UnreadableFile => write!(f, "unreadable file"),
            FailureKind::Backend { status } => write!(f, "backend status {status}"),
            FailureKind::MalformedResponse => write!(f, "malformed response"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Aborted => write!(f, "aborted"),
        }
    }
}
