use std::fmt;

use serde::{Deserialize, Serialize};

use crate::StageDetail;

/// One backend-reported step of a finished ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthoritativeStep {
    pub step: u32,
    pub name: String,
    pub details: StageDetail,
}

/// Normalized success body of an ingestion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IngestSuccess {
    pub title: String,
    pub operation: Option<String>,
    /// `None` when the backend sent no step list at all.
    pub steps: Option<Vec<AuthoritativeStep>>,
    pub total_duration_ms: Option<f64>,
}

impl IngestSuccess {
    /// The authoritative timeline, if the backend sent a usable one.
    pub fn authoritative_steps(&self) -> Option<&[AuthoritativeStep]> {
        self.steps.as_deref().filter(|steps| !steps.is_empty())
    }
}

/// Why an operation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Non-2xx response; `detail` is the server message.
    Backend { status: u16, detail: String },
    /// 2xx response whose body could not be understood.
    MalformedResponse(String),
    /// Transport failure, including client-side timeouts.
    Network(String),
    /// The selected file could not be read for upload.
    UnreadableFile(String),
    /// The request was aborted by the cancellation token.
    Aborted,
}

impl FailureKind {
    pub fn is_aborted(&self) -> bool {
        matches!(self, FailureKind::Aborted)
    }

    /// Status line shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            FailureKind::Backend { detail, .. } => format!("Ingestion failed: {detail}"),
            FailureKind::MalformedResponse(reason) => {
                format!("Ingestion failed: the server sent an unexpected response ({reason})")
            }
            FailureKind::Network(_) => "Network error: could not reach the ingestion service. \
                 Check your connection and try again."
                .to_string(),
            FailureKind::UnreadableFile(reason) => {
                format!("Could not read the selected file: {reason}")
            }
            FailureKind::Aborted => CANCELLED_MESSAGE.to_string(),
        }
    }
}

pub(crate) const CANCELLED_MESSAGE: &str = "Ingestion cancelled. Progress is no longer tracked.";

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Backend { status, detail } => write!(f, "backend error {status}: {detail}"),
            FailureKind::MalformedResponse(reason) => write!(f, "malformed response: {reason}"),
            FailureKind::Network(reason) => write!(f, "network error: {reason}"),
            FailureKind::UnreadableFile(reason) => write!(f, "unreadable file: {reason}"),
            FailureKind::Aborted => write!(f, "aborted"),
        }
    }
}

/// Terminal result of the network half of an operation.
pub type SettleResult = Result<IngestSuccess, FailureKind>;
