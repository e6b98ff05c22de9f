//! Ingest core: pure operation state machine, reconciliation and view-model helpers.
mod effect;
mod form;
mod msg;
mod operation;
mod reconcile;
mod result;
mod stage;
mod state;
mod telemetry;
mod update;
mod view_model;

pub use effect::Effect;
pub use form::{IngestForm, IngestRequest, ValidationError};
pub use msg::Msg;
pub use operation::{advance, force_terminal, Operation, OperationId, OperationOutcome};
pub use reconcile::reconcile;
pub use result::{AuthoritativeStep, FailureKind, IngestSuccess, SettleResult};
pub use stage::{Stage, StageDetail, StageStatus, StageTemplate, DEFAULT_STAGE_NAMES};
pub use state::{AppState, StatusLevel, StatusMessage};
pub use telemetry::{TelemetryCategory, TelemetryRecord, TelemetryStore};
pub use update::update;
pub use view_model::{AppViewModel, StageRowView};
