use chrono::{DateTime, Utc};
use engine_logging::{engine_debug, engine_info};
use serde_json::{json, Value};

use crate::operation::{advance, force_terminal};
use crate::result::CANCELLED_MESSAGE;
use crate::view_model::{AppViewModel, StageRowView};
use crate::{
    reconcile, IngestForm, IngestRequest, Operation, OperationId, SettleResult, StageStatus,
    StageTemplate, TelemetryCategory, TelemetryRecord, TelemetryStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

/// Everything the UI root owns: form, active operation and telemetry.
///
/// Only [`crate::update`] mutates it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    template: StageTemplate,
    form: IngestForm,
    next_op_id: OperationId,
    operation: Option<Operation>,
    active_request: Option<IngestRequest>,
    telemetry: TelemetryStore,
    status: Option<StatusMessage>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(template: StageTemplate) -> Self {
        Self {
            template,
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        let busy = self.is_busy();
        AppViewModel {
            can_submit: !busy,
            can_cancel: busy,
            status: self.status.clone(),
            operation_id: self.operation.as_ref().map(Operation::id),
            outcome: self.operation.as_ref().map(Operation::outcome),
            stages: self
                .operation
                .as_ref()
                .map(|op| op.stages().iter().map(StageRowView::from_stage).collect())
                .unwrap_or_default(),
            elapsed_ms: self.operation.as_ref().and_then(Operation::elapsed_ms),
            telemetry_categories: self.telemetry.categories(),
            dirty: self.dirty,
        }
    }

    pub fn operation(&self) -> Option<&Operation> {
        self.operation.as_ref()
    }

    pub fn telemetry(&self) -> &TelemetryStore {
        &self.telemetry
    }

    pub fn form(&self) -> &IngestForm {
        &self.form
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    /// True while an operation is in flight; submission is disabled then.
    pub fn is_busy(&self) -> bool {
        self.operation.as_ref().is_some_and(|op| !op.is_terminal())
    }

    /// Returns whether anything changed since the last call, clearing the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn form_mut(&mut self) -> &mut IngestForm {
        self.dirty = true;
        &mut self.form
    }

    pub(crate) fn set_status(&mut self, level: StatusLevel, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            level,
            text: text.into(),
        });
        self.dirty = true;
    }

    /// Replaces any previous operation with a fresh one.
    pub(crate) fn begin_operation(
        &mut self,
        request: IngestRequest,
        at: DateTime<Utc>,
    ) -> OperationId {
        self.next_op_id += 1;
        let op_id = self.next_op_id;
        engine_info!(
            "operation {} created for {} (title={:?}, tags={:?})",
            op_id,
            request.file_name(),
            request.title,
            request.tags
        );
        self.set_status(
            StatusLevel::Info,
            format!("Uploading {}...", request.file_name()),
        );
        self.operation = Some(Operation::create_initial(op_id, self.template.clone(), at));
        self.active_request = Some(request);
        op_id
    }

    /// The operation with `op_id`, only while it is still in flight.
    fn live_operation_id(&self, op_id: OperationId) -> Option<OperationId> {
        self.operation
            .as_ref()
            .filter(|op| op.id() == op_id && !op.is_terminal())
            .map(Operation::id)
    }

    /// Applies one simulated step. Stale ticks are discarded.
    pub(crate) fn apply_tick(&mut self, op_id: OperationId) -> bool {
        if self.live_operation_id(op_id).is_none() {
            engine_debug!("discarding stale simulator tick for operation {}", op_id);
            return false;
        }
        let Some(op) = self.operation.take() else {
            return false;
        };
        let before = op.current_stage().map(|stage| stage.index);
        let op = advance(op);
        let after = op.current_stage().map(|stage| stage.index);
        self.operation = Some(op);

        if before == after {
            engine_debug!("simulator tick for operation {} hit the stage cap", op_id);
            return false;
        }
        engine_debug!(
            "operation {} simulated stage {:?} -> {:?}",
            op_id,
            before,
            after
        );
        self.mark_dirty();
        true
    }

    /// Cancels the in-flight operation, returning its id.
    pub(crate) fn apply_cancel(&mut self, at: DateTime<Utc>) -> Option<OperationId> {
        let op_id = self
            .operation
            .as_ref()
            .filter(|op| !op.is_terminal())
            .map(Operation::id)?;
        let op = self.operation.take()?;
        self.operation = Some(force_terminal(op, StageStatus::Cancelled, at));
        engine_info!("operation {} cancelled by user", op_id);

        self.set_status(StatusLevel::Warning, CANCELLED_MESSAGE);
        self.capture_ingestion(None, Some(json!({ "cancelled": true })), at);
        Some(op_id)
    }

    /// Applies the terminal network result. Results for anything but the
    /// live operation are discarded.
    pub(crate) fn apply_settled(
        &mut self,
        op_id: OperationId,
        result: &SettleResult,
        raw_response: Option<Value>,
        payload_bytes: Option<u64>,
        at: DateTime<Utc>,
    ) -> bool {
        if self.live_operation_id(op_id).is_none() {
            engine_debug!(
                "discarding result for operation {} that is no longer live",
                op_id
            );
            return false;
        }
        let Some(op) = self.operation.take() else {
            return false;
        };
        let op = reconcile(op, result, at);
        engine_info!(
            "operation {} settled as {:?} with {} stage(s)",
            op_id,
            op.outcome(),
            op.stages().len()
        );
        let elapsed_ms = op.elapsed_ms();
        self.operation = Some(op);

        match result {
            Ok(success) => {
                let duration_ms = success
                    .total_duration_ms
                    .map(|ms| ms.round() as i64)
                    .or(elapsed_ms);
                let mut text = format!("Ingested \"{}\"", success.title);
                if let Some(operation) = &success.operation {
                    text.push_str(&format!(" ({operation})"));
                }
                if let Some(ms) = duration_ms {
                    text.push_str(&format!(" in {ms} ms"));
                }
                self.set_status(StatusLevel::Success, text);
            }
            Err(kind) if kind.is_aborted() => {
                self.set_status(StatusLevel::Warning, kind.user_message());
            }
            Err(kind) => {
                self.set_status(StatusLevel::Error, kind.user_message());
            }
        }

        let response = raw_response.or_else(|| {
            result
                .as_ref()
                .err()
                .map(|kind| json!({ "error": kind.to_string() }))
        });
        self.capture_ingestion(payload_bytes, response, at);
        true
    }

    pub(crate) fn record_telemetry(&mut self, record: TelemetryRecord) {
        engine_debug!("telemetry captured for {}", record.category);
        self.telemetry.record(record);
        self.mark_dirty();
    }

    fn capture_ingestion(
        &mut self,
        payload_bytes: Option<u64>,
        response: Option<Value>,
        at: DateTime<Utc>,
    ) {
        let request = self
            .active_request
            .as_ref()
            .map(|request| request.telemetry_value(payload_bytes));
        self.record_telemetry(TelemetryRecord {
            category: TelemetryCategory::Ingestion,
            request,
            response,
            captured_at: at,
        });
    }
}
