use std::sync::{mpsc, Arc};

use chrono::{DateTime, Utc};
use engine_logging::{engine_info, engine_warn};
use ingest_core::{AuthoritativeStep, Effect, FailureKind, IngestRequest, IngestSuccess, Msg};
use ingest_engine::wire::IngestResponse;
use ingest_engine::{
    EngineEvent, EngineHandle, EngineSettings, EventSink, IngestPayload, OperationId,
    SubmitError, SubmitSuccess,
};

/// Turns reducer effects into engine commands.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(settings: EngineSettings, msg_tx: mpsc::Sender<Msg>) -> Self {
        let sink = Arc::new(MsgSink { msg_tx });
        Self {
            engine: EngineHandle::new(settings, sink),
        }
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartOperation { op_id, request } => {
                    engine_info!("StartOperation op_id={} file={:?}", op_id, request.file);
                    self.engine.start(op_id, to_payload(request));
                }
                Effect::CancelOperation { op_id } => {
                    engine_info!("CancelOperation op_id={}", op_id);
                    self.engine.cancel(op_id);
                }
            }
        }
    }
}

/// Feeds engine events back into the message loop.
struct MsgSink {
    msg_tx: mpsc::Sender<Msg>,
}

impl EventSink for MsgSink {
    fn emit(&self, event: EngineEvent) {
        let msg = match event {
            EngineEvent::SimulatorTick { op_id, .. } => Msg::SimulatorTick { op_id },
            EngineEvent::Settled { op_id, result } => settle_msg(op_id, result, Utc::now()),
        };
        let _ = self.msg_tx.send(msg);
    }
}

fn to_payload(request: IngestRequest) -> IngestPayload {
    IngestPayload {
        file: request.file,
        title: request.title,
        tags: request.tags,
        language: request.language,
    }
}

fn settle_msg(
    op_id: OperationId,
    result: Result<SubmitSuccess, SubmitError>,
    at: DateTime<Utc>,
) -> Msg {
    match result {
        Ok(success) => Msg::OperationSettled {
            op_id,
            result: Ok(to_success(&success.body)),
            raw_response: Some(success.raw),
            payload_bytes: Some(success.payload_bytes),
            at,
        },
        Err(err) => {
            if !err.is_aborted() {
                engine_warn!("Operation {} failed: {}", op_id, err);
            }
            let raw_response = err.raw.clone();
            Msg::OperationSettled {
                op_id,
                result: Err(to_failure(err)),
                raw_response,
                payload_bytes: None,
                at,
            }
        }
    }
}

fn to_success(body: &IngestResponse) -> IngestSuccess {
    let steps = body.workflow_steps().map(|steps| {
        steps
            .iter()
            .map(|step| AuthoritativeStep {
                step: step.step,
                name: step.name.clone(),
                details: step
                    .details
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            })
            .collect()
    });
    IngestSuccess {
        title: body.title.clone(),
        operation: body.operation().map(str::to_string),
        steps,
        total_duration_ms: body.total_duration_ms(),
    }
}

fn to_failure(err: SubmitError) -> FailureKind {
    use ingest_engine::FailureKind as Engine;

    match err.kind {
        Engine::Backend { status } => FailureKind::Backend {
            status,
            detail: err.message,
        },
        Engine::MalformedResponse => FailureKind::MalformedResponse(err.message),
        Engine::UnreadableFile => FailureKind::UnreadableFile(err.message),
        Engine::Aborted => FailureKind::Aborted,
        Engine::InvalidUrl | Engine::Timeout | Engine::Network => FailureKind::Network(err.message),
    }
}
