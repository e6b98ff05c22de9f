use engine_logging::engine_debug;

use crate::{AppState, Effect, Msg, StatusLevel};

/// Pure update function: applies a message to state and returns any effects.
///
/// This is the single place where tick, settle and cancel events meet. The
/// first terminal event for an operation wins; ticks and results arriving
/// after it are dropped, which gives cancellation precedence over the
/// authoritative result and both precedence over simulated ticks.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FileSelected(file) => {
            state.form_mut().file = file;
            Vec::new()
        }
        Msg::TitleChanged(title) => {
            state.form_mut().title = title;
            Vec::new()
        }
        Msg::TagsChanged(tags) => {
            state.form_mut().tags = tags;
            Vec::new()
        }
        Msg::LanguageChanged(language) => {
            state.form_mut().language = language;
            Vec::new()
        }
        Msg::SubmitClicked { at } => {
            if state.is_busy() {
                engine_debug!("submit ignored: an ingestion is already in flight");
                return (state, Vec::new());
            }
            match state.form().to_request() {
                Ok(request) => {
                    let op_id = state.begin_operation(request.clone(), at);
                    vec![Effect::StartOperation { op_id, request }]
                }
                Err(err) => {
                    state.set_status(StatusLevel::Error, err.to_string());
                    Vec::new()
                }
            }
        }
        Msg::CancelClicked { at } => match state.apply_cancel(at) {
            Some(op_id) => vec![Effect::CancelOperation { op_id }],
            None => Vec::new(),
        },
        Msg::SimulatorTick { op_id } => {
            state.apply_tick(op_id);
            Vec::new()
        }
        Msg::OperationSettled {
            op_id,
            result,
            raw_response,
            payload_bytes,
            at,
        } => {
            state.apply_settled(op_id, &result, raw_response, payload_bytes, at);
            Vec::new()
        }
        Msg::TelemetryCaptured(record) => {
            state.record_telemetry(record);
            Vec::new()
        }
        Msg::Tick => Vec::new(),
    };

    (state, effects)
}
