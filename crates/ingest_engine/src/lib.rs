//! Ingest engine: upload transport, progress simulation and cancellation.
mod cancel;
mod engine;
mod simulator;
mod sink;
mod submit;
mod types;
pub mod wire;

pub use cancel::CancellationController;
pub use engine::{EngineHandle, EngineSettings};
pub use simulator::{ProgressSimulator, SimulatorHandle, SimulatorSettings, MIN_CADENCE};
pub use sink::{ChannelEventSink, EventSink};
pub use submit::{ReqwestSubmitter, SubmitSettings, Submitter};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    EngineEvent, FailureKind, IngestPayload, OperationId, SubmitError, SubmitSuccess,
};
