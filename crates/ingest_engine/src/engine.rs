use std::sync::{mpsc, Arc};
use std::thread;

use engine_logging::{engine_debug, engine_info, engine_warn};

use crate::simulator::{ProgressSimulator, SimulatorSettings};
use crate::submit::{ReqwestSubmitter, SubmitSettings, Submitter};
use crate::{CancellationController, EngineEvent, EventSink, IngestPayload, OperationId};

#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub submit: SubmitSettings,
    pub simulator: SimulatorSettings,
}

enum EngineCommand {
    Start {
        op_id: OperationId,
        payload: IngestPayload,
    },
    Cancel {
        op_id: OperationId,
    },
}

/// Runs ingestion IO on a dedicated tokio runtime thread.
///
/// Commands are handled in order on that thread; results come back through
/// the [`EventSink`] given at construction.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings, sink: Arc<dyn EventSink>) -> Self {
        let submitter = Arc::new(ReqwestSubmitter::new(settings.submit));
        Self::with_submitter(settings.simulator, submitter, sink)
    }

    pub fn with_submitter(
        simulator: SimulatorSettings,
        submitter: Arc<dyn Submitter>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            let mut dispatcher =
                Dispatcher::new(ProgressSimulator::new(simulator), submitter, sink);
            while let Ok(command) = cmd_rx.recv() {
                let _guard = runtime.enter();
                dispatcher.handle(command);
            }
            engine_debug!("engine command channel closed; shutting down runtime");
        });

        Self { cmd_tx }
    }

    pub fn start(&self, op_id: OperationId, payload: IngestPayload) {
        let _ = self.cmd_tx.send(EngineCommand::Start { op_id, payload });
    }

    pub fn cancel(&self, op_id: OperationId) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel { op_id });
    }
}

struct Dispatcher {
    simulator: ProgressSimulator,
    submitter: Arc<dyn Submitter>,
    sink: Arc<dyn EventSink>,
    active: Option<(OperationId, Arc<CancellationController>)>,
}

impl Dispatcher {
    fn new(
        simulator: ProgressSimulator,
        submitter: Arc<dyn Submitter>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            simulator,
            submitter,
            sink,
            active: None,
        }
    }

    /// Must run inside the runtime context; spawns the operation's tasks.
    fn handle(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Start { op_id, payload } => self.start(op_id, payload),
            EngineCommand::Cancel { op_id } => self.cancel(op_id),
        }
    }

    fn start(&mut self, op_id: OperationId, payload: IngestPayload) {
        if let Some((previous, controller)) = self.active.take() {
            if controller.cancel() {
                engine_warn!(
                    "operation {} still running when {} started; cancelled it",
                    previous,
                    op_id
                );
            }
        }

        let controller = Arc::new(CancellationController::new());
        controller.attach_simulator(self.simulator.start(op_id, self.sink.clone()));
        self.active = Some((op_id, controller.clone()));
        engine_info!("operation {} submitting {:?}", op_id, payload.file);

        let submitter = self.submitter.clone();
        let sink = self.sink.clone();
        tokio::spawn(async move {
            let token = controller.token();
            let result = submitter.submit(&payload, &token).await;
            match &result {
                Err(err) if err.is_aborted() => {
                    controller.cancel();
                }
                Err(err) => {
                    controller.finish();
                    engine_warn!("operation {} failed: {}", op_id, err);
                }
                Ok(success) => {
                    controller.finish();
                    engine_info!(
                        "operation {} succeeded: \"{}\"",
                        op_id,
                        success.body.title
                    );
                }
            }
            sink.emit(EngineEvent::Settled { op_id, result });
        });
    }

    fn cancel(&mut self, op_id: OperationId) {
        match &self.active {
            Some((active_id, controller)) if *active_id == op_id => {
                controller.cancel();
            }
            _ => engine_debug!("cancel for operation {} ignored: not active", op_id),
        }
    }
}
