use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use engine_logging::{engine_debug, engine_trace, engine_warn};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::{EngineEvent, EventSink, OperationId};

/// Shortest interval the tick timer accepts.
pub const MIN_CADENCE: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct SimulatorSettings {
    /// Time between synthetic stage advances.
    pub cadence: Duration,
    /// Ticks emitted before the simulator stops on its own.
    pub max_ticks: u32,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            cadence: Duration::from_secs(3),
            max_ticks: 3,
        }
    }
}

/// Emits [`EngineEvent::SimulatorTick`] on a fixed cadence while the real
/// request is in flight.
#[derive(Debug, Clone, Default)]
pub struct ProgressSimulator {
    settings: SimulatorSettings,
}

impl ProgressSimulator {
    /// A zero cadence is raised to [`MIN_CADENCE`].
    pub fn new(mut settings: SimulatorSettings) -> Self {
        if settings.cadence < MIN_CADENCE {
            engine_warn!(
                "simulator cadence {:?} below minimum; using {:?}",
                settings.cadence,
                MIN_CADENCE
            );
            settings.cadence = MIN_CADENCE;
        }
        Self { settings }
    }

    /// Spawns the tick task on the current tokio runtime.
    pub fn start(&self, op_id: OperationId, sink: Arc<dyn EventSink>) -> SimulatorHandle {
        let stopped = Arc::new(Mutex::new(false));
        let task = tokio::spawn(run_ticks(
            op_id,
            self.settings.clone(),
            stopped.clone(),
            sink,
        ));
        engine_debug!(
            "simulator started for operation {} (cadence {:?}, cap {})",
            op_id,
            self.settings.cadence,
            self.settings.max_ticks
        );
        SimulatorHandle {
            op_id,
            stopped,
            task,
        }
    }
}

/// Owner of one running simulator. Dropping it stops the simulator.
#[derive(Debug)]
pub struct SimulatorHandle {
    op_id: OperationId,
    stopped: Arc<Mutex<bool>>,
    task: JoinHandle<()>,
}

impl SimulatorHandle {
    pub fn op_id(&self) -> OperationId {
        self.op_id
    }

    /// Stops ticking. Safe to call any number of times from any path.
    ///
    /// Takes the same lock the tick path holds while emitting, so once this
    /// returns no further tick is emitted for this handle.
    pub fn stop(&self) {
        let mut stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        if !*stopped {
            *stopped = true;
            engine_debug!("simulator stopped for operation {}", self.op_id);
        }
        drop(stopped);
        self.task.abort();
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SimulatorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_ticks(
    op_id: OperationId,
    settings: SimulatorSettings,
    stopped: Arc<Mutex<bool>>,
    sink: Arc<dyn EventSink>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + settings.cadence, settings.cadence);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for tick in 1..=settings.max_ticks {
        ticker.tick().await;
        if !emit_if_running(&stopped, sink.as_ref(), op_id, tick) {
            engine_trace!("tick {} for operation {} suppressed", tick, op_id);
            return;
        }
    }
    engine_debug!(
        "simulator for operation {} reached its cap after {} tick(s)",
        op_id,
        settings.max_ticks
    );
}

/// Checks the stop flag and emits under one lock.
fn emit_if_running(
    stopped: &Mutex<bool>,
    sink: &dyn EventSink,
    op_id: OperationId,
    tick: u32,
) -> bool {
    let stopped = stopped.lock().unwrap_or_else(PoisonError::into_inner);
    if *stopped {
        return false;
    }
    sink.emit(EngineEvent::SimulatorTick { op_id, tick });
    true
}
