#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open the network call and start the progress simulator.
    StartOperation {
        op_id: crate::OperationId,
        request: crate::IngestRequest,
    },
    /// Abort the network call and stop the simulator.
    CancelOperation { op_id: crate::OperationId },
}
