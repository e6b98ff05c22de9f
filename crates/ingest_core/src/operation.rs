use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Stage, StageStatus, StageTemplate};

pub type OperationId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationOutcome {
    Pending,
    Succeeded,
    Failed,
    Cancelled,
}

impl OperationOutcome {
    /// Outcome implied by forcing every open stage to `status`.
    fn from_forced(status: StageStatus) -> Option<Self> {
        match status {
            StageStatus::Completed => Some(OperationOutcome::Succeeded),
            StageStatus::Errored => Some(OperationOutcome::Failed),
            StageStatus::Cancelled => Some(OperationOutcome::Cancelled),
            StageStatus::Pending | StageStatus::InProgress => None,
        }
    }
}

/// One ingestion attempt and its stage timeline.
///
/// Mutation goes through [`advance`], [`force_terminal`] and
/// [`crate::reconcile`]; each takes the operation by value and hands it back.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    id: OperationId,
    template: StageTemplate,
    stages: Vec<Stage>,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    outcome: OperationOutcome,
}

impl Operation {
    /// A fresh operation with the template's first stage in progress.
    pub fn create_initial(
        id: OperationId,
        template: StageTemplate,
        started_at: DateTime<Utc>,
    ) -> Self {
        let first = Stage::in_progress(1, template.first());
        Self {
            id,
            template,
            stages: vec![first],
            started_at,
            ended_at: None,
            outcome: OperationOutcome::Pending,
        }
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn outcome(&self) -> OperationOutcome {
        self.outcome
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome != OperationOutcome::Pending
    }

    /// The stage currently shown as running, if any.
    pub fn current_stage(&self) -> Option<&Stage> {
        self.stages
            .iter()
            .find(|stage| stage.status == StageStatus::InProgress)
    }

    /// Wall-clock duration, once the operation has ended.
    pub fn elapsed_ms(&self) -> Option<i64> {
        self.ended_at
            .map(|ended| (ended - self.started_at).num_milliseconds())
    }

    pub(crate) fn replace_stages(&mut self, stages: Vec<Stage>) {
        self.stages = stages;
    }

    pub(crate) fn stages_mut(&mut self) -> &mut [Stage] {
        &mut self.stages
    }

    pub(crate) fn finish(&mut self, outcome: OperationOutcome, at: DateTime<Utc>) {
        self.outcome = outcome;
        self.ended_at = Some(at);
    }
}

/// Completes the running stage and starts the next template stage.
///
/// No-op at the last template stage (the cap) and on terminal operations.
pub fn advance(mut op: Operation) -> Operation {
    if op.is_terminal() {
        return op;
    }
    let Some(position) = op
        .stages
        .iter()
        .position(|stage| stage.status == StageStatus::InProgress)
    else {
        return op;
    };

    let next_index = op.stages[position].index + 1;
    let Some(next_name) = op.template.name_at(next_index).map(str::to_owned) else {
        return op;
    };

    op.stages[position].status = StageStatus::Completed;
    match op.stages.iter_mut().find(|stage| stage.index == next_index) {
        Some(next) => next.status = StageStatus::InProgress,
        None => op.stages.push(Stage::in_progress(next_index, next_name)),
    }
    op
}

/// Moves every open stage to `status` and ends the operation.
///
/// `status` must be terminal; a non-terminal status leaves `op` untouched.
/// Already terminal operations are returned as-is.
pub fn force_terminal(mut op: Operation, status: StageStatus, at: DateTime<Utc>) -> Operation {
    if op.is_terminal() {
        return op;
    }
    let Some(outcome) = OperationOutcome::from_forced(status) else {
        engine_logging::engine_warn!(
            "refusing to force operation {} into non-terminal status {:?}",
            op.id,
            status
        );
        return op;
    };

    for stage in op.stages_mut() {
        if !stage.status.is_terminal() {
            stage.status = status;
        }
    }
    op.finish(outcome, at);
    op
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn statuses(op: &Operation) -> Vec<StageStatus> {
        op.stages().iter().map(|stage| stage.status).collect()
    }

    #[test]
    fn initial_operation_has_single_running_stage() {
        let op = Operation::create_initial(1, StageTemplate::default(), at(0));
        assert_eq!(op.stages().len(), 1);
        assert_eq!(op.stages()[0].index, 1);
        assert_eq!(op.stages()[0].name, "Transfer");
        assert_eq!(op.stages()[0].status, StageStatus::InProgress);
        assert!(op.stages()[0].detail.is_empty());
        assert_eq!(op.outcome(), OperationOutcome::Pending);
        assert_eq!(op.ended_at(), None);
    }

    #[test]
    fn advance_walks_template_and_stops_at_cap() {
        let mut op = Operation::create_initial(1, StageTemplate::default(), at(0));
        for _ in 0..3 {
            op = advance(op);
        }
        assert_eq!(
            statuses(&op),
            vec![
                StageStatus::Completed,
                StageStatus::Completed,
                StageStatus::Completed,
                StageStatus::InProgress,
            ]
        );

        let capped = advance(op.clone());
        assert_eq!(capped, op);
    }

    #[test]
    fn advance_keeps_indices_contiguous() {
        let mut op = Operation::create_initial(1, StageTemplate::default(), at(0));
        op = advance(advance(op));
        let indices: Vec<u32> = op.stages().iter().map(|stage| stage.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(op.current_stage().map(|stage| stage.name.as_str()), Some("Embedding generation"));
    }

    #[test]
    fn force_terminal_only_touches_open_stages() {
        let op = advance(Operation::create_initial(3, StageTemplate::default(), at(0)));
        let op = force_terminal(op, StageStatus::Cancelled, at(1_000));
        assert_eq!(
            statuses(&op),
            vec![StageStatus::Completed, StageStatus::Cancelled]
        );
        assert_eq!(op.outcome(), OperationOutcome::Cancelled);
        assert_eq!(op.elapsed_ms(), Some(1_000));
    }

    #[test]
    fn terminal_operation_ignores_further_transitions() {
        let op = Operation::create_initial(1, StageTemplate::default(), at(0));
        let op = force_terminal(op, StageStatus::Errored, at(10));
        let again = force_terminal(op.clone(), StageStatus::Cancelled, at(20));
        assert_eq!(again, op);
        assert_eq!(advance(op.clone()), op);
    }

    #[test]
    fn non_terminal_force_is_rejected() {
        let op = Operation::create_initial(1, StageTemplate::default(), at(0));
        let same = force_terminal(op.clone(), StageStatus::Pending, at(10));
        assert_eq!(same, op);
    }
}
