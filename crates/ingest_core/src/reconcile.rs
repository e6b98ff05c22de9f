use chrono::{DateTime, Utc};
use engine_logging::engine_warn;

use crate::operation::force_terminal;
use crate::{AuthoritativeStep, Operation, SettleResult, Stage, StageStatus};

/// Folds the network result into the operation's timeline.
///
/// A non-empty authoritative step list replaces the simulated stages
/// wholesale. Without one, open stages are completed. Failures mark open
/// stages as errored, aborts as cancelled. Terminal operations are returned
/// unchanged: the first terminal event wins.
pub fn reconcile(mut op: Operation, result: &SettleResult, at: DateTime<Utc>) -> Operation {
    if op.is_terminal() {
        return op;
    }
    match result {
        Ok(success) => {
            if let Some(steps) = success.authoritative_steps() {
                op.replace_stages(authoritative_stages(steps));
            }
            force_terminal(op, StageStatus::Completed, at)
        }
        Err(kind) if kind.is_aborted() => force_terminal(op, StageStatus::Cancelled, at),
        Err(_) => force_terminal(op, StageStatus::Errored, at),
    }
}

/// Orders backend steps by their reported index, then numbers them 1..=n.
///
/// Stage indices stay contiguous even if the backend repeats or skips a step
/// number; the sort is stable, so repeated numbers keep their reported order.
fn authoritative_stages(steps: &[AuthoritativeStep]) -> Vec<Stage> {
    let mut ordered: Vec<&AuthoritativeStep> = steps.iter().collect();
    ordered.sort_by_key(|step| step.step);
    ordered
        .into_iter()
        .zip(1u32..)
        .map(|(step, index)| {
            if step.step != index {
                engine_warn!(
                    "backend step {} (\"{}\") renumbered to {}",
                    step.step,
                    step.name,
                    index
                );
            }
            Stage {
                index,
                name: step.name.clone(),
                status: StageStatus::Completed,
                detail: step.details.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::advance;
    use crate::{FailureKind, IngestSuccess, OperationOutcome, StageDetail, StageTemplate};
    use serde_json::json;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn running_op() -> Operation {
        advance(Operation::create_initial(1, StageTemplate::default(), at(0)))
    }

    fn step(step: u32, name: &str, duration_ms: u64) -> AuthoritativeStep {
        let mut details = StageDetail::new();
        details.insert("duration_ms".into(), json!(duration_ms));
        AuthoritativeStep {
            step,
            name: name.into(),
            details,
        }
    }

    #[test]
    fn authoritative_steps_replace_simulated_timeline() {
        let success = IngestSuccess {
            title: "clip".into(),
            steps: Some(vec![
                step(2, "Transcribe", 800),
                step(1, "Upload", 120),
                step(3, "Embed", 40),
            ]),
            ..IngestSuccess::default()
        };
        let op = reconcile(running_op(), &Ok(success), at(900));

        let names: Vec<&str> = op.stages().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Upload", "Transcribe", "Embed"]);
        assert!(op
            .stages()
            .iter()
            .all(|s| s.status == StageStatus::Completed));
        assert_eq!(op.stages()[1].duration_ms(), Some(800.0));
        assert_eq!(op.outcome(), OperationOutcome::Succeeded);
    }

    #[test]
    fn empty_step_list_falls_back_to_completing_simulation() {
        let success = IngestSuccess {
            title: "clip".into(),
            steps: Some(Vec::new()),
            ..IngestSuccess::default()
        };
        let op = reconcile(running_op(), &Ok(success), at(900));
        assert_eq!(op.stages().len(), 2);
        assert!(op
            .stages()
            .iter()
            .all(|s| s.status == StageStatus::Completed));
    }

    #[test]
    fn failure_marks_open_stages_errored() {
        let op = reconcile(
            running_op(),
            &Err(FailureKind::Network("refused".into())),
            at(900),
        );
        let statuses: Vec<_> = op.stages().iter().map(|s| s.status).collect();
        assert_eq!(statuses, vec![StageStatus::Completed, StageStatus::Errored]);
        assert_eq!(op.outcome(), OperationOutcome::Failed);
    }

    #[test]
    fn abort_marks_open_stages_cancelled() {
        let op = reconcile(running_op(), &Err(FailureKind::Aborted), at(900));
        assert_eq!(op.stages()[1].status, StageStatus::Cancelled);
        assert_eq!(op.outcome(), OperationOutcome::Cancelled);
    }

    #[test]
    fn irregular_step_numbers_are_renumbered_contiguously() {
        let success = IngestSuccess {
            title: "clip".into(),
            steps: Some(vec![
                step(5, "Persist", 10),
                step(0, "Receive", 20),
                step(2, "Transcribe", 30),
                step(2, "Embed", 40),
            ]),
            ..IngestSuccess::default()
        };
        let op = reconcile(running_op(), &Ok(success), at(900));

        let rows: Vec<(u32, &str)> = op
            .stages()
            .iter()
            .map(|s| (s.index, s.name.as_str()))
            .collect();
        assert_eq!(
            rows,
            vec![(1, "Receive"), (2, "Transcribe"), (3, "Embed"), (4, "Persist")]
        );
    }

    #[test]
    fn first_terminal_result_wins() {
        let cancelled = reconcile(running_op(), &Err(FailureKind::Aborted), at(900));
        let late = reconcile(
            cancelled.clone(),
            &Ok(IngestSuccess {
                title: "late".into(),
                ..IngestSuccess::default()
            }),
            at(1_000),
        );
        assert_eq!(late, cancelled);
    }
}
