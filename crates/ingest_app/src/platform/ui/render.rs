use ingest_core::{AppViewModel, OperationOutcome, StageRowView, StageStatus, StatusLevel};

/// Text lines for one redraw of the progress display.
pub fn render(view: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(op_id) = view.operation_id {
        let outcome = view.outcome.map(outcome_label).unwrap_or("Pending");
        let elapsed = view
            .elapsed_ms
            .map(|ms| format!(" | {}", format_duration_ms(ms.max(0) as f64)))
            .unwrap_or_default();
        lines.push(format!("Operation #{op_id}: {outcome}{elapsed}"));
        lines.extend(view.stages.iter().map(format_stage_row));
    }

    if let Some(status) = &view.status {
        lines.push(format!("{}: {}", level_label(status.level), status.text));
    }

    if view.can_cancel {
        lines.push("Press Ctrl-C to cancel.".to_string());
    }

    lines
}

fn format_stage_row(stage: &StageRowView) -> String {
    let mut metrics = Vec::new();
    if let Some(ms) = stage.duration_ms {
        metrics.push(format_duration_ms(ms));
    }
    if let Some(bytes) = stage.size_bytes {
        metrics.push(format!("{} B", format_with_commas(bytes)));
    }
    metrics.extend(stage.extra.iter().cloned());

    let row = format!(
        "  {marker} {index}. {name} ({status})",
        marker = status_marker(stage.status),
        index = stage.index,
        name = stage.name,
        status = stage.status.label()
    );
    if metrics.is_empty() {
        row
    } else {
        format!("{row} [{}]", metrics.join(", "))
    }
}

fn status_marker(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Pending => "[ ]",
        StageStatus::InProgress => "[>]",
        StageStatus::Completed => "[x]",
        StageStatus::Errored => "[!]",
        StageStatus::Cancelled => "[-]",
    }
}

fn outcome_label(outcome: OperationOutcome) -> &'static str {
    match outcome {
        OperationOutcome::Pending => "Running",
        OperationOutcome::Succeeded => "Succeeded",
        OperationOutcome::Failed => "Failed",
        OperationOutcome::Cancelled => "Cancelled",
    }
}

fn level_label(level: StatusLevel) -> &'static str {
    match level {
        StatusLevel::Info => "Info",
        StatusLevel::Success => "Done",
        StatusLevel::Warning => "Warning",
        StatusLevel::Error => "Error",
    }
}

fn format_duration_ms(ms: f64) -> String {
    if ms >= 1_000.0 {
        format!("{:.1} s", ms / 1_000.0)
    } else {
        format!("{} ms", ms.round() as u64)
    }
}

fn format_with_commas(value: u64) -> String {
    let mut out = String::new();
    for (i, ch) in value.to_string().chars().rev().enumerate() {
        if i != 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}
