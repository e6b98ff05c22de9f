use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use engine_logging::{engine_info, engine_warn};
use ingest_core::{update, AppState, Msg, OperationOutcome};

use super::cli::Cli;
use super::config::AppConfig;
use super::effects::EffectRunner;
use super::ui::render;

/// Coalesces redraws while nothing arrives from the engine.
const TICK_INTERVAL: Duration = Duration::from_millis(250);

const EXIT_FAILED: u8 = 1;
const EXIT_INVALID_INPUT: u8 = 2;
const EXIT_CANCELLED: u8 = 130;

pub fn run(config: &AppConfig, cli: &Cli) -> anyhow::Result<ExitCode> {
    let template = config.stage_template()?;
    let settings = config.engine_settings()?;

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let runner = EffectRunner::new(settings, msg_tx.clone());
    spawn_interrupt_listener(msg_tx)?;

    let mut state = AppState::with_template(template);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for msg in seed_messages(cli) {
        state = dispatch(state, msg, &runner, &mut out)?;
    }
    if state.operation().is_none() {
        return Ok(ExitCode::from(EXIT_INVALID_INPUT));
    }

    let outcome = loop {
        let msg = match msg_rx.recv_timeout(TICK_INTERVAL) {
            Ok(msg) => msg,
            Err(mpsc::RecvTimeoutError::Timeout) => Msg::Tick,
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                anyhow::bail!("message channel closed before the operation finished")
            }
        };
        state = dispatch(state, msg, &runner, &mut out)?;
        match state.operation().map(|op| op.outcome()) {
            Some(OperationOutcome::Pending) | None => continue,
            Some(outcome) => break outcome,
        }
    };
    engine_info!("operation finished: {:?}", outcome);

    if config.show_telemetry {
        for record in state.telemetry().records() {
            let text = serde_json::to_string_pretty(record).context("serialize telemetry")?;
            writeln!(out, "{text}")?;
        }
    }

    Ok(match exit_status(outcome) {
        0 => ExitCode::SUCCESS,
        code => ExitCode::from(code),
    })
}

fn dispatch(
    state: AppState,
    msg: Msg,
    runner: &EffectRunner,
    out: &mut impl Write,
) -> io::Result<AppState> {
    let (mut state, effects) = update(state, msg);
    runner.enqueue(effects);
    if state.consume_dirty() {
        for line in render::render(&state.view()) {
            writeln!(out, "{line}")?;
        }
        writeln!(out)?;
        out.flush()?;
    }
    Ok(state)
}

/// Form edits and the submit that a single CLI invocation stands for.
fn seed_messages(cli: &Cli) -> Vec<Msg> {
    let mut messages = vec![Msg::FileSelected(cli.file.clone())];
    if let Some(title) = &cli.title {
        messages.push(Msg::TitleChanged(title.clone()));
    }
    if let Some(tags) = &cli.tags {
        messages.push(Msg::TagsChanged(tags.clone()));
    }
    if let Some(language) = &cli.language {
        messages.push(Msg::LanguageChanged(language.clone()));
    }
    messages.push(Msg::SubmitClicked { at: Utc::now() });
    messages
}

fn exit_status(outcome: OperationOutcome) -> u8 {
    match outcome {
        OperationOutcome::Succeeded | OperationOutcome::Pending => 0,
        OperationOutcome::Failed => EXIT_FAILED,
        OperationOutcome::Cancelled => EXIT_CANCELLED,
    }
}

/// Turns every Ctrl-C into a cancel request for the message loop.
fn spawn_interrupt_listener(msg_tx: mpsc::Sender<Msg>) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build signal runtime")?;
    thread::Builder::new()
        .name("ingest-signal".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                loop {
                    if let Err(err) = tokio::signal::ctrl_c().await {
                        engine_warn!("Ctrl-C handler unavailable: {}", err);
                        return;
                    }
                    engine_info!("interrupt received; cancelling");
                    if msg_tx.send(Msg::CancelClicked { at: Utc::now() }).is_err() {
                        return;
                    }
                }
            });
        })
        .context("spawn signal thread")?;
    Ok(())
}
