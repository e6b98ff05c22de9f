//! Terminal front end: CLI, config, logging and the message loop.

mod app;
mod cli;
mod config;
mod effects;
mod logging;
mod ui;

use std::process::ExitCode;

use clap::Parser;
use engine_logging::engine_info;

pub fn run_app() -> anyhow::Result<ExitCode> {
    let cli = cli::Cli::parse();
    let config = config::AppConfig::load(cli.config.as_deref())?.with_cli(&cli);
    logging::initialize(config.log);
    engine_info!("ingest {} against {}", env!("CARGO_PKG_VERSION"), config.server);
    app::run(&config, &cli)
}
