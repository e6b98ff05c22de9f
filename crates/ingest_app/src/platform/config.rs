use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ingest_core::{StageTemplate, DEFAULT_STAGE_NAMES};
use ingest_engine::{EngineSettings, SimulatorSettings, SubmitSettings};
use serde::{Deserialize, Serialize};

use super::cli::Cli;
use super::logging::LogDestination;

const DEFAULT_CONFIG_FILE: &str = "./ingest.ron";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("stage list must name at least one stage")]
    EmptyStages,
    #[error("simulator cadence must be greater than zero")]
    ZeroCadence,
}

/// Settings read from the RON config file; CLI flags take precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: String,
    pub upload_path: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub cadence_ms: u64,
    /// Defaults to one tick per stage after the first.
    pub max_ticks: Option<u32>,
    pub stages: Vec<String>,
    pub log: LogDestination,
    pub show_telemetry: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let submit = SubmitSettings::default();
        let simulator = SimulatorSettings::default();
        Self {
            server: submit.base_url,
            upload_path: submit.upload_path,
            connect_timeout_secs: submit.connect_timeout.as_secs(),
            request_timeout_secs: submit.request_timeout.as_secs(),
            cadence_ms: simulator.cadence.as_millis() as u64,
            max_ticks: None,
            stages: DEFAULT_STAGE_NAMES.iter().map(|name| name.to_string()).collect(),
            log: LogDestination::default(),
            show_telemetry: false,
        }
    }
}

impl AppConfig {
    /// Reads `path`, or `./ingest.ron` if it exists, or falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::read(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::read(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(server) = &cli.server {
            self.server = server.clone();
        }
        if let Some(cadence_ms) = cli.cadence_ms {
            self.cadence_ms = cadence_ms;
        }
        if let Some(log) = cli.log {
            self.log = log;
        }
        self.show_telemetry |= cli.show_telemetry;
        self
    }

    pub fn stage_template(&self) -> Result<StageTemplate, ConfigError> {
        StageTemplate::new(self.stages.clone()).ok_or(ConfigError::EmptyStages)
    }

    pub fn engine_settings(&self) -> Result<EngineSettings, ConfigError> {
        if self.cadence_ms == 0 {
            return Err(ConfigError::ZeroCadence);
        }
        let max_ticks = match self.max_ticks {
            Some(max_ticks) => max_ticks,
            None => {
                let stages = self.stage_template()?.len();
                u32::try_from(stages - 1).unwrap_or(u32::MAX)
            }
        };
        Ok(EngineSettings {
            submit: SubmitSettings {
                base_url: self.server.clone(),
                upload_path: self.upload_path.clone(),
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                request_timeout: Duration::from_secs(self.request_timeout_secs),
                ..SubmitSettings::default()
            },
            simulator: SimulatorSettings {
                cadence: Duration::from_millis(self.cadence_ms),
                max_ticks,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_mirror_engine_settings() {
        let config = AppConfig::default();
        assert_eq!(config.server, "http://localhost:8000");
        assert_eq!(config.upload_path, "/documents/upload");
        assert_eq!(config.cadence_ms, 3_000);
        assert_eq!(config.max_ticks, None);
        assert_eq!(config.stages.len(), 4);
        assert_eq!(config.engine_settings().unwrap().simulator.max_ticks, 3);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file = write_config(
            r#"(
                server: "http://media.internal:8080",
                cadence_ms: 500,
                stages: ["Upload", "Transcode"],
                log: both,
            )"#,
        );

        let config = AppConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.server, "http://media.internal:8080");
        assert_eq!(config.cadence_ms, 500);
        assert_eq!(config.max_ticks, None);
        assert_eq!(config.log, LogDestination::Both);
        assert_eq!(config.stage_template().unwrap().len(), 2);
    }

    #[test]
    fn tick_cap_follows_stage_template() {
        let file = write_config(
            r#"(
                stages: ["Fetch", "Probe", "Transcode", "Transcribe", "Embed", "Persist"],
            )"#,
        );

        let config = AppConfig::load(Some(file.path())).unwrap();
        let template = config.stage_template().unwrap();
        let settings = config.engine_settings().unwrap();

        assert_eq!(template.len(), 6);
        assert_eq!(settings.simulator.max_ticks, 5);
    }

    #[test]
    fn explicit_tick_cap_is_kept() {
        let file = write_config("(stages: [\"A\", \"B\", \"C\"], max_ticks: Some(1))");

        let settings = AppConfig::load(Some(file.path()))
            .unwrap()
            .engine_settings()
            .unwrap();

        assert_eq!(settings.simulator.max_ticks, 1);
    }

    #[test]
    fn missing_explicit_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("absent.ron"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn invalid_ron_is_a_parse_error() {
        let file = write_config("(server: 42)");
        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn empty_stage_list_is_rejected() {
        let config = AppConfig {
            stages: Vec::new(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.stage_template(),
            Err(ConfigError::EmptyStages)
        ));
    }

    #[test]
    fn cli_flags_override_file_values() {
        let cli = Cli::try_parse_from([
            "ingest",
            "clip.wav",
            "--server",
            "http://cli.example:1234",
            "--cadence-ms",
            "100",
            "--show-telemetry",
        ])
        .unwrap();
        let config = AppConfig {
            server: "http://file.example".to_string(),
            cadence_ms: 900,
            ..AppConfig::default()
        }
        .with_cli(&cli);

        assert_eq!(config.server, "http://cli.example:1234");
        assert_eq!(config.cadence_ms, 100);
        assert!(config.show_telemetry);

        let settings = config.engine_settings().unwrap();
        assert_eq!(settings.submit.base_url, "http://cli.example:1234");
        assert_eq!(settings.simulator.cadence, Duration::from_millis(100));
    }

    #[test]
    fn zero_cadence_is_rejected() {
        let config = AppConfig {
            cadence_ms: 0,
            ..AppConfig::default()
        };
        assert!(matches!(
            config.engine_settings(),
            Err(ConfigError::ZeroCadence)
        ));
    }
}
