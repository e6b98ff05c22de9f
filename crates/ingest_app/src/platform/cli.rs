use std::path::PathBuf;

use clap::Parser;

use super::logging::LogDestination;

/// Upload a media file for ingestion and follow its progress.
#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Media file to ingest.
    pub file: Option<PathBuf>,

    /// Title stored with the document.
    #[arg(short, long)]
    pub title: Option<String>,

    /// Tags, separated by commas or whitespace.
    #[arg(long)]
    pub tags: Option<String>,

    /// Language hint for transcription (e.g. "en").
    #[arg(short, long)]
    pub language: Option<String>,

    /// Base URL of the ingestion service.
    #[arg(long)]
    pub server: Option<String>,

    /// Interval between simulated stage advances, in milliseconds.
    #[arg(long)]
    pub cadence_ms: Option<u64>,

    /// RON config file. Defaults to ./ingest.ron when present.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub log: Option<LogDestination>,

    /// Print captured telemetry as JSON when the operation ends.
    #[arg(long)]
    pub show_telemetry: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_file_and_overrides() {
        let cli = Cli::try_parse_from([
            "ingest",
            "talk.mp4",
            "--title",
            "Keynote",
            "--tags",
            "conf, video",
            "--server",
            "http://ingest.local:9000",
            "--cadence-ms",
            "250",
            "--log",
            "both",
            "--show-telemetry",
        ])
        .unwrap();

        assert_eq!(cli.file, Some(PathBuf::from("talk.mp4")));
        assert_eq!(cli.title.as_deref(), Some("Keynote"));
        assert_eq!(cli.tags.as_deref(), Some("conf, video"));
        assert_eq!(cli.server.as_deref(), Some("http://ingest.local:9000"));
        assert_eq!(cli.cadence_ms, Some(250));
        assert_eq!(cli.log, Some(LogDestination::Both));
        assert!(cli.show_telemetry);
    }

    #[test]
    fn file_is_optional() {
        let cli = Cli::try_parse_from(["ingest"]).unwrap();
        assert!(cli.file.is_none());
        assert!(!cli.show_telemetry);
    }
}
