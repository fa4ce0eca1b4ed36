//! `dst2edm4hep`: convert DELPHI DST event data to EDM4hep-style frames.
//!
//! Thin glue over the `dst-convert` library: argument parsing, TOML
//! configuration, logging setup and pipeline wiring. Input files are
//! declarative event descriptions replayed through the synthetic event
//! source; the PHDST-backed source binds through the same `EventSource`
//! trait outside this repository.
//!
//! Exit status: 0 on success, 1 for a fatal conversion error (registry
//! exhaustion, sink I/O), 2 for configuration or input errors.

mod config;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Settings;
use dst_convert::{
    run_analysis, ConvertError, ConverterConfig, DstConverter, EventSpec, JsonLinesSink,
    SyntheticSource,
};

const EXIT_CONVERSION: u8 = 1;
const EXIT_CONFIG: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "dst2edm4hep",
    version,
    about = "Convert DELPHI DST files to EDM4hep format"
)]
struct Cli {
    /// Input event files (TOML event descriptions)
    #[arg(value_name = "FILE")]
    input_files: Vec<PathBuf>,

    /// Output file path (overrides the config file)
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    output: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Maximum number of events to convert (0 = unlimited)
    #[arg(short = 'n', long, value_name = "N")]
    max_events: Option<u64>,

    /// Disable the secondary-hadronic-interaction repair pass
    #[arg(long)]
    no_structural_fix: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Shorthand for --log-level debug
    #[arg(short, long)]
    verbose: bool,
}

/// One input file: a list of `[[events]]` tables.
#[derive(Debug, Deserialize)]
struct EventFile {
    #[serde(default)]
    events: Vec<EventSpec>,
}

fn load_events(paths: &[String]) -> Result<Vec<EventSpec>> {
    let mut events = Vec::new();
    for path in paths {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {path}"))?;
        let file: EventFile = toml::from_str(&text)
            .with_context(|| format!("failed to parse input file {path}"))?;
        info!(path, events = file.events.len(), "loaded input file");
        events.extend(file.events);
    }
    Ok(events)
}

/// Fold command-line overrides into the file/default settings.
fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if !cli.input_files.is_empty() {
        settings.input_files = cli
            .input_files
            .iter()
            .map(|p| p.display().to_string())
            .collect();
    }
    if let Some(output) = &cli.output {
        settings.output_file = output.display().to_string();
    }
    if let Some(max_events) = cli.max_events {
        settings.phdst.max_events = max_events;
    }
    if cli.no_structural_fix {
        settings.edm4hep.fix_secondary_hadronic_interactions = false;
    }
    if let Some(level) = &cli.log_level {
        settings.logging.level = level.clone();
    }
    if cli.verbose {
        settings.logging.level = "debug".to_string();
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    apply_overrides(&mut settings, cli);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.logging.level.clone())),
        )
        .init();

    if settings.output_file.is_empty() {
        bail!("output file must be specified via --output or in the config file");
    }
    if settings.input_files.is_empty() {
        bail!("no input files specified");
    }

    info!("DELPHI to EDM4hep conversion starting");
    info!(
        output = settings.output_file,
        inputs = settings.input_files.len(),
        max_events = settings.phdst.max_events,
        fix_secondary_hadronic_interactions =
            settings.edm4hep.fix_secondary_hadronic_interactions,
        "configuration"
    );

    let events = load_events(&settings.input_files)?;
    let mut source = SyntheticSource::new(events);

    let sink = JsonLinesSink::create(&settings.output_file)
        .map_err(ConvertError::Sink)
        .with_context(|| format!("failed to open output file {}", settings.output_file))?;

    let converter_config = ConverterConfig {
        max_events: settings.phdst.max_events,
        fix_secondary_hadronic_interactions: settings
            .edm4hep
            .fix_secondary_hadronic_interactions,
    };
    let mut converter = DstConverter::new(converter_config, Box::new(sink));

    let stats = run_analysis(&mut source, &mut converter)?;
    info!(
        records = stats.records_seen,
        selected = stats.records_selected,
        converted = converter.events_converted(),
        "conversion completed"
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // The subscriber may not be up yet for early config errors.
            eprintln!("error: {err:#}");
            if err.is::<ConvertError>() {
                ExitCode::from(EXIT_CONVERSION)
            } else {
                ExitCode::from(EXIT_CONFIG)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> Cli {
        Cli::parse_from(["dst2edm4hep"])
    }

    #[test]
    fn cli_overrides_take_precedence() {
        let mut settings = Settings::load(None).unwrap();
        settings.output_file = "from_file.jsonl".to_string();
        settings.phdst.max_events = 10;

        let mut cli = base_cli();
        cli.output = Some(PathBuf::from("from_cli.jsonl"));
        cli.max_events = Some(5);
        cli.no_structural_fix = true;
        cli.verbose = true;

        apply_overrides(&mut settings, &cli);
        assert_eq!(settings.output_file, "from_cli.jsonl");
        assert_eq!(settings.phdst.max_events, 5);
        assert!(!settings.edm4hep.fix_secondary_hadronic_interactions);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn absent_cli_values_keep_file_settings() {
        let mut settings = Settings::load(None).unwrap();
        settings.output_file = "from_file.jsonl".to_string();
        settings.input_files = vec!["events.toml".to_string()];

        let cli = base_cli();
        apply_overrides(&mut settings, &cli);
        assert_eq!(settings.output_file, "from_file.jsonl");
        assert_eq!(settings.input_files, ["events.toml"]);
    }

    #[test]
    fn event_files_parse() {
        let file: EventFile = toml::from_str(
            r#"
            [[events]]
            run = 1000
            event = 1

            [[events]]
            run = 1000
            event = 2
            "#,
        )
        .unwrap();
        assert_eq!(file.events.len(), 2);
        assert_eq!(file.events[1].event, 2);
    }
}
