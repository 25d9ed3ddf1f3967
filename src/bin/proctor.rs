//! Proctor CLI - Command-line interface for Synheart Proctor
//!
//! Commands:
//! - replay: Feed a recorded observation stream through an engine
//! - check-config: Validate a configuration file and print the effective settings
//! - policy: Print the keyboard shortcut policy table

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use synheart_proctor::detectors::SHORTCUT_POLICY;
use synheart_proctor::encoder::ReportEncoder;
use synheart_proctor::observation::Observation;
use synheart_proctor::sink::RecordingSink;
use synheart_proctor::{ProctorConfig, ProctorError, ProctoringEngine, PROCTOR_VERSION};

/// Proctor - Signal-fusion engine for live interview sessions
#[derive(Parser)]
#[command(name = "proctor")]
#[command(author = "Synheart AI Inc")]
#[command(version = PROCTOR_VERSION)]
#[command(about = "Replay and inspect proctoring sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded observation stream (NDJSON) through a fresh engine
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Engine configuration (JSON); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "events")]
        output_format: OutputFormat,
    },

    /// Validate a configuration file
    CheckConfig {
        /// Configuration file path (use - for stdin)
        config: PathBuf,
    },

    /// Print the keyboard shortcut policy
    Policy {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Sink events (incidents, warnings, violations) as NDJSON
    Events,
    /// Pretty-printed session report
    Report,
    /// Retained incident log as NDJSON
    Incidents,
}

/// One line of a replay file. A line without an observation only advances the clock.
#[derive(Deserialize)]
struct ReplayRecord {
    at: DateTime<Utc>,
    #[serde(default)]
    observation: Option<Observation>,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; `PROCTOR_LOG` wins over `RUST_LOG`
fn init_tracing() {
    let filter = EnvFilter::try_from_env("PROCTOR_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("synheart_proctor=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), ProctorCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            config,
            output_format,
        } => cmd_replay(&input, &output, config.as_deref(), output_format),
        Commands::CheckConfig { config } => cmd_check_config(&config),
        Commands::Policy { json } => cmd_policy(json),
    }
}

fn read_input(path: &Path) -> Result<String, ProctorCliError> {
    if path.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            eprintln!("Reading from stdin (end with Ctrl-D)");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn write_output(path: &Path, data: &str) -> Result<(), ProctorCliError> {
    if path.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(path, data)?;
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ProctorConfig, ProctorCliError> {
    match path {
        Some(path) => Ok(ProctorConfig::from_json(&read_input(path)?)?),
        None => Ok(ProctorConfig::default()),
    }
}

fn parse_records(input: &str) -> Result<Vec<ReplayRecord>, ProctorCliError> {
    let mut records = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: ReplayRecord = serde_json::from_str(line)
            .map_err(|e| ProctorCliError::ParseError(format!("line {}: {}", index + 1, e)))?;
        records.push(record);
    }
    Ok(records)
}

fn cmd_replay(
    input: &Path,
    output: &Path,
    config: Option<&Path>,
    output_format: OutputFormat,
) -> Result<(), ProctorCliError> {
    let config = load_config(config)?;
    let records = parse_records(&read_input(input)?)?;
    let (first, last) = match (records.first(), records.last()) {
        (Some(first), Some(last)) => (first.at, last.at),
        _ => return Err(ProctorCliError::NoRecords),
    };

    let recorder = RecordingSink::new();
    let mut engine = ProctoringEngine::new(config, recorder.clone())?;
    engine.start(first);

    for record in records {
        engine.tick(record.at);
        if let Some(observation) = record.observation {
            let label = observation.label();
            let disposition = engine.ingest(record.at, observation);
            debug!(observation = label, ?disposition, at = %record.at, "replayed");
        }
    }

    info!(
        incidents = engine.log().len(),
        tab_switches = engine.tab_switch_count(),
        "replay finished"
    );

    let data = match output_format {
        OutputFormat::Report => {
            let mut json = ReportEncoder::new().encode_to_json(&engine, last)?;
            json.push('\n');
            json
        }
        OutputFormat::Events => {
            let mut out = String::new();
            for event in recorder.events() {
                out.push_str(&serde_json::to_string(&event)?);
                out.push('\n');
            }
            out
        }
        OutputFormat::Incidents => engine.log().to_ndjson()?,
    };
    engine.stop();

    write_output(output, &data)
}

fn cmd_check_config(path: &Path) -> Result<(), ProctorCliError> {
    let config = load_config(Some(path))?;
    println!("{}", config.to_json()?);
    Ok(())
}

fn cmd_policy(json: bool) -> Result<(), ProctorCliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(&SHORTCUT_POLICY)?);
        return Ok(());
    }

    println!(
        "{:<14} {:<18} {:<8} {:<11} {}",
        "SHORTCUT", "TYPE", "SEVERITY", "OPERATION", "ESCALATION"
    );
    for rule in SHORTCUT_POLICY.iter() {
        let escalation = serde_json::to_value(rule.escalation)?;
        println!(
            "{:<14} {:<18} {:<8} {:<11} {}",
            rule.label,
            rule.incident_type.as_str(),
            rule.severity.as_str(),
            rule.operation,
            escalation.as_str().unwrap_or_default()
        );
    }
    let extras = [
        ("Copy event", "copy_paste", "high", "copy", "violation"),
        ("Paste event", "copy_paste", "high", "paste", "violation"),
        ("Context menu", "-", "-", "prevented", "-"),
    ];
    for (label, kind, severity, operation, escalation) in extras {
        println!(
            "{:<14} {:<18} {:<8} {:<11} {}",
            label, kind, severity, operation, escalation
        );
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum ProctorCliError {
    Io(io::Error),
    Engine(ProctorError),
    Json(serde_json::Error),
    NoRecords,
    ParseError(String),
}

impl From<io::Error> for ProctorCliError {
    fn from(e: io::Error) -> Self {
        ProctorCliError::Io(e)
    }
}

impl From<ProctorError> for ProctorCliError {
    fn from(e: ProctorError) -> Self {
        ProctorCliError::Engine(e)
    }
}

impl From<serde_json::Error> for ProctorCliError {
    fn from(e: serde_json::Error) -> Self {
        ProctorCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ProctorCliError> for CliError {
    fn from(e: ProctorCliError) -> Self {
        match e {
            ProctorCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ProctorCliError::Engine(ProctorError::InvalidConfig(message)) => CliError {
                code: "INVALID_CONFIG".to_string(),
                message,
                hint: Some("Run 'proctor check-config' on the file".to_string()),
            },
            ProctorCliError::Engine(e) => CliError {
                code: "ENGINE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            ProctorCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ProctorCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No replay records found in input".to_string(),
                hint: Some(
                    "Each line must be {\"at\": <RFC 3339>, \"observation\": {...}}".to_string(),
                ),
            },
            ProctorCliError::ParseError(message) => CliError {
                code: "PARSE_ERROR".to_string(),
                message,
                hint: Some(
                    concat!(
                        "Observations use a \"kind\" tag, ",
                        "e.g. {\"kind\":\"visibility\",\"hidden\":true}"
                    )
                    .to_string(),
                ),
            },
        }
    }
}
