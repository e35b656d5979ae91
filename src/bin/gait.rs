//! gait CLI - Command-line interface for gait-flux
//!
//! Commands:
//! - replay: Run recorded messages through the filter (batch mode)
//! - run: Filter messages from stdin as they arrive (streaming mode)
//! - serve: Relay samples and commands between TCP clients
//! - doctor: Diagnose configuration and environment
//! - config: Print the effective configuration

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use gait_flux::relay::{Relay, DEFAULT_PORT};
use gait_flux::wire::{self, InboundMessage};
use gait_flux::{
    replay_samples, Command, GaitConfig, GaitError, GaitProcessor, Sample, GAIT_VERSION,
    PRODUCER_NAME,
};

/// gait - Real-time gait classification for armband sensor streams
#[derive(Parser)]
#[command(name = "gait")]
#[command(author = "Synheart AI Inc")]
#[command(version = GAIT_VERSION)]
#[command(about = "Classify armband peak/trough samples into motion states", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run recorded messages through the filter (batch mode)
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        format: OutputFormat,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Filter messages from stdin as they arrive (streaming mode)
    Run {
        /// Buffer output instead of flushing after each command
        #[arg(long = "no-flush", action = ArgAction::SetFalse)]
        flush: bool,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Relay samples and commands between TCP clients
    Serve {
        /// Address to listen on
        #[arg(long, default_value_t = format!("0.0.0.0:{}", DEFAULT_PORT))]
        bind: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as JSON
    Config {
        #[command(flatten)]
        filter: FilterArgs,
    },
}

/// Filter settings shared by the processing commands
#[derive(Args, Clone)]
struct FilterArgs {
    /// Load configuration from a JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the smoothing window (samples)
    #[arg(long)]
    max_history: Option<usize>,

    /// Override the frequency cap (Hz)
    #[arg(long)]
    max_frequency: Option<f64>,
}

impl FilterArgs {
    /// Defaults, then the config file, then command-line overrides
    fn resolve(&self) -> Result<GaitConfig, GaitCliError> {
        let mut config = match &self.config {
            Some(path) => GaitConfig::from_json(&fs::read_to_string(path)?)?,
            None => GaitConfig::default(),
        };

        if let Some(window) = self.max_history {
            config = config.with_max_history_window(window);
        }
        if let Some(max_frequency) = self.max_frequency {
            config = config.with_max_frequency(max_frequency);
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one command per line)
    Ndjson,
    /// JSON array of commands
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    init_logging();
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

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gait_flux=info,gait=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), GaitCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            format,
            filter,
        } => cmd_replay(&input, &output, format, &filter),

        Commands::Run { flush, filter } => cmd_run(flush, &filter),

        Commands::Serve { bind, filter } => cmd_serve(&bind, &filter),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),

        Commands::Config { filter } => {
            println!("{}", filter.resolve()?.to_json()?);
            Ok(())
        }
    }
}

fn cmd_replay(
    input: &Path,
    output: &Path,
    format: OutputFormat,
    filter: &FilterArgs,
) -> Result<(), GaitCliError> {
    let config = filter.resolve()?;

    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let messages = wire::parse_ndjson(&input_data)?;
    if messages.is_empty() {
        return Err(GaitCliError::NoMessages);
    }

    let commands = replay_messages(messages, config)?;

    let output_data = format_output(&commands, &format)?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

/// Run the gait samples among `messages` through a fresh processor
fn replay_messages(
    messages: Vec<InboundMessage>,
    config: GaitConfig,
) -> Result<Vec<Command>, GaitError> {
    let samples: Vec<Sample> = messages
        .into_iter()
        .filter_map(|message| match message {
            InboundMessage::Gait(sample) => Some(sample),
            InboundMessage::Gesture(gesture) => {
                debug!(gesture = ?gesture.gesture, "gesture skipped");
                None
            }
        })
        .collect();

    replay_samples(&samples, config)
}

fn cmd_run(flush: bool, filter: &FilterArgs) -> Result<(), GaitCliError> {
    let mut processor = GaitProcessor::with_config(filter.resolve()?)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        match processor.process_message(trimmed) {
            Ok(Some(command)) => {
                writeln!(stdout, "{}", command)?;
                if flush {
                    stdout.flush()?;
                }
            }
            Ok(None) => {}
            Err(e @ GaitError::NonIncreasingTimestamp { .. }) => {
                warn!(error = %e, "sample skipped");
            }
            Err(e) => return Err(e.into()),
        }
    }

    stdout.flush()?;
    Ok(())
}

fn cmd_serve(bind: &str, filter: &FilterArgs) -> Result<(), GaitCliError> {
    let config = filter.resolve()?;
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async {
        let relay = Relay::bind(bind, config).await?;
        relay.run().await
    })?;

    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), GaitCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "gait_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("gait-flux version {}", GAIT_VERSION),
    });

    if let Some(config_path) = config {
        if config_path.exists() {
            match fs::read_to_string(config_path) {
                Ok(content) => match GaitConfig::from_json(&content) {
                    Ok(config) => checks.push(DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Config valid (window {}, max frequency {} Hz)",
                            config.max_history_window, config.max_frequency
                        ),
                    }),
                    Err(e) => checks.push(DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Invalid config: {}", e),
                    }),
                },
                Err(e) => checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read config file: {}", e),
                }),
            }
        } else {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist, defaults apply".to_string(),
            });
        }
    } else {
        checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "Using default configuration".to_string(),
        });
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: GAIT_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("gait Doctor Report");
        println!("==================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(GaitCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn format_output(commands: &[Command], format: &OutputFormat) -> Result<String, GaitCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for command in commands {
                lines.push(wire::encode_command(command)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(commands)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(commands)?),
    }
}

// Error types

#[derive(Debug)]
enum GaitCliError {
    Io(io::Error),
    Filter(GaitError),
    Json(serde_json::Error),
    NoMessages,
    DoctorFailed,
}

impl From<io::Error> for GaitCliError {
    fn from(e: io::Error) -> Self {
        GaitCliError::Io(e)
    }
}

impl From<GaitError> for GaitCliError {
    fn from(e: GaitError) -> Self {
        GaitCliError::Filter(e)
    }
}

impl From<serde_json::Error> for GaitCliError {
    fn from(e: serde_json::Error) -> Self {
        GaitCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<GaitCliError> for CliError {
    fn from(e: GaitCliError) -> Self {
        match e {
            GaitCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths, permissions and the bind address".to_string()),
            },
            GaitCliError::Filter(e @ GaitError::InvalidConfig(_)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'gait doctor --config <file>' for details".to_string()),
            },
            GaitCliError::Filter(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(
                    "Messages must be JSON objects with type \"gait\" or \"gesture\"".to_string(),
                ),
            },
            GaitCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            GaitCliError::NoMessages => CliError {
                code: "NO_MESSAGES".to_string(),
                message: "No messages found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            GaitCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
