//! fieldlog: day-partitioned data logger for field sensor nodes.
//!
//! Entry point: parses the command line, loads the agent configuration,
//! initialises structured logging and runs one command against the storage
//! root. Retrieved pages are written to stdout as JSON lines by a separate
//! transport thread.

use std::io::Read as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::Layer as _;

use fieldlog::core::agent::Agent;
use fieldlog::core::filter::TopicFilter;
use fieldlog::core::request::RetrievalRequest;
use fieldlog::core::retrieval::{DayWalk, ScanReport};
use fieldlog::publish::{with_transport, JsonLinesPublisher};
use fieldlog::util::config::AgentConfig;
use fieldlog::util::constants;
use fieldlog::util::error::{FieldLogError, Result};
use fieldlog::util::time::{format_duration, Timestamp};

/// Day-partitioned data logger and time-range republisher
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./fieldlog.json when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Storage root, overriding the configuration
    #[arg(long, global = true)]
    storage_root: Option<PathBuf>,

    /// Device identifier used in published topics
    #[arg(long, global = true)]
    device_id: Option<String>,

    /// Directory for the persistent log file
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Append one message to the daily file
    Log {
        topic: String,
        message: String,
        /// Timestamp of the message (defaults to now)
        #[arg(long)]
        time: Option<String>,
        /// Store a relative stamp `<time>+<offset>` instead of an absolute one
        #[arg(long, allow_hyphen_values = true)]
        offset: Option<i64>,
    },
    /// Write a header line into a daily file
    Header {
        #[arg(required = true)]
        fields: Vec<String>,
        /// Any time on the target day (defaults to today)
        #[arg(long)]
        date: Option<String>,
        /// Overwrite the file even if it already exists
        #[arg(long)]
        force: bool,
    },
    /// Publish stored lines between two timestamps
    Retrieve {
        epoch: String,
        terminus: String,
        /// Comma-separated topic substrings (empty matches everything)
        #[arg(long, default_value = "")]
        topics: String,
        #[arg(long)]
        page_length: Option<usize>,
        #[arg(long, value_enum)]
        walk: Option<WalkArg>,
    },
    /// Run a JSON retrieval command (argument or stdin)
    Request { payload: Option<String> },
    /// List the daily files on storage
    List,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum WalkArg {
    Calendar,
    Stepped,
}

impl From<WalkArg> for DayWalk {
    fn from(walk: WalkArg) -> Self {
        match walk {
            WalkArg::Calendar => DayWalk::Calendar,
            WalkArg::Stepped => DayWalk::Stepped,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", constants::APP_NAME, e);
            return ExitCode::from(2);
        }
    };

    let log_dir = init_log_dir(config.log_dir.as_deref());
    init_logging(&log_dir);

    tracing::info!("{} v{} starting", constants::APP_NAME, constants::APP_VERSION);
    if let Some(dir) = &log_dir {
        tracing::info!("Log file: {}", dir.join(constants::LOG_FILE_NAME).display());
    }

    match run(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Load the configuration file and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<AgentConfig> {
    let mut config = AgentConfig::load_or_default(cli.config.as_deref())?;
    if let Some(root) = &cli.storage_root {
        config.storage_root = root.clone();
    }
    if let Some(device_id) = &cli.device_id {
        config.device_id = device_id.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    if let Command::Retrieve { walk: Some(walk), .. } = &cli.command {
        config.day_walk = (*walk).into();
    }
    config.validate()?;
    Ok(config)
}

fn run(command: Command, config: AgentConfig) -> Result<()> {
    match command {
        Command::Log {
            topic,
            message,
            time,
            offset,
        } => {
            let agent = Agent::start(config, JsonLinesPublisher::new(std::io::stdout()))?;
            let time = match time {
                Some(text) => Timestamp::parse(&text)?,
                None => Timestamp::now(),
            };
            match offset {
                Some(offset) => agent.log_relative_at(time, offset, &topic, &message),
                None => agent.log_at(time, &topic, &message),
            }
        }
        Command::Header {
            fields,
            date,
            force,
        } => {
            let agent = Agent::start(config, JsonLinesPublisher::new(std::io::stdout()))?;
            let day = match date {
                Some(text) => Timestamp::parse(&text)?,
                None => Timestamp::now(),
            };
            if force {
                if let Some(logger) = agent.logger_for(day) {
                    logger.write_header(fields.as_slice())?;
                    tracing::info!("Header written to {}", logger.file_name());
                }
            } else if !agent.ensure_header(day, fields.as_slice())? {
                tracing::info!("Daily file for {} already exists, header left alone", day.date());
            }
            Ok(())
        }
        Command::Retrieve {
            epoch,
            terminus,
            topics,
            page_length,
            walk: _,
        } => {
            let mut request = RetrievalRequest::new(
                Timestamp::parse(&epoch)?,
                Timestamp::parse(&terminus)?,
                TopicFilter::parse_list(&topics),
            );
            request.page_length = page_length;
            retrieve(config, &request)
        }
        Command::Request { payload } => {
            let payload = match payload {
                Some(payload) => payload,
                None => {
                    let mut text = String::new();
                    std::io::stdin().read_to_string(&mut text)?;
                    text
                }
            };
            retrieve(config, &RetrievalRequest::from_json(&payload)?)
        }
        Command::List => {
            let agent = Agent::start(config, JsonLinesPublisher::new(std::io::stdout()))?;
            for key in agent.list_daily_files()? {
                println!("{}", key.file_name());
            }
            Ok(())
        }
    }
}

/// Run one retrieval with pages forwarded to stdout by the transport thread.
fn retrieve(config: AgentConfig, request: &RetrievalRequest) -> Result<()> {
    let started = Instant::now();
    let sink = JsonLinesPublisher::new(std::io::stdout());
    let (report, summary) = with_transport(constants::TRANSPORT_QUEUE_BOUND, sink, |publisher| {
        let mut agent = Agent::start(config, publisher)?;
        agent.retrieve(request)
    })?;
    let report: ScanReport = report?;

    tracing::info!(
        "Retrieval finished in {}: {} pages forwarded, {} failed in transport",
        format_duration(started.elapsed()),
        summary.forwarded,
        summary.failed
    );
    let text = serde_json::to_string_pretty(&report).map_err(FieldLogError::Json)?;
    eprintln!("{text}");
    Ok(())
}

/// Create the persistent log directory, if one is configured.
///
/// Returns `Some(path)` on success, `None` if no directory is configured or
/// it cannot be created (logging falls back to stderr only).
fn init_log_dir(configured: Option<&std::path::Path>) -> Option<PathBuf> {
    let log_dir = configured?.to_path_buf();
    std::fs::create_dir_all(&log_dir).ok()?;

    // Rotate the log file if it exceeds the size limit.
    let log_file = log_dir.join(constants::LOG_FILE_NAME);
    if let Ok(meta) = std::fs::metadata(&log_file) {
        if meta.len() > constants::MAX_LOG_FILE_SIZE {
            let backup = log_dir.join(format!("{}.old", constants::LOG_FILE_NAME));
            let _ = std::fs::rename(&log_file, &backup);
        }
    }

    Some(log_dir)
}

/// Initialise the dual-layer tracing subscriber.
///
/// - **stderr layer**: filtered by `RUST_LOG` env var (default: `info`).
/// - **file layer** (if `log_dir` is `Some`): always writes at `debug` level
///   to a persistent log file for post-mortem diagnostics.
fn init_logging(log_dir: &Option<PathBuf>) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    if let Some(dir) = log_dir {
        let log_path = dir.join(constants::LOG_FILE_NAME);
        if let Ok(file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
        {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .with_filter(tracing_subscriber::EnvFilter::new("debug"));

            tracing_subscriber::registry()
                .with(stderr_layer.with_filter(env_filter))
                .with(file_layer)
                .init();
            return;
        }
    }

    // Fallback: stderr only
    tracing_subscriber::registry()
        .with(stderr_layer.with_filter(env_filter))
        .init();
}
