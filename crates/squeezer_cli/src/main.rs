//! Squeezer CLI
//!
//! Declarative management of Pulp 3 servers from the command line.
//!
//! Every invocation reconciles one entity (or runs one workflow) and prints
//! a single JSON document on stdout: the result keys plus `changed`, or a
//! failure with `failed`, `msg` and `changed`. Logs go to stderr.
//!
//! # Commands
//!
//! - `remote`, `repository`, `distribution` - plugin objects
//! - `artifact`, `content` - binary artifacts and file content
//! - `x509-guard` - certificate content guards
//! - `task` - inspect, await, cancel or delete tasks
//! - `sync`, `repair`, `orphans` - workflows

mod client;
mod commands;
mod error;
mod report;

use clap::{Args, Parser, Subcommand};
use client::ReqwestClient;
use error::CliError;
use report::JsonReporter;
use squeezer_core::{
    Engine, EngineConfig, Failure, HttpTransport, PollPolicy, Reporter, RouteTable,
    DEFAULT_CHUNK_SIZE, DEFAULT_PAGE_SIZE,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Declarative Pulp 3 management.
#[derive(Debug, Parser)]
#[command(name = "squeezer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: Connection,

    #[command(flatten)]
    engine: EngineArgs,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// How to reach the Pulp server.
#[derive(Debug, Clone, Args)]
pub struct Connection {
    /// Base URL of the Pulp server
    #[arg(global = true, long, env = "SQUEEZER_PULP_URL", default_value = "http://localhost")]
    pub pulp_url: String,

    /// User to authenticate as
    #[arg(global = true, long, env = "SQUEEZER_USERNAME")]
    pub username: Option<String>,

    /// Password of the user
    #[arg(global = true, long, env = "SQUEEZER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Verify the server's TLS certificate
    #[arg(
        global = true,
        long,
        env = "SQUEEZER_VALIDATE_CERTS",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub validate_certs: bool,
}

#[derive(Debug, Clone, Args)]
struct EngineArgs {
    /// Report what would change without changing anything
    #[arg(global = true, long)]
    check: bool,

    /// JSON file overriding operation routes
    #[arg(global = true, long)]
    routes: Option<PathBuf>,

    /// Page size for listings
    #[arg(global = true, long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u32,

    /// Upload chunk size in bytes
    #[arg(global = true, long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: u64,

    /// Seconds between two task polls
    #[arg(global = true, long, default_value_t = 2.0)]
    poll_interval: f64,

    /// Give up waiting for a task after this many seconds
    #[arg(global = true, long)]
    task_timeout: Option<u64>,
}

impl EngineArgs {
    fn config(&self) -> Result<EngineConfig, CliError> {
        let interval = Duration::try_from_secs_f64(self.poll_interval)
            .map_err(|e| CliError::Usage(format!("invalid poll interval: {e}")))?;
        let mut poll = PollPolicy::new(interval);
        if let Some(timeout) = self.task_timeout {
            poll = poll.with_deadline(Duration::from_secs(timeout));
        }
        Ok(EngineConfig::new()
            .with_check_mode(self.check)
            .with_page_size(self.page_size)
            .with_chunk_size(self.chunk_size)
            .with_upload_threshold(self.chunk_size)
            .with_poll(poll))
    }

    fn routes(&self) -> Result<RouteTable, CliError> {
        let mut routes = RouteTable::pulp_v3();
        if let Some(path) = &self.routes {
            let json = std::fs::read_to_string(path)?;
            routes.merge(RouteTable::from_json(&json)?);
        }
        Ok(routes)
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage remotes
    Remote(commands::remote::RemoteArgs),

    /// Manage repositories
    Repository(commands::repository::RepositoryArgs),

    /// Manage distributions
    Distribution(commands::distribution::DistributionArgs),

    /// Manage artifacts
    Artifact(commands::artifact::ArtifactArgs),

    /// Manage file content
    Content(commands::content::ContentArgs),

    /// Manage X.509 certificate content guards
    X509Guard(commands::x509_guard::X509GuardArgs),

    /// Inspect, await, cancel or delete tasks
    Task(commands::task::TaskArgs),

    /// Synchronize a repository from a remote
    Sync(commands::sync::SyncArgs),

    /// Repair a file repository version
    Repair(commands::repair::RepairArgs),

    /// Delete orphaned content and artifacts
    Orphans,
}

impl Commands {
    fn validate(&self) -> Result<(), CliError> {
        match self {
            Commands::Remote(args) => args.validate(),
            Commands::Repository(args) => args.validate(),
            Commands::Distribution(args) => args.validate(),
            Commands::X509Guard(args) => args.validate(),
            _ => Ok(()),
        }
    }

    fn run(&self, engine: &Engine) -> squeezer_core::SqueezerResult<()> {
        match self {
            Commands::Remote(args) => commands::remote::run(engine, args),
            Commands::Repository(args) => commands::repository::run(engine, args),
            Commands::Distribution(args) => commands::distribution::run(engine, args),
            Commands::Artifact(args) => commands::artifact::run(engine, args),
            Commands::Content(args) => commands::content::run(engine, args),
            Commands::X509Guard(args) => commands::x509_guard::run(engine, args),
            Commands::Task(args) => commands::task::run(engine, args),
            Commands::Sync(args) => commands::sync::run(engine, args),
            Commands::Repair(args) => commands::repair::run(engine, args),
            Commands::Orphans => commands::orphans::run(engine),
        }
    }
}

fn build_engine(cli: &Cli) -> Result<Engine, CliError> {
    let client = ReqwestClient::new(&cli.connection)?;
    let transport =
        HttpTransport::with_routes(cli.connection.pulp_url.as_str(), client, cli.engine.routes()?);
    Ok(Engine::new(cli.engine.config()?, transport))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for the report
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut reporter = JsonReporter::stdout();
    let engine = match cli.command.validate().and_then(|()| build_engine(&cli)) {
        Ok(engine) => engine,
        Err(error) => {
            reporter.report_failure(&Failure {
                failed: true,
                msg: error.to_string(),
                changed: false,
                exception: None,
            });
            return ExitCode::FAILURE;
        }
    };

    if engine.run(&mut reporter, |engine| cli.command.run(engine)) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
