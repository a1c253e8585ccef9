//! FEP Control CLI: terminal and websocket console for FEP systems.
//!
//! Runs a single command (`--execute`), the interactive terminal, or a
//! websocket listener serving one session per client.

mod repl;

use clap::Parser;
use fep_control_core::config::{self, ControlConfig, SessionOverrides};
use fep_control_core::gateway::{GatewayState, run_gateway};
use fep_control_core::shutdown::{on_shutdown, spawn_signal_watchdog};
use fep_control_core::{FleetService, OutputFormatter, Session, SimulatedFleet, StdoutSink};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const USAGE: [&str; 3] = [
    "invalid commandline, use: fep_control --auto_discovery --execute <execute_command>",
    "                     or:  fep_control --execute <execute_command>",
    "                     or:  fep_control -ad -e <execute_command>",
];

/// FEP Control: command console for distributed FEP systems
#[derive(Parser, Debug)]
#[command(name = "fep_control", version, about, long_about = None)]
struct Cli {
    /// Run one command with its arguments and exit with its status
    #[arg(
        short = 'e',
        long,
        num_args = 1..,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    execute: Option<Vec<String>>,

    /// Discover unknown systems on first use (short form: -ad)
    #[arg(long = "auto_discovery")]
    auto_discovery: bool,

    /// Structured JSON output
    #[arg(long)]
    json: bool,

    /// Serve sessions over WebSocket instead of the terminal
    #[arg(long)]
    websocket: bool,

    /// Increase diagnostic verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn overrides(&self) -> SessionOverrides {
        SessionOverrides {
            auto_discovery: self.auto_discovery.then_some(true),
            json: self.json.then_some(true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Execute(Vec<String>),
    Terminal,
    Websocket,
}

/// `-ad` is a two-letter short option, which clap cannot express.
fn preprocess_args(args: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out = Vec::new();
    let mut in_command = false;
    for arg in args {
        if !in_command && arg == "-ad" {
            out.push("--auto_discovery".to_string());
            continue;
        }
        if arg == "-e" || arg == "--execute" {
            in_command = true;
        }
        out.push(arg);
    }
    out
}

/// Mode for the parsed flags; `None` means the arguments make no sense.
fn select_mode(cli: &Cli, has_args: bool) -> Option<Mode> {
    if let Some(command) = &cli.execute {
        return Some(Mode::Execute(command.clone()));
    }
    if cli.websocket {
        return Some(Mode::Websocket);
    }
    if cli.json || !has_args {
        return Some(Mode::Terminal);
    }
    None
}

fn usage_exit() -> ! {
    for line in USAGE {
        eprintln!("{line}");
    }
    std::process::exit(-1);
}

fn init_tracing(verbose: u8, mode: &Mode) -> tracing_appender::non_blocking::WorkerGuard {
    // Stdout carries the console protocol; keep stderr quiet unless asked.
    let filter = match (verbose, mode) {
        (0, Mode::Websocket) => "info",
        (0, _) => "warn",
        (1, _) => "info",
        (2, _) => "debug",
        _ => "trace",
    };
    let stderr_filter = if verbose == 0 {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter))
    } else {
        EnvFilter::new(filter)
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter);

    let log_dir = config::log_dir().unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "fep_control.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();
    guard
}

fn build_fleet(config: &ControlConfig) -> Arc<dyn FleetService> {
    tracing::debug!(systems = config.fleet.systems.len(), "building simulated fleet");
    Arc::new(SimulatedFleet::new(&config.fleet))
}

fn stdout_session(fleet: Arc<dyn FleetService>, config: &ControlConfig) -> Session {
    let out = Arc::new(OutputFormatter::new(StdoutSink, config.session.json));
    Session::new(fleet, out, config.session.auto_discovery)
}

async fn run(mode: Mode, config: ControlConfig) -> anyhow::Result<i32> {
    let fleet = build_fleet(&config);
    match mode {
        Mode::Execute(command) => {
            let mut session = stdout_session(fleet, &config);
            let status = tokio::task::spawn_blocking(move || {
                let status = session.execute(&command);
                if session.exit_requested() {
                    session.out().goodbye();
                }
                status
            })
            .await?;
            Ok(status)
        }
        Mode::Terminal => {
            let session = stdout_session(fleet, &config);
            let shutdown = CancellationToken::new();
            spawn_signal_watchdog(shutdown.clone());
            let out = Arc::clone(session.out());
            let terminal = repl::TerminalMode::capture_stdin();
            on_shutdown(shutdown.clone(), move || {
                // The editor thread may still hold the tty in raw mode.
                terminal.restore();
                out.goodbye();
                std::process::exit(0);
            });
            tokio::task::spawn_blocking(move || repl::run_terminal(session, shutdown)).await??;
            Ok(0)
        }
        Mode::Websocket => {
            let shutdown = CancellationToken::new();
            spawn_signal_watchdog(shutdown.clone());
            let gateway = Arc::new(GatewayState::new(
                fleet,
                config.gateway.clone(),
                config.session.clone(),
                shutdown,
            ));
            run_gateway(gateway).await?;
            Ok(0)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = preprocess_args(std::env::args());
    let has_args = args.len() > 1;
    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(e)
            if matches!(
                e.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            e.exit()
        }
        Err(_) => usage_exit(),
    };
    let Some(mode) = select_mode(&cli, has_args) else {
        usage_exit();
    };

    let guard = init_tracing(cli.verbose, &mode);

    let workspace = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = config::load_config(Some(&workspace), Some(&cli.overrides()))
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if !config::config_exists(Some(&workspace)) {
        tracing::debug!("no configuration file found, using defaults");
    }
    tracing::info!(?mode, "starting fep_control");

    let status = run(mode, config).await?;
    drop(guard);
    std::process::exit(status);
}
