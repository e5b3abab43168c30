use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Args, Subcommand};
use tablelink_peer::{connect, Dispatcher, DispatcherConfig, PeerError};
use tablelink_transport::TransportError;

use crate::exit::{peer_error, CliError, CliResult, INTERNAL, TIMEOUT, USAGE};
use crate::output::OutputFormat;

pub mod call;
pub mod demo;
pub mod settings;
pub mod simulate;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulated table on a Unix socket.
    Simulate(SimulateArgs),
    /// Send one command and print the response.
    Call(CallArgs),
    /// Read and print the table settings.
    Settings(SettingsArgs),
    /// Start a game and print goals as they are reported.
    Watch(WatchArgs),
    /// Watch a game against an in-process simulated table.
    Demo(DemoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Simulate(args) => simulate::run(args),
        Command::Call(args) => call::run(args, format),
        Command::Settings(args) => settings::run(args, format),
        Command::Watch(args) => watch::run(args, format),
        Command::Demo(args) => demo::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Seed for reproducible goal timing and content.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Shortest delay between goals (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s")]
    pub min_goal_delay: String,
    /// Longest delay between goals (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub max_goal_delay: String,
    /// How often the simulator checks for requests and due goals.
    #[arg(long, default_value = "100ms")]
    pub poll_interval: String,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// Command token, e.g. "GET; AI DIFFICULTY".
    pub command: String,
    /// Comma-separated arguments.
    #[arg(long, default_value = "")]
    pub args: String,
    /// Response timeout (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct SettingsArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// Response timeout per setting (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// How long the game runs (e.g. 20s).
    #[arg(long, default_value = "20s")]
    pub duration: String,
    /// Response timeout (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct DemoArgs {
    /// How long the game runs (e.g. 10s).
    #[arg(long, default_value = "10s")]
    pub duration: String,
    /// Seed for reproducible goal timing and content.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Longest delay between goals (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub max_goal_delay: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms`, `5s` or bare seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// Connect to a simulated or real table, retrying while the socket is not up yet.
pub fn connect_with_retry(
    path: &Path,
    config: DispatcherConfig,
    patience: Duration,
) -> CliResult<Dispatcher> {
    let start = Instant::now();
    loop {
        match connect(path, config.clone()) {
            Ok(dispatcher) => return Ok(dispatcher),
            Err(err) => {
                if !is_retryable_connect_error(&err) {
                    return Err(peer_error("connect failed", err));
                }
                if start.elapsed() >= patience {
                    return Err(CliError::new(
                        TIMEOUT,
                        format!("connect timed out after {patience:?}"),
                    ));
                }
                std::thread::sleep(Duration::from_millis(50));
            }
        }
    }
}

fn is_retryable_connect_error(err: &PeerError) -> bool {
    match err {
        PeerError::Transport(TransportError::Connect { source, .. }) => {
            source.kind() == std::io::ErrorKind::NotFound
                || source.kind() == std::io::ErrorKind::ConnectionRefused
        }
        _ => false,
    }
}

/// Clear the returned flag on Ctrl-C.
pub fn install_ctrlc_handler() -> CliResult<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;
    Ok(running)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn parse_duration_millis() {
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration(" 100ms ").unwrap(), Duration::from_millis(100));
    }

    #[test]
    fn parse_duration_invalid() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
        assert_eq!(parse_duration("-1s").unwrap_err().code, USAGE);
    }

    #[test]
    fn missing_socket_is_retryable() {
        let err = PeerError::Transport(TransportError::Connect {
            path: "/tmp/absent.sock".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        assert!(is_retryable_connect_error(&err));
        assert!(!is_retryable_connect_error(&PeerError::IdInUse(0)));
    }
}
