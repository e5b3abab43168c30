mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "tablelink", version, about = "Air-hockey table link CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_call_subcommand() {
        let cli = Cli::try_parse_from([
            "tablelink",
            "call",
            "/tmp/table.sock",
            "SET; TABLE AIR SPEED",
            "--args",
            "80",
            "--timeout",
            "500ms",
        ])
        .expect("call args should parse");

        match cli.command {
            Command::Call(args) => {
                assert_eq!(args.command, "SET; TABLE AIR SPEED");
                assert_eq!(args.args, "80");
                assert_eq!(args.timeout, "500ms");
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn call_args_default_to_empty() {
        let cli = Cli::try_parse_from(["tablelink", "call", "/tmp/table.sock", "GET; AI STATE"])
            .expect("call args should parse");
        assert!(matches!(cli.command, Command::Call(args) if args.args.is_empty()));
    }

    #[test]
    fn parses_simulate_with_seed() {
        let cli = Cli::try_parse_from([
            "tablelink",
            "--log-level",
            "debug",
            "simulate",
            "/tmp/table.sock",
            "--seed",
            "42",
            "--max-goal-delay",
            "2s",
        ])
        .expect("simulate args should parse");

        assert!(matches!(cli.log_level, LogLevel::Debug));
        assert!(matches!(cli.command, Command::Simulate(args) if args.seed == Some(42)));
    }

    #[test]
    fn rejects_unknown_format() {
        let err = Cli::try_parse_from(["tablelink", "--format", "xml", "version"])
            .expect_err("unknown format should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
