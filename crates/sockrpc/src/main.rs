mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "sockrpc", version, about = "RPC over BSD sockets")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", env = "SOCKRPC_LOG_LEVEL", default_value = "info", global = true)]
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
    use std::time::Duration;

    use super::*;

    #[test]
    fn parses_call_with_params() {
        let cli = Cli::try_parse_from([
            "sockrpc",
            "call",
            "127.0.0.1:11120",
            "echo",
            "--param",
            "name=ana",
            "--param",
            "count=2",
            "--answer-timeout",
            "250ms",
        ])
        .expect("call args should parse");

        let Command::Call(args) = cli.command else {
            panic!("expected call subcommand");
        };
        assert_eq!(args.params.len(), 2);
        assert_eq!(args.sock.answer_timeout, Duration::from_millis(250));
        assert!(!args.id);
    }

    #[test]
    fn rejects_param_without_value() {
        let err = Cli::try_parse_from(["sockrpc", "call", "127.0.0.1:1", "echo", "--param", "oops"])
            .expect_err("malformed param should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_serve_subcommand() {
        let cli = Cli::try_parse_from(["sockrpc", "serve", "--port", "0", "--listen-tick", "200ms"])
            .expect("serve args should parse");
        let Command::Serve(args) = cli.command else {
            panic!("expected serve subcommand");
        };
        assert_eq!(args.port, 0);
        assert_eq!(args.listen_tick, Duration::from_millis(200));
    }
}
