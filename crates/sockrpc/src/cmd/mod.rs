use std::time::Duration;

use clap::{Args, Subcommand};
use sockrpc_transport::SockConfig;

use crate::exit::{CliError, CliResult};
use crate::output::OutputFormat;

pub mod call;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run an RPC server with the built-in handler.
    Serve(ServeArgs),
    /// Call one method and print the answer.
    Call(CallArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Call(args) => call::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Socket tunables shared by `serve` and `call`.
#[derive(Args, Debug, Clone)]
pub struct SockArgs {
    /// Bytes requested per receive call.
    #[arg(long, env = "SOCKRPC_PACKET_SIZE", default_value_t = sockrpc_transport::config::DEFAULT_PACKET_SIZE)]
    pub packet_size: usize,
    /// Give up on a stalled read after this long (e.g. 500ms, 1s).
    #[arg(long, env = "SOCKRPC_READ_TIMEOUT", default_value = "500ms", value_parser = parse_duration)]
    pub read_timeout: Duration,
    /// Connect timeout.
    #[arg(long, env = "SOCKRPC_CONNECT_TIMEOUT", default_value = "2s", value_parser = parse_duration)]
    pub connect_timeout: Duration,
    /// Time to wait for an answer to start arriving.
    #[arg(long, env = "SOCKRPC_ANSWER_TIMEOUT", default_value = "1s", value_parser = parse_duration)]
    pub answer_timeout: Duration,
    /// Time allowed to drain one write.
    #[arg(long, env = "SOCKRPC_WRITE_TIMEOUT", default_value = "2s", value_parser = parse_duration)]
    pub write_timeout: Duration,
}

impl SockArgs {
    pub fn to_config(&self) -> SockConfig {
        SockConfig {
            packet_size: self.packet_size.max(1),
            read_waiting_timeout: self.read_timeout,
            connect_timeout: self.connect_timeout,
            answer_timeout: self.answer_timeout,
            write_timeout: self.write_timeout,
            ..SockConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on; 0 picks a free one.
    #[arg(long, short = 'p', env = "SOCKRPC_PORT", default_value_t = 11120)]
    pub port: u16,
    /// Listen backlog.
    #[arg(long, env = "SOCKRPC_BACKLOG", default_value_t = sockrpc_transport::config::DEFAULT_BACKLOG)]
    pub backlog: u32,
    /// Reactor tick; bounds shutdown latency (e.g. 1s, 200ms).
    #[arg(long, env = "SOCKRPC_LISTEN_TICK", default_value = "1s", value_parser = parse_duration)]
    pub listen_tick: Duration,
    #[command(flatten)]
    pub sock: SockArgs,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Server address as ip:port (e.g. 127.0.0.1:11120, [::1]:11120).
    pub target: String,
    /// Method name, or integer id with --id.
    pub method: String,
    /// Request parameter as key=value; dotted keys nest. Repeatable.
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
    /// Send the method as an integer id.
    #[arg(long)]
    pub id: bool,
    #[command(flatten)]
    pub sock: SockArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> Result<Duration, CliError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

fn parse_param(input: &str) -> Result<(String, String), CliError> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(CliError::usage(format!("expected KEY=VALUE, got {input:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
    }

    #[test]
    fn parse_param_splits_on_first_equals() {
        assert_eq!(
            parse_param("query=a=b").unwrap(),
            ("query".to_string(), "a=b".to_string())
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }
}
