use std::fmt;

use sockrpc_rpc::RpcError;
use sockrpc_transport::SockError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
/// The server answered with a `result.code` other than `"ok"`.
pub const APPLICATION_ERROR: i32 = 70;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn sock_error(context: &str, err: &SockError) -> CliError {
    let code = match err {
        err if err.is_waiting() => TIMEOUT,
        SockError::InvalidAddress { .. } => USAGE,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: [{}] {err}", err.code()))
}

pub fn rpc_error(context: &str, err: &RpcError) -> CliError {
    match err {
        RpcError::Sock(inner) => sock_error(context, inner),
        RpcError::Frame(_) | RpcError::Params(_) | RpcError::NoAnswer => {
            CliError::new(DATA_INVALID, format!("{context}: [{}] {err}", err.code()))
        }
        RpcError::Application { .. } => {
            CliError::new(APPLICATION_ERROR, format!("{context}: {err}"))
        }
        RpcError::Halted { .. } => {
            CliError::new(FAILURE, format!("{context}: [{}] {err}", err.code()))
        }
    }
}
