use sockrpc_frame::FrameError;
use sockrpc_params::ParamsError;
use sockrpc_transport::SockError;

/// Errors that can occur in RPC client and server operations.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Sock(#[from] SockError),

    /// Frame-level error, including an invalid answer header.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The request could not be built.
    #[error("parameter error: {0}")]
    Params(#[from] ParamsError),

    /// The peer closed the connection without answering.
    #[error("connection closed before an answer arrived")]
    NoAnswer,

    /// The answer carried a `result.code` other than `"ok"`.
    #[error("application error {code}{}", detail(.message))]
    Application { code: String, message: String },

    /// A previous transport failure is still recorded on the client.
    #[error("client halted by earlier failure {code}: {message}")]
    Halted { code: String, message: String },
}

impl RpcError {
    /// Stable status code for this error.
    ///
    /// Application errors report the code chosen by the server handler.
    pub fn code(&self) -> &str {
        match self {
            RpcError::Sock(err) => err.code(),
            RpcError::Frame(err) => err.code(),
            RpcError::Params(err) => err.code(),
            RpcError::NoAnswer => "no_answer",
            RpcError::Application { code, .. } | RpcError::Halted { code, .. } => code,
        }
    }

    /// True for failures that leave the client disconnected.
    pub fn is_transport(&self) -> bool {
        !matches!(self, RpcError::Application { .. } | RpcError::Params(_))
    }
}

fn detail(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {message}")
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
