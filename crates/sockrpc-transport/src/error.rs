use std::time::Duration;

/// Errors that can occur in socket core operations.
///
/// Every variant maps to a stable status code (see [`SockError::code`]) that
/// is recorded on the socket instance and surfaced to RPC callers.
#[derive(Debug, thiserror::Error)]
pub enum SockError {
    /// `socket(2)` failed for a client descriptor.
    #[error("failed to create socket for {identity}: {source}")]
    SocketCreate {
        identity: String,
        source: std::io::Error,
    },

    /// `socket(2)` failed for a listening descriptor.
    #[error("failed to open listening socket for {identity}: {source}")]
    OpenListen {
        identity: String,
        source: std::io::Error,
    },

    /// The endpoint ip could not be parsed for the configured domain.
    #[error("invalid address {ip:?} for {domain}")]
    InvalidAddress { ip: String, domain: &'static str },

    /// Failed to bind the listening descriptor.
    #[error("failed to bind port {port}: {source}")]
    Bind { port: u16, source: std::io::Error },

    /// `listen(2)` failed.
    #[error("failed to listen on port {port}: {source}")]
    Listen { port: u16, source: std::io::Error },

    /// Non-blocking connect was refused or failed outright.
    #[error("failed to connect to {identity}: {source}")]
    Connect {
        identity: String,
        source: std::io::Error,
    },

    /// The readiness wait itself failed.
    #[error("readiness wait failed: {0}")]
    Waiting(std::io::Error),

    /// The readiness wait elapsed without the descriptor becoming ready.
    #[error("timed out after {0:?} waiting for {1}")]
    Timeout(Duration, &'static str),

    /// `write` was called without a registered descriptor.
    #[error("socket {0} is not connected for write")]
    NotConnectedForWrite(String),

    /// `read` was called without a registered descriptor.
    #[error("socket {0} is not connected for read")]
    NotConnectedForRead(String),

    /// A send failed or delivered fewer bytes than requested.
    #[error("socket write failed ({sent} of {requested} bytes sent): {source}")]
    Write {
        requested: usize,
        sent: usize,
        source: std::io::Error,
    },

    /// Transient receive errors persisted past the read waiting timeout.
    #[error(
        "read waiting timeout: packet size {packet_size}, limit {limit:?}, waited {waited:?}"
    )]
    ReadWaiting {
        packet_size: usize,
        limit: Duration,
        waited: Duration,
    },

    /// A non-transient receive error.
    #[error("socket read error: {0}")]
    Read(std::io::Error),
}

impl SockError {
    /// Stable status code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            SockError::SocketCreate { .. } => "SocketCreateError",
            SockError::OpenListen { .. } => "ErrorOpenHandleForListen",
            SockError::InvalidAddress { .. } => "InvalidAddress",
            SockError::Bind { .. } => "BindSocketError",
            SockError::Listen { .. } => "ServerListenError",
            SockError::Connect { .. } => "ConnectError",
            SockError::Waiting(_) => "ConnectionWaitingError",
            SockError::Timeout(..) => "ConnectionTimeout",
            SockError::NotConnectedForWrite(_) => "SocketIsNotConnectedForWrite",
            SockError::NotConnectedForRead(_) => "no_connected",
            SockError::Write { .. } => "SocketWriteError",
            SockError::ReadWaiting { .. } => "socket_read_waiting_error",
            SockError::Read(_) => "socket_read_error",
        }
    }

    /// True for readiness-wait failures and elapsed timeouts.
    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            SockError::Waiting(_) | SockError::Timeout(..) | SockError::ReadWaiting { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let err = SockError::Timeout(Duration::from_secs(2), "connect");
        assert_eq!(err.code(), "ConnectionTimeout");
        assert!(err.is_waiting());

        let err = SockError::Connect {
            identity: "127.0.0.1:1".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        };
        assert_eq!(err.code(), "ConnectError");
        assert!(!err.is_waiting());
    }

    #[test]
    fn read_waiting_reports_limits() {
        let err = SockError::ReadWaiting {
            packet_size: 1024,
            limit: Duration::from_millis(500),
            waited: Duration::from_millis(502),
        };
        let text = err.to_string();
        assert!(text.contains("1024"));
        assert!(text.contains("500ms"));
        assert_eq!(err.code(), "socket_read_waiting_error");
    }
}
