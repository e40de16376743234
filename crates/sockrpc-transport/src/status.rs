use std::fmt;

/// Outcome recorded on a socket or RPC instance after each operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Ok,
    Failed { code: String, message: String },
}

impl Status {
    pub const OK_CODE: &'static str = "ok";

    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        Status::Failed {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }

    /// `"ok"` or the failure code.
    pub fn code(&self) -> &str {
        match self {
            Status::Ok => Self::OK_CODE,
            Status::Failed { code, .. } => code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Status::Ok => "",
            Status::Failed { message, .. } => message,
        }
    }
}

impl From<&crate::SockError> for Status {
    fn from(err: &crate::SockError) -> Self {
        Status::failed(err.code(), err.to_string())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => f.write_str(Self::OK_CODE),
            Status::Failed { code, message } if message.is_empty() => f.write_str(code),
            Status::Failed { code, message } => write!(f, "{code}: {message}"),
        }
    }
}
