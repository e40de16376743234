/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame header does not start with the validity marker.
    #[error("invalid frame marker {found:02x?} (expected \"SRPC\")")]
    InvalidMagic { found: [u8; 4] },

    /// The total frame size disagrees with header + payload size.
    #[error("frame size mismatch (payload {payload} bytes, total {total} bytes)")]
    SizeMismatch { payload: usize, total: usize },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The stream ended before the declared frame was received.
    #[error("incomplete frame ({received} of {expected} bytes)")]
    Incomplete { expected: usize, received: usize },

    /// The payload is not a valid parameter list.
    #[error(transparent)]
    Params(#[from] sockrpc_params::ParamsError),
}

impl FrameError {
    /// Stable status code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            FrameError::InvalidMagic { .. }
            | FrameError::SizeMismatch { .. }
            | FrameError::PayloadTooLarge { .. } => "invalid_header",
            FrameError::Incomplete { .. } => "incomplete_frame",
            FrameError::Params(err) => err.code(),
        }
    }

    /// True when the header itself was rejected, before any payload parsing.
    pub fn is_invalid_header(&self) -> bool {
        self.code() == "invalid_header"
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
