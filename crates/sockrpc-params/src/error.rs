/// Errors that can occur while building or (de)serializing a parameter list.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    /// A path with no segments was used to address a value.
    #[error("empty parameter path")]
    EmptyPath,

    /// An intermediate path segment holds a scalar or array.
    #[error("parameter {path} is not an object")]
    NotAnObject { path: String },

    /// The buffer is not a JSON object.
    #[error("failed to decode parameters: {0}")]
    Decode(#[source] serde_json::Error),

    /// The root of a decoded document is not an object.
    #[error("decoded parameters are not an object")]
    NotAMap,

    #[error("failed to encode parameters: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ParamsError {
    /// Stable status code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ParamsError::EmptyPath => "params_empty_path",
            ParamsError::NotAnObject { .. } => "params_not_an_object",
            ParamsError::Decode(_) | ParamsError::NotAMap => "params_decode_error",
            ParamsError::Encode(_) => "params_encode_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, ParamsError>;
