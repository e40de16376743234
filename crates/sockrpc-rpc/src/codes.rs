//! Field names and status codes of the call convention.

/// Request field naming the method, as a string or an integer id.
pub const METHOD: &str = "method";

/// Answer path of the application status code.
pub const RESULT_CODE: [&str; 2] = ["result", "code"];

/// Optional human-readable companion of [`RESULT_CODE`].
pub const RESULT_MESSAGE: [&str; 2] = ["result", "message"];

/// The only application status code that means success.
pub const OK: &str = "ok";

/// Reported when an answer carries no `result.code`.
pub const UNKNOWN_RPC_CLIENT_ANSWER_CODE: &str = "UNKNOWN_RPC_CLIENT_ANSWER_CODE";
