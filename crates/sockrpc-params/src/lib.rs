//! Parameter container for sockrpc requests and answers.
//!
//! A [`ParamList`] is an ordered tree of named values addressed by dotted or
//! segmented [`ParamPath`]s. It serializes to compact JSON with key order
//! preserved, which is the payload format carried inside every frame.

pub mod error;
pub mod list;
pub mod path;

pub use error::{ParamsError, Result};
pub use list::ParamList;
pub use path::ParamPath;

/// Re-exported so callers can build values without a direct `serde_json` dependency.
pub use serde_json::{json, Value};
