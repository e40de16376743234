//! Size-prefixed message framing for sockrpc.
//!
//! Every message is framed with:
//! - A 4-byte validity marker ("SRPC") rejected before any payload parsing
//! - A 4-byte little-endian payload size
//! - A 4-byte little-endian total frame size (header + payload)
//!
//! The payload is a [`ParamList`](sockrpc_params::ParamList) serialized as JSON.

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{
    decode_complete, decode_frame, encode_frame, inspect, FrameConfig, Header, Progress,
    DEFAULT_MAX_PAYLOAD, HEADER_SIZE, MAGIC,
};
pub use error::{FrameError, Result};
pub use message::{decode_params, encode_params, frame_params};
