//! Minimal RPC transport on BSD sockets.
//!
//! sockrpc frames a JSON parameter list behind a fixed 12-byte header and
//! exchanges it over non-blocking TCP sockets driven by a `poll(2)` reactor.
//!
//! # Crate Structure
//!
//! - [`transport`] — Socket core: connect, listen, read loop, handle registry
//! - [`params`] — Ordered parameter container addressed by dotted paths
//! - [`frame`] — Header validation and payload framing
//! - [`rpc`] — Synchronous RPC client and server (behind `rpc` feature)

/// Re-export transport types.
pub mod transport {
    pub use sockrpc_transport::*;
}

/// Re-export parameter container types.
pub mod params {
    pub use sockrpc_params::*;
}

/// Re-export frame types.
pub mod frame {
    pub use sockrpc_frame::*;
}

/// Re-export RPC types (requires `rpc` feature).
#[cfg(feature = "rpc")]
pub mod rpc {
    pub use sockrpc_rpc::*;
}
