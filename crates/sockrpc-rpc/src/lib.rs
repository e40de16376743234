//! Synchronous call/answer RPC over framed parameter lists.
//!
//! An [`RpcClient`] writes one framed request and blocks until the framed
//! answer arrives or a timeout fires. An [`RpcServer`] runs the socket
//! reactor and hands each decoded request to an [`RpcHandler`].
//!
//! Transport success and application success are separate: a delivered
//! answer whose `result.code` is not `"ok"` is an [`RpcError::Application`].

pub mod client;
pub mod codes;
pub mod container;
pub mod error;
pub mod handler;
pub mod server;

pub use client::{Method, RpcClient};
pub use container::Container;
pub use error::{Result, RpcError};
pub use handler::{DefaultHandler, RpcHandler};
pub use server::{RpcServer, ShutdownHandle};

pub use sockrpc_params::ParamList;
pub use sockrpc_transport::{Endpoint, SockConfig, Status};
