//! Non-blocking BSD socket core.
//!
//! A [`Sock`] connects, writes and reads answers as a client, or runs a
//! poll-based reactor over a listening descriptor as a server. Callers steer
//! it through the capability traits in [`events`]; every failure is returned
//! as a [`SockError`] and also recorded as the socket's [`Status`].
//!
//! This is the lowest layer of sockrpc. Framing and RPC build on top of it.

#![cfg(unix)]

pub mod buffer;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod registry;
pub mod sock;
pub mod status;

mod sys;

pub use buffer::{ByteAccumulator, Chunk};
pub use config::SockConfig;
pub use endpoint::{Endpoint, SocketDomain, SocketType};
pub use error::{Result, SockError};
pub use events::{ConnectEvents, ListenEvents, NoEvents, ReadEvents, SockEvents, WriteEvents};
pub use registry::HandleRegistry;
pub use sock::{ReadSummary, Responder, Sock, StopHandle};
pub use status::Status;
