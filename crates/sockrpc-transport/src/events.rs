//! Capability traits for observing and steering a [`Sock`](crate::Sock).
//!
//! Every method has a no-op default, so an implementor only overrides the
//! transitions it cares about. [`NoEvents`] implements all of them with the
//! defaults.

use std::os::fd::RawFd;

use crate::buffer::ByteAccumulator;
use crate::endpoint::Endpoint;
use crate::error::SockError;
use crate::sock::Responder;

/// Client connect lifecycle.
pub trait ConnectEvents {
    /// A fresh descriptor is about to connect.
    fn on_connect_before(&mut self, _endpoint: &Endpoint) {}

    /// The connection completed and the descriptor was registered.
    fn on_connect_success(&mut self, _endpoint: &Endpoint, _fd: RawFd) {}

    /// The connect attempt failed.
    fn on_connect_error(&mut self, _endpoint: &Endpoint, _err: &SockError) {}

    /// Fires once per attempt that opened a descriptor, after success or failure is known.
    fn on_connect_after(&mut self, _endpoint: &Endpoint) {}
}

/// Read loop steering.
pub trait ReadEvents {
    /// Called before any bytes are received; `false` vetoes the read.
    fn on_read_before(&mut self, _remote: &str) -> bool {
        true
    }

    /// Called after every received chunk; `true` keeps reading.
    fn on_read(&mut self, _buffer: &ByteAccumulator) -> bool {
        false
    }

    /// Called once the loop finished without error.
    ///
    /// `peer` writes back over the descriptor that was read. Returning
    /// `false` asks a listener to close that connection.
    fn on_read_after(&mut self, _buffer: &ByteAccumulator, _peer: &mut Responder<'_>) -> bool {
        true
    }

    /// Called instead of `on_read_after` when the loop failed.
    fn on_read_error(&mut self, _err: &SockError, _buffer: &ByteAccumulator) {}
}

/// Listener lifecycle.
pub trait ListenEvents {
    /// The descriptor is bound and about to start listening.
    fn on_listen_before(&mut self, _port: u16) {}

    /// The descriptor accepts connections; `port` is the bound port.
    fn on_listen_ready(&mut self, _port: u16) {}

    /// The reactor loop exited and descriptors were released.
    fn on_listen_after(&mut self, _port: u16) {}
}

/// Write failures.
pub trait WriteEvents {
    fn on_write_error(&mut self, _err: &SockError) {}
}

/// Everything a [`Sock`](crate::Sock) reports to.
pub trait SockEvents: ConnectEvents + ReadEvents + ListenEvents + WriteEvents {}

impl<T> SockEvents for T where T: ConnectEvents + ReadEvents + ListenEvents + WriteEvents {}

/// Default events: observe nothing, read a single chunk.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvents;

impl ConnectEvents for NoEvents {}
impl ReadEvents for NoEvents {}
impl ListenEvents for NoEvents {}
impl WriteEvents for NoEvents {}
