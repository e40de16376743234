use std::io::ErrorKind;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::buffer::ByteAccumulator;
use crate::config::SockConfig;
use crate::endpoint::Endpoint;
use crate::error::{Result, SockError};
use crate::events::{NoEvents, ReadEvents, SockEvents};
use crate::registry::HandleRegistry;
use crate::status::Status;
use crate::sys;

/// Cooperative stop flag for a listening [`Sock`].
///
/// Cloning shares the flag, so a handle can be moved to another thread
/// before the reactor loop starts.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Ask the reactor loop to exit after its current tick.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One accepted peer of a listening socket.
#[derive(Debug)]
struct Connection {
    fd: OwnedFd,
    address: String,
}

/// Summary of one pass through the read loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadSummary {
    /// Bytes accumulated.
    pub bytes: usize,
    /// Chunks received.
    pub chunks: usize,
    /// A zero-length receive ended the loop.
    pub peer_closed: bool,
    /// The pre-read hook accepted and the finalize hook returned `true`.
    pub accepted: bool,
}

impl ReadSummary {
    fn keep_connection(&self) -> bool {
        self.accepted && !self.peer_closed
    }
}

/// Write access to the descriptor a read came from.
#[derive(Debug)]
pub struct Responder<'a> {
    fd: RawFd,
    remote: &'a str,
    config: &'a SockConfig,
}

impl Responder<'_> {
    /// Send `bytes` back to the peer.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        send_all(self.fd, bytes, self.config)
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Textual peer address; empty on the client side.
    pub fn remote(&self) -> &str {
        self.remote
    }
}

/// Non-blocking socket bound to one [`Endpoint`].
///
/// A `Sock` plays either role: as a client it connects, writes and reads
/// answers; as a server it runs a single-threaded reactor over the
/// listening descriptor and every accepted connection. Descriptors are kept
/// in a [`HandleRegistry`] keyed by the endpoint identity, so repeated
/// `connect` calls on the same thread reuse one connection.
pub struct Sock<E = NoEvents> {
    endpoint: Endpoint,
    identity: String,
    config: SockConfig,
    registry: Arc<HandleRegistry>,
    events: E,
    status: Status,
    stop: StopHandle,
}

impl Sock {
    /// Socket without event hooks and with a private registry.
    pub fn new(endpoint: Endpoint) -> Self {
        Self::with_events(endpoint, NoEvents)
    }
}

impl<E> Sock<E> {
    /// Socket with event hooks and a private registry.
    pub fn with_events(endpoint: Endpoint, events: E) -> Self {
        let identity = endpoint.identity();
        Self {
            endpoint,
            identity,
            config: SockConfig::default(),
            registry: Arc::new(HandleRegistry::new()),
            events,
            status: Status::Ok,
            stop: StopHandle::default(),
        }
    }

    pub fn with_config(mut self, config: SockConfig) -> Self {
        self.config = config;
        self
    }

    /// Share descriptors with other sockets using the same registry.
    pub fn with_registry(mut self, registry: Arc<HandleRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Registry key, `ip:port`.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn config(&self) -> &SockConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SockConfig {
        &mut self.config
    }

    pub fn registry(&self) -> &Arc<HandleRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    pub fn into_events(self) -> E {
        self.events
    }

    /// Outcome of the last failing operation, or `Ok`.
    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// Forget a recorded failure.
    pub fn reset(&mut self) {
        self.status = Status::Ok;
    }

    /// Handle that stops the reactor loop from any thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Request the reactor loop to exit; latency is bounded by one tick.
    pub fn stop_listen(&self) {
        self.stop.stop();
    }

    /// Descriptor registered for this identity on the calling thread.
    pub fn handle(&self) -> Option<RawFd> {
        self.registry.get_handle(&self.identity)
    }

    pub fn is_connected(&self) -> bool {
        self.handle().is_some()
    }

    /// Close the descriptor registered for this identity on the calling thread.
    pub fn disconnect(&mut self) -> usize {
        let closed = self.registry.close_handles_by_thread(&self.identity);
        if closed > 0 {
            debug!(identity = %self.identity, "disconnected");
        }
        closed
    }

    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            debug!(identity = %self.identity, code = err.code(), error = %err, "socket operation failed");
            self.status = Status::from(err);
        }
        result
    }
}

impl<E: SockEvents> Sock<E> {
    /// Connect to the endpoint, or reuse the registered descriptor.
    pub fn connect(&mut self) -> Result<RawFd> {
        if let Some(fd) = self.handle() {
            return Ok(fd);
        }

        let result = match sys::socket(
            self.endpoint.domain().as_raw(),
            self.endpoint.socket_type().as_raw(),
        ) {
            Ok(fd) => {
                let result = self.connect_descriptor(fd);
                self.events.on_connect_after(&self.endpoint);
                result
            }
            Err(source) => Err(SockError::SocketCreate {
                identity: self.identity.clone(),
                source,
            }),
        };

        if let Err(err) = &result {
            self.events.on_connect_error(&self.endpoint, err);
        }
        self.record(result)
    }

    fn connect_descriptor(&mut self, fd: OwnedFd) -> Result<RawFd> {
        let raw = fd.as_raw_fd();
        sys::set_nonblocking(raw).map_err(|source| SockError::SocketCreate {
            identity: self.identity.clone(),
            source,
        })?;

        self.events.on_connect_before(&self.endpoint);

        let addr = self.endpoint.socket_addr()?;
        let connect_error = |source| SockError::Connect {
            identity: self.identity.clone(),
            source,
        };

        match sys::connect(raw, &addr) {
            Ok(()) => {}
            Err(err)
                if err.raw_os_error() == Some(libc::EINPROGRESS)
                    || err.kind() == ErrorKind::Interrupted =>
            {
                match sys::wait_ready(raw, libc::POLLOUT, self.config.connect_timeout) {
                    Ok(true) => {}
                    Ok(false) => {
                        return Err(SockError::Timeout(self.config.connect_timeout, "connect"))
                    }
                    Err(err) => return Err(SockError::Waiting(err)),
                }
            }
            Err(err) => return Err(connect_error(err)),
        }

        if let Some(err) = sys::take_socket_error(raw).map_err(connect_error)? {
            return Err(connect_error(err));
        }

        let raw = self.registry.add_handle(&self.identity, fd);
        debug!(identity = %self.identity, fd = raw, "connected");
        self.events.on_connect_success(&self.endpoint, raw);
        Ok(raw)
    }

    /// Send `bytes` over `fd`, or over the registered descriptor when `fd` is `None`.
    pub fn write(&mut self, bytes: &[u8], fd: Option<RawFd>) -> Result<usize> {
        let result = match self.handle() {
            None => Err(SockError::NotConnectedForWrite(self.identity.clone())),
            Some(own) => send_all(fd.unwrap_or(own), bytes, &self.config),
        };
        if let Err(err @ SockError::Write { .. }) = &result {
            self.events.on_write_error(err);
        }
        self.record(result)
    }

    /// Wait for the answer on the registered descriptor and run the read loop.
    pub fn client_read(&mut self) -> Result<ReadSummary> {
        let result = self.client_read_inner();
        self.record(result)
    }

    fn client_read_inner(&mut self) -> Result<ReadSummary> {
        let fd = self
            .handle()
            .ok_or_else(|| SockError::NotConnectedForRead(self.identity.clone()))?;

        match sys::wait_ready(fd, libc::POLLIN, self.config.answer_timeout) {
            Ok(true) => {}
            Ok(false) => return Err(SockError::Timeout(self.config.answer_timeout, "answer")),
            Err(err) => return Err(SockError::Waiting(err)),
        }

        read_descriptor(&mut self.events, &self.config, fd, "")
    }

    /// Bind, listen and run the reactor loop until [`stop_listen`](Self::stop_listen).
    ///
    /// Every descriptor registered for this identity on the calling thread,
    /// and every accepted connection, is closed before returning.
    pub fn listen(&mut self) -> Result<()> {
        let port = self.endpoint.port();

        let result = match self.open_listener() {
            Ok(fd) => {
                let bound = sys::local_port(fd).unwrap_or(port);
                info!(identity = %self.identity, port = bound, "listening");
                self.events.on_listen_ready(bound);
                self.run_reactor(fd)
            }
            Err(err) => Err(err),
        };

        let released = self.registry.close_handles_by_thread(&self.identity);
        self.stop.clear();
        info!(identity = %self.identity, released, "listener stopped");
        self.events.on_listen_after(port);

        self.record(result)
    }

    fn open_listener(&mut self) -> Result<RawFd> {
        if let Some(fd) = self.handle() {
            return Ok(fd);
        }

        let port = self.endpoint.port();
        let open_error = |source| SockError::OpenListen {
            identity: self.identity.clone(),
            source,
        };

        let fd = sys::socket(
            self.endpoint.domain().as_raw(),
            self.endpoint.socket_type().as_raw(),
        )
        .map_err(open_error)?;
        let raw = fd.as_raw_fd();
        sys::set_nonblocking(raw).map_err(open_error)?;
        sys::set_reuse_addr(raw).map_err(|source| SockError::Bind { port, source })?;
        sys::bind(raw, &self.endpoint.wildcard_addr())
            .map_err(|source| SockError::Bind { port, source })?;

        self.events.on_listen_before(port);
        sys::listen(raw, self.config.backlog).map_err(|source| SockError::Listen { port, source })?;

        Ok(self.registry.add_handle(&self.identity, fd))
    }

    fn run_reactor(&mut self, listener: RawFd) -> Result<()> {
        let mut connections: Vec<Connection> = Vec::new();
        let mut ready_set: Vec<libc::pollfd> = Vec::new();

        while !self.stop.is_stopped() {
            ready_set.clear();
            ready_set.push(sys::pollfd(listener, libc::POLLIN));
            ready_set.extend(
                connections
                    .iter()
                    .map(|conn| sys::pollfd(conn.fd.as_raw_fd(), libc::POLLIN)),
            );

            match sys::poll(&mut ready_set, self.config.listen_tick) {
                Ok(0) => continue,
                Ok(_) => {}
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(SockError::Waiting(err)),
            }

            if sys::is_ready(&ready_set[0]) {
                self.accept_one(listener, &mut connections);
            }

            // Only connections present when the set was built can be ready;
            // removals are applied after the scan so no neighbour is skipped.
            let mut keep = vec![true; connections.len()];
            for (index, entry) in ready_set[1..].iter().enumerate() {
                if !sys::is_ready(entry) {
                    continue;
                }
                let conn = &connections[index];
                keep[index] = match read_descriptor(
                    &mut self.events,
                    &self.config,
                    conn.fd.as_raw_fd(),
                    &conn.address,
                ) {
                    Ok(summary) => summary.keep_connection(),
                    Err(_) => false,
                };
            }

            let mut flags = keep.into_iter();
            connections.retain(|conn| {
                let keep = flags.next().unwrap_or(true);
                if !keep {
                    debug!(remote = %conn.address, fd = conn.fd.as_raw_fd(), "closing connection");
                }
                keep
            });
        }

        debug!(identity = %self.identity, open = connections.len(), "reactor loop exited");
        Ok(())
    }

    fn accept_one(&mut self, listener: RawFd, connections: &mut Vec<Connection>) {
        match sys::accept(listener) {
            Ok((fd, addr)) => {
                if let Err(err) = sys::set_nonblocking(fd.as_raw_fd()) {
                    warn!(error = %err, "dropping connection that cannot be made non-blocking");
                    return;
                }
                let address = addr.map(|addr| addr.ip().to_string()).unwrap_or_default();
                debug!(remote = %address, fd = fd.as_raw_fd(), "accepted connection");
                connections.push(Connection { fd, address });
            }
            Err(err) => {
                report_accept_failure(&self.identity, &err);
            }
        }
    }
}

/// Log an `accept` failure unless it is transient; returns whether it was logged.
fn report_accept_failure(identity: &str, err: &std::io::Error) -> bool {
    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) {
        return false;
    }
    warn!(
        identity,
        errno = err.raw_os_error().unwrap_or_default(),
        error = %err,
        "accept failed"
    );
    true
}

/// Receive from `fd` chunk by chunk until the events stop the loop.
fn read_descriptor<E: ReadEvents>(
    events: &mut E,
    config: &SockConfig,
    fd: RawFd,
    remote: &str,
) -> Result<ReadSummary> {
    if !events.on_read_before(remote) {
        return Ok(ReadSummary {
            bytes: 0,
            chunks: 0,
            peer_closed: false,
            accepted: false,
        });
    }

    let mut buffer = ByteAccumulator::new();
    let mut last_receive = Instant::now();
    let mut peer_closed = false;
    let mut failure = None;

    loop {
        let chunk = buffer.add(config.packet_size);
        match sys::recv(fd, chunk) {
            Ok(0) => {
                buffer.abandon();
                peer_closed = true;
                break;
            }
            Ok(read) => {
                buffer.commit(read);
                last_receive = Instant::now();
                if !events.on_read(&buffer) {
                    break;
                }
            }
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                buffer.abandon();
                thread::sleep(config.packet_wait_interval);
                let waited = last_receive.elapsed();
                if waited >= config.read_waiting_timeout {
                    failure = Some(SockError::ReadWaiting {
                        packet_size: config.packet_size,
                        limit: config.read_waiting_timeout,
                        waited,
                    });
                    break;
                }
            }
            Err(err) => {
                buffer.abandon();
                failure = Some(SockError::Read(err));
                break;
            }
        }
    }

    if let Some(err) = failure {
        events.on_read_error(&err, &buffer);
        return Err(err);
    }

    let mut responder = Responder {
        fd,
        remote,
        config,
    };
    let accepted = events.on_read_after(&buffer, &mut responder);
    Ok(ReadSummary {
        bytes: buffer.len(),
        chunks: buffer.items_count(),
        peer_closed,
        accepted,
    })
}

/// Send all of `bytes`, waiting for writability between short sends.
fn send_all(fd: RawFd, bytes: &[u8], config: &SockConfig) -> Result<usize> {
    let deadline = Instant::now() + config.write_timeout;
    let requested = bytes.len();
    let mut sent = 0usize;

    while sent < requested {
        let source = match sys::send(fd, &bytes[sent..]) {
            Ok(0) => std::io::Error::from(ErrorKind::WriteZero),
            Ok(n) => {
                sent += n;
                continue;
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                match sys::wait_ready(fd, libc::POLLOUT, remaining) {
                    Ok(true) if !remaining.is_zero() => continue,
                    Ok(_) => std::io::Error::from(ErrorKind::TimedOut),
                    Err(err) => err,
                }
            }
            Err(err) => err,
        };
        return Err(SockError::Write {
            requested,
            sent,
            source,
        });
    }

    Ok(sent)
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::events::{ConnectEvents, ListenEvents, WriteEvents};

    fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    fn quick_config() -> SockConfig {
        SockConfig {
            read_waiting_timeout: Duration::from_millis(100),
            connect_timeout: Duration::from_millis(300),
            answer_timeout: Duration::from_millis(300),
            listen_tick: Duration::from_millis(50),
            ..SockConfig::default()
        }
    }

    #[derive(Default)]
    struct Trace {
        calls: Vec<&'static str>,
        last_error: Option<&'static str>,
        received: Vec<u8>,
        keep_reading: bool,
    }

    impl ConnectEvents for Trace {
        fn on_connect_before(&mut self, _endpoint: &Endpoint) {
            self.calls.push("before");
        }
        fn on_connect_success(&mut self, _endpoint: &Endpoint, _fd: RawFd) {
            self.calls.push("success");
        }
        fn on_connect_error(&mut self, _endpoint: &Endpoint, err: &SockError) {
            self.calls.push("error");
            self.last_error = Some(err.code());
        }
        fn on_connect_after(&mut self, _endpoint: &Endpoint) {
            self.calls.push("after");
        }
    }

    impl ReadEvents for Trace {
        fn on_read(&mut self, _buffer: &ByteAccumulator) -> bool {
            self.keep_reading
        }
        fn on_read_after(&mut self, buffer: &ByteAccumulator, _peer: &mut Responder<'_>) -> bool {
            self.received = buffer.as_slice().to_vec();
            true
        }
        fn on_read_error(&mut self, err: &SockError, _buffer: &ByteAccumulator) {
            self.last_error = Some(err.code());
        }
    }

    impl ListenEvents for Trace {}

    impl WriteEvents for Trace {
        fn on_write_error(&mut self, err: &SockError) {
            self.calls.push("write_error");
            self.last_error = Some(err.code());
        }
    }

    #[test]
    fn connect_to_closed_port_is_connect_error() {
        let endpoint = Endpoint::local(closed_port());
        let mut sock = Sock::with_events(endpoint, Trace::default()).with_config(quick_config());

        let err = sock.connect().unwrap_err();
        assert_eq!(err.code(), "ConnectError");
        assert_eq!(sock.status().code(), "ConnectError");
        assert!(!sock.is_connected());
        assert_eq!(sock.events().calls, ["before", "after", "error"]);
        assert_eq!(sock.events().last_error, Some("ConnectError"));
    }

    #[test]
    fn connect_reuses_registered_descriptor() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut sock = Sock::with_events(Endpoint::local(port), Trace::default());
        let first = sock.connect().expect("first connect should succeed");
        let second = sock.connect().expect("second connect should reuse");

        assert_eq!(first, second);
        assert_eq!(sock.registry().len(), 1);
        assert_eq!(sock.events().calls, ["before", "success", "after"]);
        assert!(sock.is_ok());

        assert_eq!(sock.disconnect(), 1);
        assert!(!sock.is_connected());
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn connect_to_saturated_backlog_times_out() {
        use std::os::fd::AsRawFd;

        // A listener with backlog 0 that never accepts: once its queue is
        // full, further SYNs are dropped and the connect stays in progress.
        let fd = sys::socket(libc::AF_INET, libc::SOCK_STREAM).unwrap();
        sys::bind(fd.as_raw_fd(), &"127.0.0.1:0".parse().unwrap()).unwrap();
        sys::listen(fd.as_raw_fd(), 0).unwrap();
        let port = sys::local_port(fd.as_raw_fd()).unwrap();

        let mut fillers = Vec::new();
        for _ in 0..4 {
            let addr = format!("127.0.0.1:{port}").parse().unwrap();
            if let Ok(stream) = TcpStream::connect_timeout(&addr, Duration::from_millis(100)) {
                fillers.push(stream);
            }
        }

        let config = SockConfig {
            connect_timeout: Duration::from_millis(200),
            ..SockConfig::default()
        };
        let mut sock = Sock::new(Endpoint::local(port)).with_config(config);
        let err = sock.connect().unwrap_err();
        assert_eq!(err.code(), "ConnectionTimeout");
        drop(fillers);
    }

    #[test]
    fn write_requires_connection() {
        let mut sock = Sock::new(Endpoint::local(closed_port()));
        let err = sock.write(b"hello", None).unwrap_err();
        assert!(matches!(err, SockError::NotConnectedForWrite(_)));
        assert_eq!(sock.status().code(), "SocketIsNotConnectedForWrite");
    }

    #[test]
    fn write_to_stalled_peer_reports_partial_send() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let config = SockConfig {
            write_timeout: Duration::from_millis(200),
            ..quick_config()
        };
        let mut sock = Sock::with_events(Endpoint::local(port), Trace::default()).with_config(config);
        sock.connect().unwrap();
        // Accepted but never read, so the kernel buffers fill up.
        let (_peer, _) = listener.accept().unwrap();

        let payload = vec![0x5a_u8; 64 * 1024 * 1024];
        let started = Instant::now();
        let err = sock.write(&payload, None).unwrap_err();

        match &err {
            SockError::Write {
                requested, sent, ..
            } => {
                assert_eq!(*requested, payload.len());
                assert!(*sent > 0, "some bytes should fit in the socket buffers");
                assert!(*sent < *requested);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(sock.status().code(), "SocketWriteError");
        assert_eq!(sock.events().calls.last(), Some(&"write_error"));
        assert_eq!(sock.events().last_error, Some("SocketWriteError"));
    }

    #[test]
    fn write_then_client_read_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            stream.read_exact(&mut buf).unwrap();
            assert_eq!(&buf, b"ping");
            stream.write_all(b"pong").unwrap();
            // Hold the connection open until the client has read.
            let _ = stream.read(&mut buf);
        });

        let mut sock = Sock::with_events(Endpoint::local(port), Trace::default())
            .with_config(quick_config());
        sock.connect().unwrap();
        assert_eq!(sock.write(b"ping", None).unwrap(), 4);

        let summary = sock.client_read().expect("answer should arrive");
        assert_eq!(summary.bytes, 4);
        assert!(summary.accepted);
        assert_eq!(sock.events().received, b"pong");

        sock.disconnect();
        server.join().unwrap();
    }

    #[test]
    fn client_read_times_out_without_answer() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut sock = Sock::new(Endpoint::local(port)).with_config(quick_config());
        sock.connect().unwrap();
        let (_stream, _) = listener.accept().unwrap();

        let err = sock.client_read().unwrap_err();
        assert_eq!(err.code(), "ConnectionTimeout");
    }

    #[test]
    fn stalled_stream_hits_read_waiting_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut sock = Sock::with_events(
            Endpoint::local(port),
            Trace {
                keep_reading: true,
                ..Trace::default()
            },
        )
        .with_config(quick_config());
        sock.connect().unwrap();

        let (mut stream, _) = listener.accept().unwrap();
        stream.write_all(b"partial").unwrap();

        let err = sock.client_read().unwrap_err();
        match err {
            SockError::ReadWaiting {
                packet_size,
                limit,
                waited,
            } => {
                assert_eq!(packet_size, 1024);
                assert_eq!(limit, Duration::from_millis(100));
                assert!(waited >= limit);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(sock.events().last_error, Some("socket_read_waiting_error"));
    }

    /// Line protocol: read until `\n`, answer with the upper-cased line.
    struct LineEcho {
        ready: mpsc::Sender<u16>,
    }

    impl ConnectEvents for LineEcho {}
    impl WriteEvents for LineEcho {}

    impl ListenEvents for LineEcho {
        fn on_listen_ready(&mut self, port: u16) {
            let _ = self.ready.send(port);
        }
    }

    impl ReadEvents for LineEcho {
        fn on_read(&mut self, buffer: &ByteAccumulator) -> bool {
            !buffer.as_slice().ends_with(b"\n")
        }

        fn on_read_after(&mut self, buffer: &ByteAccumulator, peer: &mut Responder<'_>) -> bool {
            if buffer.is_empty() {
                return false;
            }
            let answer = buffer.as_slice().to_ascii_uppercase();
            peer.write(&answer).is_ok()
        }
    }

    #[test]
    fn reactor_serves_interleaved_partial_writes() {
        let (tx, rx) = mpsc::channel();
        let mut sock = Sock::with_events(Endpoint::local(0), LineEcho { ready: tx })
            .with_config(quick_config());
        let stop = sock.stop_handle();
        let registry = Arc::clone(sock.registry());

        let server = thread::spawn(move || sock.listen());
        let port = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("listener should report ready");

        let mut clients: Vec<TcpStream> = (0..4)
            .map(|_| {
                let stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
                stream.set_nodelay(true).unwrap();
                stream
            })
            .collect();

        for piece in ["hel", "lo-", "wor", "ld\n"] {
            for (index, client) in clients.iter_mut().enumerate() {
                let text = if piece.ends_with('\n') {
                    format!("{}{index}\n", &piece[..piece.len() - 1])
                } else {
                    piece.to_string()
                };
                client.write_all(text.as_bytes()).unwrap();
            }
            thread::sleep(Duration::from_millis(15));
        }

        for (index, client) in clients.iter_mut().enumerate() {
            client
                .set_read_timeout(Some(Duration::from_secs(5)))
                .unwrap();
            let expected = format!("HELLO-WORLD{index}\n");
            let mut answer = vec![0u8; expected.len()];
            client.read_exact(&mut answer).unwrap();
            assert_eq!(answer, expected.as_bytes());
        }

        let started = Instant::now();
        stop.stop();
        server
            .join()
            .expect("listener thread should not panic")
            .expect("listener should exit cleanly");
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(registry.is_empty());
    }

    /// Line protocol that holds the reactor on `hold\n` and stops it on the
    /// first peer that hangs up.
    struct HangupGate {
        ready: mpsc::Sender<u16>,
        stop: Option<StopHandle>,
        seen: Vec<String>,
    }

    impl ConnectEvents for HangupGate {}
    impl WriteEvents for HangupGate {}

    impl ListenEvents for HangupGate {
        fn on_listen_ready(&mut self, port: u16) {
            let _ = self.ready.send(port);
        }
    }

    impl ReadEvents for HangupGate {
        fn on_read(&mut self, buffer: &ByteAccumulator) -> bool {
            !buffer.as_slice().ends_with(b"\n")
        }

        fn on_read_after(&mut self, buffer: &ByteAccumulator, peer: &mut Responder<'_>) -> bool {
            let line = String::from_utf8_lossy(buffer.as_slice()).into_owned();
            self.seen.push(line.clone());
            if buffer.is_empty() {
                if let Some(stop) = &self.stop {
                    stop.stop();
                }
                return false;
            }
            if line == "hold\n" {
                thread::sleep(Duration::from_millis(300));
            }
            peer.write(line.to_ascii_uppercase().as_bytes()).is_ok()
        }
    }

    fn exchange_line(stream: &mut TcpStream, line: &str) -> String {
        stream.write_all(line.as_bytes()).unwrap();
        let mut answer = vec![0u8; line.len()];
        stream.read_exact(&mut answer).unwrap();
        String::from_utf8(answer).unwrap()
    }

    #[test]
    fn hangup_does_not_skip_next_ready_connection() {
        let (tx, rx) = mpsc::channel();
        let gate = HangupGate {
            ready: tx,
            stop: None,
            seen: Vec::new(),
        };
        let mut sock = Sock::with_events(Endpoint::local(0), gate).with_config(quick_config());
        let stop = sock.stop_handle();
        sock.events_mut().stop = Some(stop);

        let server = thread::spawn(move || {
            let result = sock.listen();
            (result, sock.into_events().seen)
        });
        let port = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("listener should report ready");

        // Accept order puts `first` ahead of `second` in the reactor's set.
        let mut first = TcpStream::connect(("127.0.0.1", port)).unwrap();
        first.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(exchange_line(&mut first, "a\n"), "A\n");
        let mut second = TcpStream::connect(("127.0.0.1", port)).unwrap();
        second.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(exchange_line(&mut second, "b\n"), "B\n");

        // While the reactor sleeps on `hold`, `first` hangs up and `second`
        // sends a line, so both are ready on the next tick.
        first.write_all(b"hold\n").unwrap();
        first.shutdown(std::net::Shutdown::Write).unwrap();
        thread::sleep(Duration::from_millis(100));
        second.write_all(b"go\n").unwrap();

        let mut answer = [0u8; 3];
        second
            .read_exact(&mut answer)
            .expect("second connection should be answered in the hangup tick");
        assert_eq!(&answer, b"GO\n");

        let (result, seen) = server.join().expect("listener thread should not panic");
        result.expect("listener should exit cleanly");
        assert_eq!(seen, ["a\n", "b\n", "hold\n", "", "go\n"]);
    }

    #[test]
    fn only_persistent_accept_failures_are_reported() {
        let exhausted = std::io::Error::from_raw_os_error(libc::EMFILE);
        assert!(report_accept_failure("127.0.0.1:1", &exhausted));

        let idle = std::io::Error::from(ErrorKind::WouldBlock);
        assert!(!report_accept_failure("127.0.0.1:1", &idle));
        let interrupted = std::io::Error::from(ErrorKind::Interrupted);
        assert!(!report_accept_failure("127.0.0.1:1", &interrupted));
    }

    #[test]
    fn listen_on_taken_port_is_bind_error() {
        let taken = TcpListener::bind("0.0.0.0:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let mut sock = Sock::new(Endpoint::local(port)).with_config(quick_config());
        let err = sock.listen().unwrap_err();
        assert_eq!(err.code(), "BindSocketError");
        assert_eq!(sock.status().code(), "BindSocketError");
        assert!(sock.registry().is_empty());
    }
}
