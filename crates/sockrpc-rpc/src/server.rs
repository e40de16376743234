use std::sync::Arc;

use sockrpc_frame::{decode_params, frame_params, inspect, FrameConfig, FrameError};
use sockrpc_params::ParamList;
use sockrpc_transport::{
    ByteAccumulator, ConnectEvents, Endpoint, HandleRegistry, ListenEvents, ReadEvents, Responder,
    Sock, SockConfig, SockError, Status, StopHandle, WriteEvents,
};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::handler::{DefaultHandler, RpcHandler};

type ListeningHook = Box<dyn FnMut(u16) + Send>;

/// Bridges socket events to the handler.
struct ServerEvents<H> {
    handler: H,
    max_payload: usize,
    on_listening: Option<ListeningHook>,
}

impl<H: RpcHandler> ServerEvents<H> {
    fn answer(&mut self, arguments: &ParamList, peer: &mut Responder<'_>) -> bool {
        let mut answer = ParamList::new();
        self.handler.handle(arguments, &mut answer);

        let frame = match frame_params(&answer) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(remote = peer.remote(), code = err.code(), error = %err, "failed to encode rpc answer");
                return true;
            }
        };
        match peer.write(&frame) {
            Ok(sent) => {
                debug!(remote = peer.remote(), sent, "rpc answer sent");
                true
            }
            Err(err) => {
                warn!(remote = peer.remote(), code = err.code(), error = %err, "failed to send rpc answer");
                false
            }
        }
    }
}

impl<H> ConnectEvents for ServerEvents<H> {}
impl<H> WriteEvents for ServerEvents<H> {}

impl<H: RpcHandler> ReadEvents for ServerEvents<H> {
    fn on_read_before(&mut self, remote: &str) -> bool {
        let accepted = self.handler.accept_peer(remote);
        if !accepted {
            debug!(remote, "peer rejected before read");
        }
        accepted
    }

    fn on_read(&mut self, buffer: &ByteAccumulator) -> bool {
        inspect(buffer.as_slice(), self.max_payload).wants_more()
    }

    fn on_read_after(&mut self, buffer: &ByteAccumulator, peer: &mut Responder<'_>) -> bool {
        if buffer.is_empty() {
            debug!(remote = peer.remote(), "peer closed connection");
            return false;
        }

        match decode_params(buffer.as_slice(), self.max_payload) {
            Ok(arguments) => self.answer(&arguments, peer),
            Err(err @ FrameError::Incomplete { .. }) => {
                warn!(remote = peer.remote(), code = err.code(), error = %err, "peer closed mid-frame");
                false
            }
            Err(err) => {
                warn!(
                    remote = peer.remote(),
                    code = err.code(),
                    size = buffer.len(),
                    error = %err,
                    "invalid rpc frame dropped"
                );
                true
            }
        }
    }

    fn on_read_error(&mut self, err: &SockError, buffer: &ByteAccumulator) {
        warn!(code = err.code(), message = %err, received = buffer.len(), "rpc server read failed");
    }
}

impl<H> ListenEvents for ServerEvents<H> {
    fn on_listen_ready(&mut self, port: u16) {
        if let Some(hook) = self.on_listening.as_mut() {
            hook(port);
        }
    }

    fn on_listen_after(&mut self, port: u16) {
        debug!(port, "rpc server released its descriptors");
    }
}

/// Stops a running [`RpcServer`] from another thread.
#[derive(Debug, Clone)]
pub struct ShutdownHandle(StopHandle);

impl ShutdownHandle {
    pub fn down(&self) {
        self.0.stop();
    }
}

/// RPC server on `127.0.0.1:<port>`, accepting on every local interface.
///
/// [`up`](Self::up) blocks in the socket reactor. Each readable connection
/// delivers one request per tick; the handler's answer is framed and written
/// back on the same connection.
pub struct RpcServer<H = DefaultHandler> {
    sock: Sock<ServerEvents<H>>,
}

impl RpcServer {
    /// Server answering with [`DefaultHandler`].
    pub fn new(port: u16) -> Self {
        Self::with_handler(port, DefaultHandler)
    }
}

impl<H: RpcHandler> RpcServer<H> {
    pub fn with_handler(port: u16, handler: H) -> Self {
        let events = ServerEvents {
            handler,
            max_payload: FrameConfig::default().max_payload_size,
            on_listening: None,
        };
        Self {
            sock: Sock::with_events(Endpoint::local(port), events),
        }
    }

    pub fn with_config(mut self, config: SockConfig) -> Self {
        self.sock = self.sock.with_config(config);
        self
    }

    pub fn with_frame_config(mut self, config: FrameConfig) -> Self {
        self.sock.events_mut().max_payload = config.max_payload_size;
        self
    }

    pub fn with_registry(mut self, registry: Arc<HandleRegistry>) -> Self {
        self.sock = self.sock.with_registry(registry);
        self
    }

    /// Called with the bound port once the server accepts connections.
    pub fn on_listening(mut self, hook: impl FnMut(u16) + Send + 'static) -> Self {
        self.sock.events_mut().on_listening = Some(Box::new(hook));
        self
    }

    /// Configured port; `0` until bound means an ephemeral one.
    pub fn port(&self) -> u16 {
        self.sock.endpoint().port()
    }

    pub fn handler(&self) -> &H {
        &self.sock.events().handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.sock.events_mut().handler
    }

    pub fn into_handler(self) -> H {
        self.sock.into_events().handler
    }

    pub fn registry(&self) -> &Arc<HandleRegistry> {
        self.sock.registry()
    }

    pub fn status(&self) -> &Status {
        self.sock.status()
    }

    /// Listen and serve until [`down`](Self::down) is requested.
    pub fn up(&mut self) -> Result<()> {
        let port = self.port();
        info!(port, "rpc server up");
        self.sock.listen().map_err(|err| {
            warn!(port, code = err.code(), message = %err, "rpc server error");
            err.into()
        })
    }

    /// Request the serve loop to exit after its current tick.
    pub fn down(&self) {
        debug!(port = self.port(), "rpc server going down");
        self.sock.stop_listen();
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.sock.stop_handle())
    }
}
