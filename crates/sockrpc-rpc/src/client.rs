use std::fmt;
use std::os::fd::RawFd;
use std::sync::Arc;

use sockrpc_frame::{decode_params, frame_params, inspect, FrameConfig, FrameError};
use sockrpc_params::ParamList;
use sockrpc_transport::{
    ByteAccumulator, ConnectEvents, Endpoint, HandleRegistry, ListenEvents, ReadEvents, Responder,
    Sock, SockConfig, Status, WriteEvents,
};
use tracing::{debug, warn};

use crate::codes;
use crate::container::Container;
use crate::error::{Result, RpcError};

/// Method selector written to the request's `method` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Name(String),
    Id(i64),
}

impl From<&str> for Method {
    fn from(name: &str) -> Self {
        Method::Name(name.to_owned())
    }
}

impl From<String> for Method {
    fn from(name: String) -> Self {
        Method::Name(name)
    }
}

impl From<i64> for Method {
    fn from(id: i64) -> Self {
        Method::Id(id)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Name(name) => f.write_str(name),
            Method::Id(id) => write!(f, "{id}"),
        }
    }
}

type CallHook<'a> = Box<dyn FnMut(&RpcClient<'a>) + Send + 'a>;

/// Captures the answer frame while the socket reads.
#[derive(Debug, Default)]
struct ClientEvents {
    max_payload: usize,
    answer: Option<std::result::Result<ParamList, FrameError>>,
}

impl ConnectEvents for ClientEvents {
    fn on_connect_success(&mut self, endpoint: &Endpoint, fd: RawFd) {
        debug!(endpoint = %endpoint, fd, "rpc client connected");
    }
}

impl ReadEvents for ClientEvents {
    fn on_read(&mut self, buffer: &ByteAccumulator) -> bool {
        inspect(buffer.as_slice(), self.max_payload).wants_more()
    }

    fn on_read_after(&mut self, buffer: &ByteAccumulator, _peer: &mut Responder<'_>) -> bool {
        if !buffer.is_empty() {
            self.answer = Some(decode_params(buffer.as_slice(), self.max_payload));
        }
        true
    }
}

impl ListenEvents for ClientEvents {}
impl WriteEvents for ClientEvents {}

/// Synchronous RPC client: one framed request, one framed answer per call.
///
/// The connection is opened on the first call and kept for the next ones.
/// A transport or decode failure disconnects and is remembered: further calls
/// return [`RpcError::Halted`] until [`reset`](Self::reset). Application
/// errors (`result.code` other than `"ok"`) and request encoding errors leave
/// the client usable.
pub struct RpcClient<'a> {
    sock: Sock<ClientEvents>,
    status: Status,
    request: Container<'a>,
    answer: Container<'a>,
    before_call: Option<CallHook<'a>>,
    after_call: Option<CallHook<'a>>,
}

impl<'a> RpcClient<'a> {
    pub fn new(endpoint: Endpoint) -> Self {
        let events = ClientEvents {
            max_payload: FrameConfig::default().max_payload_size,
            answer: None,
        };
        Self {
            sock: Sock::with_events(endpoint, events),
            status: Status::Ok,
            request: Container::default(),
            answer: Container::default(),
            before_call: None,
            after_call: None,
        }
    }

    /// Client for a TCP server at `ip:port`.
    pub fn tcp(ip: impl Into<String>, port: u16) -> Self {
        Self::new(Endpoint::tcp(ip, port))
    }

    pub fn with_config(mut self, config: SockConfig) -> Self {
        self.sock = self.sock.with_config(config);
        self
    }

    pub fn with_frame_config(mut self, config: FrameConfig) -> Self {
        self.sock.events_mut().max_payload = config.max_payload_size;
        self
    }

    /// Share connections with other clients of the same registry.
    pub fn with_registry(mut self, registry: Arc<HandleRegistry>) -> Self {
        self.sock = self.sock.with_registry(registry);
        self
    }

    /// Run `hook` before every call that is not halted.
    pub fn on_call_before(mut self, hook: impl FnMut(&RpcClient<'a>) + Send + 'a) -> Self {
        self.before_call = Some(Box::new(hook));
        self
    }

    /// Run `hook` after every call that is not halted, whatever its outcome.
    pub fn on_call_after(mut self, hook: impl FnMut(&RpcClient<'a>) + Send + 'a) -> Self {
        self.after_call = Some(Box::new(hook));
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.sock.endpoint()
    }

    pub fn request(&self) -> &ParamList {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut ParamList {
        &mut self.request
    }

    pub fn answer(&self) -> &ParamList {
        &self.answer
    }

    /// Use a caller-owned request list; an owned one is dropped.
    pub fn set_request(&mut self, request: &'a mut ParamList) -> &mut Self {
        self.request = Container::Borrowed(request);
        self
    }

    /// Receive answers into a caller-owned list; an owned one is dropped.
    pub fn set_answer(&mut self, answer: &'a mut ParamList) -> &mut Self {
        self.answer = Container::Borrowed(answer);
        self
    }

    /// Go back to an empty request list owned by the client.
    pub fn own_request(&mut self) -> &mut Self {
        self.request = Container::default();
        self
    }

    pub fn own_answer(&mut self) -> &mut Self {
        self.answer = Container::default();
        self
    }

    pub fn request_is_owned(&self) -> bool {
        self.request.is_owned()
    }

    pub fn answer_is_owned(&self) -> bool {
        self.answer.is_owned()
    }

    /// Failure recorded by the last transport error, or `Ok`.
    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// Clear a recorded failure so calls run again.
    pub fn reset(&mut self) -> &mut Self {
        self.status = Status::Ok;
        self.sock.reset();
        self
    }

    pub fn is_connected(&self) -> bool {
        self.sock.is_connected()
    }

    pub fn disconnect(&mut self) {
        self.sock.disconnect();
    }

    /// Send the current request and replace the answer with the reply.
    pub fn call(&mut self) -> Result<()> {
        if let Status::Failed { code, message } = &self.status {
            return Err(RpcError::Halted {
                code: code.clone(),
                message: message.clone(),
            });
        }

        self.fire_before();
        let result = self.exchange();
        if let Err(err) = &result {
            if err.is_transport() {
                self.sock.disconnect();
                self.status = Status::failed(err.code(), err.to_string());
            }
        }
        self.fire_after();
        result
    }

    /// Set `method` on the request, call, and check `result.code`.
    pub fn call_method(&mut self, method: impl Into<Method>) -> Result<()> {
        let method = method.into();
        match &method {
            Method::Name(name) => self.request.set_string(codes::METHOD, name.as_str())?,
            Method::Id(id) => self.request.set_int(codes::METHOD, *id)?,
        }

        if let Err(err) = self.call() {
            warn!(method = %method, code = err.code(), message = %err, "rpc call failed");
            return Err(err);
        }

        let code = match self.answer.get_string(codes::RESULT_CODE) {
            code if code.is_empty() => codes::UNKNOWN_RPC_CLIENT_ANSWER_CODE.to_string(),
            code => code,
        };
        if code == codes::OK {
            return Ok(());
        }

        debug!(method = %method, code = %code, "rpc call returned application error");
        Err(RpcError::Application {
            code,
            message: self.answer.get_string(codes::RESULT_MESSAGE),
        })
    }

    fn exchange(&mut self) -> Result<()> {
        let frame = frame_params(&self.request)?;

        self.sock.connect()?;
        self.sock.write(&frame, None)?;

        self.sock.events_mut().answer = None;
        self.sock.client_read()?;

        match self.sock.events_mut().answer.take() {
            None => Err(RpcError::NoAnswer),
            Some(Ok(answer)) => {
                self.answer.clear();
                *self.answer = answer;
                Ok(())
            }
            Some(Err(err)) => {
                warn!(
                    endpoint = %self.sock.endpoint(),
                    code = err.code(),
                    error = %err,
                    "rpc server sent an invalid answer"
                );
                Err(err.into())
            }
        }
    }

    fn fire_before(&mut self) {
        if let Some(mut hook) = self.before_call.take() {
            hook(self);
            self.before_call = Some(hook);
        }
    }

    fn fire_after(&mut self) {
        if let Some(mut hook) = self.after_call.take() {
            hook(self);
            self.after_call = Some(hook);
        }
    }
}

impl fmt::Debug for RpcClient<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcClient")
            .field("endpoint", self.sock.endpoint())
            .field("status", &self.status)
            .field("request", &self.request)
            .field("answer", &self.answer)
            .finish_non_exhaustive()
    }
}
