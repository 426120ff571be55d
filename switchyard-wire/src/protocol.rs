//! Three-phase wire protocol: head, body frames, response frames.
//!
//! A connection driver sends one [`ConnectionHead`], then zero or more
//! [`BodyFrame`]s where `more` marks continuation, and receives one
//! [`ResponseFrame::Start`] followed by body frames ending with
//! `more == false`. The engine never talks to sockets directly; it speaks
//! to whatever implements [`WireReceiver`] and [`WireSender`].

use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode};

/// Errors crossing the wire boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum WireError {
    /// The peer went away before the message could pass.
    #[error("wire channel closed")]
    ChannelClosed,

    /// The peer violated the three-phase protocol.
    #[error("protocol violation: {0}")]
    Protocol(String),
}

/// Phase-1 message: everything known about a request before its body.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ConnectionHead {
    pub method: Method,
    /// Request path, already percent-decoded by the driver.
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: String,
    pub headers: HeaderMap,
    /// Transport-reported peer address, when the driver knows one.
    pub client: Option<SocketAddr>,
}

impl ConnectionHead {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: String::new(),
            headers: HeaderMap::new(),
            client: None,
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    #[must_use]
    pub fn with_client(mut self, client: SocketAddr) -> Self {
        self.client = Some(client);
        self
    }
}

/// Phase-2 message: one chunk of request body. `more == true` promises
/// another frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyFrame {
    pub data: Bytes,
    pub more: bool,
}

impl BodyFrame {
    /// A continuation frame.
    #[must_use]
    pub fn partial(data: impl Into<Bytes>) -> Self {
        Self { data: data.into(), more: true }
    }

    /// The final frame of a body.
    #[must_use]
    pub fn last(data: impl Into<Bytes>) -> Self {
        Self { data: data.into(), more: false }
    }

    /// The final frame of an empty body.
    #[must_use]
    pub fn end() -> Self {
        Self { data: Bytes::new(), more: false }
    }
}

/// Phase-3 messages: a response head, then its body frames.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ResponseFrame {
    Start { status: StatusCode, headers: HeaderMap },
    Body { data: Bytes, more: bool },
}

/// Receiving side of a request body.
///
/// Implementations must be `Send`; a request context owns its receiver
/// for the lifetime of one request.
#[async_trait]
pub trait WireReceiver: Send {
    /// Receives the next body frame.
    ///
    /// # Errors
    /// Returns [`WireError::ChannelClosed`] when the driver went away
    /// before finishing the body.
    async fn next_frame(&mut self) -> Result<BodyFrame, WireError>;
}

/// Sending side of a response.
#[async_trait]
pub trait WireSender: Send {
    /// Sends one response frame.
    ///
    /// # Errors
    /// Returns [`WireError::ChannelClosed`] when the driver is no longer
    /// listening.
    async fn send(&mut self, frame: ResponseFrame) -> Result<(), WireError>;
}

#[async_trait]
impl WireReceiver for tokio::sync::mpsc::Receiver<BodyFrame> {
    async fn next_frame(&mut self) -> Result<BodyFrame, WireError> {
        self.recv().await.ok_or(WireError::ChannelClosed)
    }
}

#[async_trait]
impl WireSender for tokio::sync::mpsc::Sender<ResponseFrame> {
    async fn send(&mut self, frame: ResponseFrame) -> Result<(), WireError> {
        tokio::sync::mpsc::Sender::send(self, frame)
            .await
            .map_err(|_| WireError::ChannelClosed)
    }
}
