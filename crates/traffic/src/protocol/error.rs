use std::io;
use thiserror::Error;

use crate::client::ClientState;
use crate::transport::SocketType;

/// Top-level error of the tokio connection adapters.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("session error: {source}")]
    SessionError {
        #[from]
        source: SessionError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("message is not terminated: no NUL byte within {scanned} bytes")]
    Unterminated { scanned: usize },

    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("missing delimiter {delimiter:?} in {context}")]
    MissingDelimiter { delimiter: &'static str, context: &'static str },

    #[error("message is not valid utf-8")]
    InvalidUtf8,

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid header field: {reason}")]
    InvalidField { reason: String },

    #[error("invalid content-length field: {reason}")]
    InvalidContentLength { reason: String },

    #[error("unexpected message, expect a {expected}")]
    UnexpectedMessage { expected: &'static str },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn unterminated(scanned: usize) -> Self {
        Self::Unterminated { scanned }
    }

    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn missing_delimiter(delimiter: &'static str, context: &'static str) -> Self {
        Self::MissingDelimiter { delimiter, context }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_field<S: ToString>(str: S) -> Self {
        Self::InvalidField { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn unexpected_message(expected: &'static str) -> Self {
        Self::UnexpectedMessage { expected }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Errors raised by the client and server exchange state machines.
///
/// `Desync` is kept apart from the ordinary "more data expected" path: it means the
/// peer sent more bytes than the response it framed, and the session cannot recover.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("parse error: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("send error: {source}")]
    Send {
        #[from]
        source: SendError,
    },

    #[error("incompatible transport {socket_type:?}, a stream or seqpacket transport (tcp) is required")]
    IncompatibleTransport { socket_type: SocketType },

    #[error("connection to {peer} was rejected")]
    ConnectionRejected { peer: String },

    #[error("framing desynchronized: received {received} bytes for a declared content length of {declared}")]
    Desync { received: u64, declared: u64 },

    #[error("unexpected response status {status}")]
    UnexpectedStatus { status: String },

    #[error("unexpected data of {len} bytes in state {state:?}")]
    UnexpectedData { state: ClientState, len: usize },

    #[error("event {event} is invalid in state {state:?}")]
    InvalidState { state: ClientState, event: &'static str },
}

impl SessionError {
    pub fn connection_rejected<S: ToString>(peer: S) -> Self {
        Self::ConnectionRejected { peer: peer.to_string() }
    }

    pub fn desync(received: u64, declared: u64) -> Self {
        Self::Desync { received, declared }
    }

    pub fn invalid_state(state: ClientState, event: &'static str) -> Self {
        Self::InvalidState { state, event }
    }
}
