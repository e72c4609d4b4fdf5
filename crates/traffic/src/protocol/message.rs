use std::fmt;

use bytes::{Buf, Bytes};

use crate::protocol::{RequestHead, ResponseHead};

/// A complete traffic header, either a request line or a response head.
///
/// The set of message kinds is closed, so this is a plain enum matched exhaustively
/// by the codec and both state machines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMessage {
    Request(RequestHead),
    Response(ResponseHead),
}

impl HttpMessage {
    pub fn into_request(self) -> Option<RequestHead> {
        match self {
            HttpMessage::Request(request) => Some(request),
            HttpMessage::Response(_) => None,
        }
    }

    pub fn into_response(self) -> Option<ResponseHead> {
        match self {
            HttpMessage::Request(_) => None,
            HttpMessage::Response(response) => Some(response),
        }
    }
}

impl From<RequestHead> for HttpMessage {
    fn from(request: RequestHead) -> Self {
        Self::Request(request)
    }
}

impl From<ResponseHead> for HttpMessage {
    fn from(response: ResponseHead) -> Self {
        Self::Response(response)
    }
}

impl fmt::Display for HttpMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMessage::Request(request) => fmt::Display::fmt(request, f),
            HttpMessage::Response(response) => fmt::Display::fmt(response, f),
        }
    }
}

/// Represents a framed item on the wire: either a header or a piece of its payload.
///
/// The generic parameter `T` is the header type, while `Data` is the payload chunk
/// type (defaults to `Bytes`).
#[derive(Debug)]
pub enum Message<T, Data: Buf = Bytes> {
    /// Contains the header information of type `T`
    Header(T),
    /// Contains a chunk of payload data or EOF marker
    Payload(PayloadItem<Data>),
}

/// Represents an item in a payload stream.
///
/// The payload decoder produces chunks until the declared content length is
/// reached and then signals `Eof`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// A chunk of payload data
    Chunk(Data),
    /// Marks the end of the payload stream
    Eof,
}

impl<T> Message<T> {
    /// Returns true if this message contains payload data
    #[inline]
    pub fn is_payload(&self) -> bool {
        matches!(self, Message::Payload(_))
    }

    /// Returns true if this message contains header information
    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }
}

impl<T> From<Bytes> for Message<T> {
    fn from(bytes: Bytes) -> Self {
        Self::Payload(PayloadItem::Chunk(bytes))
    }
}

impl<D: Buf> PayloadItem<D> {
    /// Returns true if this item represents the end of the payload stream
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    /// Returns true if this item contains chunk data
    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }
}

impl PayloadItem {
    /// Returns a reference to the contained bytes if this is a Chunk
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}
