//! Request decoder module
//!
//! Requests never carry a payload, so decoding a request is decoding its head.

use crate::codec::header::HeaderDecoder;
use crate::protocol::{HttpMessage, ParseError, RequestHead};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// A decoder for traffic requests
#[derive(Debug, Default)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
}

impl RequestDecoder {
    /// Creates a new `RequestDecoder` instance
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for RequestDecoder {
    type Item = RequestHead;
    type Error = ParseError;

    /// # Returns
    ///
    /// - `Ok(Some(request))`: Successfully decoded a request line
    /// - `Ok(None)`: Need more data to proceed
    /// - `Err(_)`: Encountered a parsing error, or the peer sent a response
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.header_decoder.decode(src)? {
            Some(HttpMessage::Request(request)) => Ok(Some(request)),
            Some(HttpMessage::Response(_)) => Err(ParseError::unexpected_message("request")),
            None => Ok(None),
        }
    }
}
