//! Response decoder module
//!
//! Decodes traffic responses in two phases: first the NUL-terminated head, then
//! exactly `ContentLength` payload bytes.
//!
//! # Example
//!
//! ```
//! use micro_traffic::codec::ResponseDecoder;
//! use micro_traffic::protocol::Message;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = ResponseDecoder::new();
//! let mut buffer = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContentLength: 2\r\n\r\n\0ab"[..]);
//!
//! let header = decoder.decode(&mut buffer).unwrap();
//! assert!(matches!(header, Some(Message::Header(_))));
//! let chunk = decoder.decode(&mut buffer).unwrap();
//! assert!(matches!(chunk, Some(Message::Payload(_))));
//! ```

use crate::codec::body::LengthDecoder;
use crate::codec::header::HeaderDecoder;
use crate::protocol::{HttpMessage, Message, ParseError, PayloadItem, ResponseHead};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// A decoder for traffic responses that handles both the head and its payload
///
/// # State Machine
///
/// The decoder maintains its state through the `payload_decoder` field:
/// - `None`: Currently parsing a response head
/// - `Some(LengthDecoder)`: Currently consuming payload bytes
#[derive(Debug, Default)]
pub struct ResponseDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<LengthDecoder>,
}

impl ResponseDecoder {
    /// Creates a new `ResponseDecoder` instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload bytes still expected for the current response, `None` while waiting for a head
    pub fn remaining(&self) -> Option<u64> {
        self.payload_decoder.as_ref().map(LengthDecoder::remaining)
    }

    /// Drops any partially decoded response
    pub fn reset(&mut self) {
        self.payload_decoder = None;
    }
}

impl Decoder for ResponseDecoder {
    type Item = Message<ResponseHead>;
    type Error = ParseError;

    /// Attempts to decode the next response item from the provided buffer
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Message::Header(_)))`: Successfully decoded a response head
    /// - `Ok(Some(Message::Payload(_)))`: Successfully decoded a payload chunk or reached EOF
    /// - `Ok(None)`: Need more data to proceed
    /// - `Err(_)`: Encountered a parsing error, or the peer sent a request
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // parse payload if have payload_decoder
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof) => {
                    // no need payload decoder in this response now
                    self.payload_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };

            return Ok(message);
        }

        // parse response head
        let message = match self.header_decoder.decode(src)? {
            Some(HttpMessage::Response(head)) => {
                let content_length = head.content_length()?;
                self.payload_decoder = Some(LengthDecoder::new(content_length));
                Some(Message::Header(head))
            }
            Some(HttpMessage::Request(_)) => return Err(ParseError::unexpected_message("response")),
            None => None,
        };

        Ok(message)
    }
}
