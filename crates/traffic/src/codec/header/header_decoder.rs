//! Header decoder implementation for parsing traffic messages
//!
//! Messages are framed by a trailing NUL byte instead of a length prefix, so the
//! decoder first scans for the terminator and only then splits the text into its
//! start line and fields.
//!
//! # Classification
//!
//! The first token of the start line decides the message kind: `GET` makes it a
//! request, anything else is read as the protocol version of a response.
//!
//! # Field lines
//!
//! Each field line is split on its first `": "`. Values may not contain `:`, so a
//! line such as `Host: 127.0.0.1:8080` is rejected instead of being silently cut.
//!
//! # Limits
//!
//! - Maximum header size: 8KB, including the terminator

use bytes::BytesMut;
use http::Method;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{HttpMessage, ParseError, RequestHead, ResponseHead};

/// Maximum size in bytes allowed for a whole header, terminator included
const MAX_HEADER_BYTES: usize = 8 * 1024;

const TERMINATOR: u8 = b'\0';

const CRLF: &str = "\r\n";

/// Parses one message from the start of `src`.
///
/// Returns the message and the number of bytes it occupied, terminator included.
///
/// # Errors
///
/// Returns `ParseError` if:
/// - no NUL terminator is found within `src`
/// - the text is not valid UTF-8
/// - a space, `": "` or CRLF delimiter is missing where the format requires one
/// - a start-line token is empty or holds a space, line break or NUL
pub fn deserialize(src: &[u8]) -> Result<(HttpMessage, usize), ParseError> {
    let end = find_terminator(src).ok_or_else(|| ParseError::unterminated(src.len()))?;
    let text = std::str::from_utf8(&src[..end]).map_err(|_| ParseError::InvalidUtf8)?;
    let message = parse_text(text)?;
    Ok((message, end + 1))
}

#[inline]
fn find_terminator(src: &[u8]) -> Option<usize> {
    src.iter().position(|b| *b == TERMINATOR)
}

fn parse_text(text: &str) -> Result<HttpMessage, ParseError> {
    let (start_line, rest) = text.split_once(CRLF).ok_or_else(|| ParseError::missing_delimiter(CRLF, "start line"))?;
    let (first, remainder) = start_line.split_once(' ').ok_or_else(|| ParseError::missing_delimiter(" ", "start line"))?;

    if first == Method::GET.as_str() {
        parse_request(first, remainder, rest).map(HttpMessage::Request)
    } else {
        parse_response(first, remainder, rest).map(HttpMessage::Response)
    }
}

fn parse_request(method: &str, remainder: &str, rest: &str) -> Result<RequestHead, ParseError> {
    let (url, version) = remainder.split_once(' ').ok_or_else(|| ParseError::missing_delimiter(" ", "request line"))?;

    ensure!(!rest.is_empty(), ParseError::missing_delimiter(CRLF, "request terminator"));
    ensure!(rest == CRLF, ParseError::invalid_header("request must not carry header fields"));

    RequestHead::new(method, url, version)
}

fn parse_response(version: &str, remainder: &str, mut rest: &str) -> Result<ResponseHead, ParseError> {
    let (status_code, phrase) = remainder.split_once(' ').ok_or_else(|| ParseError::missing_delimiter(" ", "status line"))?;
    let mut head = ResponseHead::new(version, status_code, phrase)?;

    loop {
        let (line, tail) = rest.split_once(CRLF).ok_or_else(|| ParseError::missing_delimiter(CRLF, "header field"))?;
        if line.is_empty() {
            ensure!(tail.is_empty(), ParseError::invalid_header("unexpected bytes after the blank line"));
            return Ok(head);
        }

        let (name, value) = line.split_once(": ").ok_or_else(|| ParseError::missing_delimiter(": ", "header field"))?;
        ensure!(!value.contains(':'), ParseError::invalid_field(format!("value of {name} contains ':'")));
        head.insert_raw(name, value);
        rest = tail;
    }
}

/// Decoder for traffic headers implementing the [`Decoder`] trait.
///
/// Unlike [`deserialize`], a missing terminator is not an error here: the decoder
/// returns `Ok(None)` and waits for more bytes, so a header split across several
/// deliveries is reassembled.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = HttpMessage;
    type Error = ParseError;

    /// Attempts to decode one header from the front of `src`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(message))` if a complete header was parsed, its bytes are removed from `src`
    /// - `Ok(None)` if the terminator has not arrived yet
    /// - `Err(ParseError)` if the header is malformed or exceeds `MAX_HEADER_BYTES`
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match find_terminator(src) {
            Some(end) => {
                ensure!(end < MAX_HEADER_BYTES, ParseError::too_large_header(end + 1, MAX_HEADER_BYTES));

                let header_bytes = src.split_to(end + 1);
                let (message, header_size) = deserialize(&header_bytes)?;
                trace!(header_size, "parsed header");
                Ok(Some(message))
            }
            None => {
                ensure!(src.len() < MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                Ok(None)
            }
        }
    }
}
