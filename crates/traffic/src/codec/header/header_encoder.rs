//! Header encoder implementation for serializing traffic messages
//!
//! This module renders [`HttpMessage`] values into their NUL-terminated text form:
//!
//! ```text
//! request:  {method} {url} {version}\r\n\r\n\0
//! response: {version} {status} {phrase}\r\n
//!           {name}: {value}\r\n        (once per field, sorted by name)
//!           \r\n\0
//! ```
//!
//! There is no length prefix, so [`serialized_size`] must predict exactly what
//! [`serialize`] writes. The server relies on that prediction to fit a response
//! into the transport send buffer.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::{HttpMessage, RequestHead, ResponseHead, SendError};

/// Length of the separator between a field name and its value.
const FIELD_SEPARATOR: &[u8] = b": ";

const CRLF: &[u8] = b"\r\n";

const TERMINATOR: u8 = b'\0';

/// Returns the exact number of bytes [`serialize`] writes for `message`.
pub fn serialized_size(message: &HttpMessage) -> usize {
    match message {
        HttpMessage::Request(request) => request_size(request),
        HttpMessage::Response(response) => response_size(response),
    }
}

pub(crate) fn request_size(request: &RequestHead) -> usize {
    // two spaces, CRLF CRLF, NUL
    request.method().len() + request.url().len() + request.version().len() + 2 + 4 + 1
}

pub(crate) fn response_size(response: &ResponseHead) -> usize {
    // two spaces, CRLF
    let status_line = response.version().len() + response.status_code().len() + response.phrase().len() + 2 + 2;
    let fields: usize = response.fields().map(|(name, value)| name.len() + FIELD_SEPARATOR.len() + value.len() + CRLF.len()).sum();
    // final CRLF, NUL
    status_line + fields + 2 + 1
}

/// Appends the wire form of `message` to `dst`.
pub fn serialize(message: &HttpMessage, dst: &mut BytesMut) {
    match message {
        HttpMessage::Request(request) => write_request(request, dst),
        HttpMessage::Response(response) => write_response(response, dst),
    }
}

pub(crate) fn write_request(request: &RequestHead, dst: &mut BytesMut) {
    dst.reserve(request_size(request));
    dst.put_slice(request.method().as_bytes());
    dst.put_u8(b' ');
    dst.put_slice(request.url().as_bytes());
    dst.put_u8(b' ');
    dst.put_slice(request.version().as_bytes());
    dst.put_slice(CRLF);
    dst.put_slice(CRLF);
    dst.put_u8(TERMINATOR);
}

pub(crate) fn write_response(response: &ResponseHead, dst: &mut BytesMut) {
    dst.reserve(response_size(response));
    dst.put_slice(response.version().as_bytes());
    dst.put_u8(b' ');
    dst.put_slice(response.status_code().as_bytes());
    dst.put_u8(b' ');
    dst.put_slice(response.phrase().as_bytes());
    dst.put_slice(CRLF);

    for (name, value) in response.fields() {
        dst.put_slice(name.as_bytes());
        dst.put_slice(FIELD_SEPARATOR);
        dst.put_slice(value.as_bytes());
        dst.put_slice(CRLF);
    }
    dst.put_slice(CRLF);
    dst.put_u8(TERMINATOR);
}

/// Encoder for traffic headers implementing the [`Encoder`] trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderEncoder;

impl Encoder<RequestHead> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: RequestHead, dst: &mut BytesMut) -> Result<(), Self::Error> {
        write_request(&item, dst);
        Ok(())
    }
}

impl Encoder<&ResponseHead> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: &ResponseHead, dst: &mut BytesMut) -> Result<(), Self::Error> {
        write_response(item, dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{CONTENT_LENGTH, CONTENT_TYPE, NUM_OF_INLINE_OBJECTS};

    fn encode(message: &HttpMessage) -> BytesMut {
        let mut dst = BytesMut::new();
        serialize(message, &mut dst);
        dst
    }

    #[test]
    fn request_wire_form() {
        let message = HttpMessage::from(RequestHead::get("main/object").unwrap());
        let bytes = encode(&message);

        assert_eq!(&bytes[..], b"GET main/object HTTP/1.1\r\n\r\n\0");
        assert_eq!(bytes.len(), serialized_size(&message));
        assert_eq!(serialized_size(&message), 3 + 11 + 8 + 2 + 4 + 1);
    }

    #[test]
    fn response_wire_form() {
        let mut head = ResponseHead::ok();
        head.set_field(NUM_OF_INLINE_OBJECTS, 3).unwrap();
        head.set_field(CONTENT_TYPE, "main/object").unwrap();
        head.set_field(CONTENT_LENGTH, 500).unwrap();
        let message = HttpMessage::from(head);
        let bytes = encode(&message);

        assert_eq!(
            &bytes[..],
            &b"HTTP/1.1 200 OK\r\nContentLength: 500\r\nContentType: main/object\r\nNumOfInlineObjects: 3\r\n\r\n\0"[..]
        );
        assert_eq!(bytes.len(), serialized_size(&message));
    }

    #[test]
    fn size_matches_for_zero_one_and_many_fields() {
        let mut head = ResponseHead::new("HTTP/1.0", "404", "Not Found").unwrap();
        for i in 0..20 {
            let message = HttpMessage::from(head.clone());
            assert_eq!(encode(&message).len(), serialized_size(&message), "with {i} fields");
            head.set_field(&format!("X-Field-{i}"), "v".repeat(i)).unwrap();
        }
    }

    #[test]
    fn encoder_appends() {
        let mut dst = BytesMut::from(&b"prefix"[..]);
        HeaderEncoder.encode(RequestHead::get("inline/object").unwrap(), &mut dst).unwrap();
        assert_eq!(&dst[..], b"prefixGET inline/object HTTP/1.1\r\n\r\n\0");
    }
}
