//! Traffic codec module for encoding and decoding messages
//!
//! This module provides the wire format shared by the simulated client and server:
//! ASCII start line, CRLF delimited field lines, a blank line and a NUL terminator.
//! There is no length prefix; message boundaries are recovered by scanning for the
//! terminator.
//!
//! # Architecture
//!
//! - Pure functions:
//!   - [`serialized_size`]: exact encoded length of a message
//!   - [`serialize`]: writes a message to a buffer
//!   - [`deserialize`]: parses one message and reports the bytes it consumed
//!
//! - Client side:
//!   - [`RequestEncoder`]: Encodes outgoing requests
//!   - [`ResponseDecoder`]: Decodes response heads and their fixed-length payloads
//!
//! - Server side:
//!   - [`RequestDecoder`]: Decodes incoming requests
//!   - [`ResponseEncoder`]: Encodes response heads and their payloads
//!
//! # Example
//!
//! ```
//! use micro_traffic::codec::{deserialize, serialize, serialized_size};
//! use micro_traffic::protocol::{HttpMessage, RequestHead};
//! use bytes::BytesMut;
//!
//! let message = HttpMessage::from(RequestHead::get("main/object").unwrap());
//! let mut buffer = BytesMut::new();
//! serialize(&message, &mut buffer);
//! assert_eq!(buffer.len(), serialized_size(&message));
//!
//! let (decoded, consumed) = deserialize(&buffer).unwrap();
//! assert_eq!(decoded, message);
//! assert_eq!(consumed, buffer.len());
//! ```

mod body;
mod header;
mod request_decoder;
mod request_encoder;
mod response_decoder;
mod response_encoder;

pub use header::{HeaderDecoder, HeaderEncoder, deserialize, serialize, serialized_size};
pub(crate) use header::response_size;
pub use request_decoder::RequestDecoder;
pub use request_encoder::RequestEncoder;
pub use response_decoder::ResponseDecoder;
pub use response_encoder::ResponseEncoder;
