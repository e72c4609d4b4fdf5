//! Header processing module for encoding and decoding traffic messages
//!
//! # Components
//!
//! - [`HeaderEncoder`]: Encodes request lines and response heads to bytes
//!   - [`serialized_size`] predicts the exact encoded length
//!   - [`serialize`] writes the NUL-terminated text form
//!
//! - [`HeaderDecoder`]: Decodes headers from raw bytes
//!   - [`deserialize`] parses one complete message from a buffer
//!   - the [`tokio_util::codec::Decoder`] impl waits for the terminator across
//!     partial deliveries

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_decoder::deserialize;
pub use header_encoder::HeaderEncoder;
pub use header_encoder::serialize;
pub use header_encoder::serialized_size;
pub(crate) use header_encoder::response_size;
