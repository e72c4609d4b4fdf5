//! Payload handling for traffic responses
//!
//! Every response declares its payload size in the `ContentLength` field, so the
//! only transfer strategy is a fixed length one.
//!
//! # Components
//!
//! - [`LengthDecoder`]: splits exactly the declared number of payload bytes off the
//!   input and then signals EOF
//! - [`LengthEncoder`]: writes payload chunks and refuses to write past the declared length

mod length_decoder;
mod length_encoder;

pub use length_decoder::LengthDecoder;
pub use length_encoder::LengthEncoder;
