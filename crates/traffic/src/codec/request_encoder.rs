use crate::codec::header::HeaderEncoder;
use crate::protocol::{RequestHead, SendError};
use bytes::BytesMut;
use tokio_util::codec::Encoder;
use tracing::trace;

/// Encodes client requests.
#[derive(Debug, Default)]
pub struct RequestEncoder {
    header_encoder: HeaderEncoder,
}

impl RequestEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Encoder<RequestHead> for RequestEncoder {
    type Error = SendError;

    fn encode(&mut self, item: RequestHead, dst: &mut BytesMut) -> Result<(), Self::Error> {
        trace!(url = item.url(), "encode request");
        self.header_encoder.encode(item, dst)
    }
}
