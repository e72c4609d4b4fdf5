use crate::codec::body::LengthEncoder;
use crate::codec::header::HeaderEncoder;
use crate::protocol::{Message, ResponseHead, SendError};
use bytes::{Buf, BytesMut};
use std::io;
use std::io::ErrorKind;
use tokio_util::codec::Encoder;
use tracing::error;

/// Encodes server responses: a head, then exactly `ContentLength` payload bytes.
#[derive(Debug, Default)]
pub struct ResponseEncoder {
    header_encoder: HeaderEncoder,
    payload_encoder: Option<LengthEncoder>,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<D: Buf> Encoder<Message<ResponseHead, D>> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Message<ResponseHead, D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header(head) => {
                if self.payload_encoder.is_some() {
                    error!("expect payload item but receive response head");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                }

                let content_length = head.content_length().map_err(|e| SendError::invalid_body(e.to_string()))?;
                self.payload_encoder = Some(LengthEncoder::new(content_length));
                self.header_encoder.encode(&head, dst)
            }

            Message::Payload(payload_item) => {
                let payload_encoder = if let Some(encoder) = &mut self.payload_encoder {
                    encoder
                } else {
                    error!("expect response head but receive payload item");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                };

                let is_eof = payload_item.is_eof();
                let result = payload_encoder.encode(payload_item, dst);

                if is_eof {
                    self.payload_encoder.take();
                }

                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{CONTENT_LENGTH, PayloadItem};
    use bytes::Bytes;

    #[test]
    fn head_payload_eof() {
        let mut encoder = ResponseEncoder::new();
        let mut dst = BytesMut::new();
        let mut head = ResponseHead::ok();
        head.set_field(CONTENT_LENGTH, 3).unwrap();

        encoder.encode(Message::<_, Bytes>::Header(head), &mut dst).unwrap();
        encoder.encode(Message::<ResponseHead>::from(Bytes::from_static(b"xyz")), &mut dst).unwrap();
        encoder.encode(Message::<ResponseHead, Bytes>::Payload(PayloadItem::Eof), &mut dst).unwrap();

        assert_eq!(&dst[..], b"HTTP/1.1 200 OK\r\nContentLength: 3\r\n\r\n\0xyz");
    }

    #[test]
    fn payload_without_head() {
        let mut encoder = ResponseEncoder::new();
        let mut dst = BytesMut::new();
        let result = encoder.encode(Message::<ResponseHead>::from(Bytes::from_static(b"xyz")), &mut dst);
        assert!(result.is_err());
    }

    #[test]
    fn second_head_before_eof() {
        let mut encoder = ResponseEncoder::new();
        let mut dst = BytesMut::new();
        let mut head = ResponseHead::ok();
        head.set_field(CONTENT_LENGTH, 3).unwrap();

        encoder.encode(Message::<_, Bytes>::Header(head.clone()), &mut dst).unwrap();
        assert!(encoder.encode(Message::<_, Bytes>::Header(head), &mut dst).is_err());
    }
}
