use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use rand::Rng;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, info, warn};

use crate::codec::{RequestDecoder, ResponseEncoder, response_size};
use crate::protocol::{CONTENT_TYPE, Message, NUM_OF_INLINE_OBJECTS, ObjectKind, PayloadItem, RequestHead, ResponseHead, SendError, SessionError};
use crate::traffic::TrafficModel;
use crate::transport::{Transport, ensure_reliable};

/// Answers the requests of one connection.
///
/// # Type Parameters
///
/// * `R`: The random source object sizes are drawn from
#[derive(Debug)]
pub struct ServerSession<R> {
    model: Arc<TrafficModel>,
    rng: R,
    buffer: BytesMut,
    decoder: RequestDecoder,
    encoder: ResponseEncoder,
    requests_served: u64,
}

impl<R: Rng> ServerSession<R> {
    pub fn new(model: Arc<TrafficModel>, rng: R) -> Self {
        Self { model, rng, buffer: BytesMut::with_capacity(1024), decoder: RequestDecoder::new(), encoder: ResponseEncoder::new(), requests_served: 0 }
    }

    /// Checks that the accepted connection can carry the protocol.
    ///
    /// # Errors
    ///
    /// Returns `IncompatibleTransport` if the transport is not a reliable stream.
    pub fn on_accept<T: Transport + ?Sized>(&self, transport: &T) -> Result<(), SessionError> {
        ensure_reliable(transport)?;
        debug!(socket_type = ?transport.socket_type(), "connection accepted");
        Ok(())
    }

    /// Feeds one delivery of received bytes and answers every request it completes.
    ///
    /// Returns the number of responses sent. A request split across deliveries is
    /// buffered until its terminator arrives.
    ///
    /// # Errors
    ///
    /// - `Parse` if a request is malformed
    /// - `Send` if a response cannot be handed to the transport
    pub fn on_receive<T: Transport + ?Sized>(&mut self, data: &[u8], transport: &mut T) -> Result<usize, SessionError> {
        self.buffer.extend_from_slice(data);

        let mut responses = 0;
        while let Some(request) = self.decoder.decode(&mut self.buffer)? {
            self.respond(&request, transport)?;
            responses += 1;
        }
        Ok(responses)
    }

    /// Answers one request: the head immediately followed by `ContentLength`
    /// payload bytes, handed to the transport in a single send.
    pub fn respond<T: Transport + ?Sized>(&mut self, request: &RequestHead, transport: &mut T) -> Result<(), SessionError> {
        let head = self.build_response(request, transport.send_capacity())?;
        let content_length = head.content_length()?;
        let payload_len = usize::try_from(content_length).map_err(|e| SendError::invalid_body(format!("payload of {content_length} bytes: {e}")))?;

        let mut dst = BytesMut::with_capacity(response_size(&head) + payload_len);
        self.encoder.encode(Message::<_, Bytes>::Header(head), &mut dst)?;
        if payload_len > 0 {
            self.encoder.encode(Message::<ResponseHead>::from(Bytes::from(vec![0u8; payload_len])), &mut dst)?;
        }
        self.encoder.encode(Message::<ResponseHead, Bytes>::Payload(PayloadItem::Eof), &mut dst)?;

        transport.send(dst.freeze())?;
        self.requests_served += 1;
        Ok(())
    }

    /// Builds the response head for `request`, with a freshly drawn size that fits
    /// `capacity` bytes together with the head itself.
    ///
    /// # Errors
    ///
    /// Returns `Parse` only if a generated field fails validation.
    pub fn build_response(&mut self, request: &RequestHead, capacity: usize) -> Result<ResponseHead, SessionError> {
        let kind = request.object_kind();
        let (content_length, inline_objects) = match kind {
            ObjectKind::Main => {
                let size = self.model.draw_main_object_size(&mut self.rng);
                (size, self.model.draw_inline_object_count(&mut self.rng))
            }
            ObjectKind::Inline => (self.model.draw_inline_object_size(&mut self.rng), 0),
        };
        info!(url = request.url(), content_length, inline_objects, "received request");

        let mut head = ResponseHead::ok();
        head.set_field(CONTENT_TYPE, kind.as_str())?;
        head.set_field(NUM_OF_INLINE_OBJECTS, inline_objects)?;
        head.set_content_length(content_length);

        fit_to_capacity(&mut head, content_length, capacity);
        Ok(head)
    }

    /// Responses sent on this connection so far.
    pub fn requests_served(&self) -> u64 {
        self.requests_served
    }
}

/// Shrinks `ContentLength` until head and payload together fit in `capacity`.
///
/// The head is measured again after every change because a shorter decimal length
/// also shortens the head.
fn fit_to_capacity(head: &mut ResponseHead, mut content_length: u64, capacity: usize) {
    let capacity = capacity as u64;
    loop {
        let header_size = response_size(head) as u64;
        if content_length == 0 || content_length.saturating_add(header_size) <= capacity {
            break;
        }

        let clamped = capacity.saturating_sub(header_size);
        debug!(content_length, clamped, header_size, capacity, "clamp response to the send buffer");
        content_length = clamped;
        head.set_content_length(content_length);
    }

    if response_size(head) as u64 > capacity {
        warn!(header_size = response_size(head), capacity, "response head alone exceeds the send buffer");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ResponseDecoder, deserialize};
    use crate::traffic::{TrafficConfig, WeibullParams};
    use crate::transport::testing::RecordingTransport;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn session() -> ServerSession<ChaCha8Rng> {
        let model = Arc::new(TrafficModel::new(TrafficConfig::default()).unwrap());
        ServerSession::new(model, ChaCha8Rng::seed_from_u64(5))
    }

    fn decode_head(bytes: &Bytes) -> (ResponseHead, usize) {
        let (message, consumed) = deserialize(bytes).unwrap();
        (message.into_response().unwrap(), consumed)
    }

    #[test]
    fn main_object_response() {
        let mut session = session();
        let head = session.build_response(&RequestHead::get("main/object").unwrap(), usize::MAX).unwrap();

        assert!(head.is_ok());
        assert_eq!(head.content_type(), ObjectKind::Main);
        assert!(head.field(NUM_OF_INLINE_OBJECTS).is_some());
        assert!(head.content_length().is_ok());
    }

    #[test]
    fn other_urls_get_inline_objects() {
        let mut session = session();
        for url in ["inline/object", "favicon.ico"] {
            let head = session.build_response(&RequestHead::get(url).unwrap(), usize::MAX).unwrap();
            assert_eq!(head.field(CONTENT_TYPE), Some("inline/object"));
            assert_eq!(head.num_of_inline_objects().unwrap(), 0);
        }
    }

    #[test]
    fn payload_follows_head() {
        let mut session = session();
        let mut transport = RecordingTransport::new(1 << 20);

        let served = session.on_receive(b"GET inline/object HTTP/1.1\r\n\r\n\0", &mut transport).unwrap();
        assert_eq!(served, 1);
        assert_eq!(session.requests_served(), 1);

        let sent = transport.take_sent();
        assert_eq!(sent.len(), 1);
        let (head, consumed) = decode_head(&sent[0]);
        assert_eq!(consumed as u64 + head.content_length().unwrap(), sent[0].len() as u64);
    }

    #[test]
    fn responses_fit_the_send_buffer() {
        // sizes around 1e9 bytes, always far above the capacity
        let config = TrafficConfig { main_object_size: WeibullParams { scale: 1.0e9, shape: 50.0 }, ..TrafficConfig::default() };
        let model = Arc::new(TrafficModel::new(config).unwrap());
        let mut session = ServerSession::new(model, ChaCha8Rng::seed_from_u64(9));

        for capacity in [200, 1000, 4096, 131_072] {
            let mut transport = RecordingTransport::new(capacity);
            session.respond(&RequestHead::get("main/object").unwrap(), &mut transport).unwrap();

            let sent = transport.take_sent();
            let (head, header_size) = decode_head(&sent[0]);
            let content_length = head.content_length().unwrap();
            assert!(content_length <= (capacity - header_size) as u64);
            assert!(content_length > 0);
            assert!(sent[0].len() <= capacity);
        }
    }

    #[test]
    fn clamp_measures_the_head() {
        let mut head = ResponseHead::ok();
        head.set_content_length(1_000_000);
        let header_size = response_size(&head);

        let capacity = header_size + 99;
        fit_to_capacity(&mut head, 1_000_000, capacity);

        let content_length = head.content_length().unwrap();
        assert_eq!(content_length, 99);
        assert!(response_size(&head) as u64 + content_length <= capacity as u64);
    }

    #[test]
    fn head_larger_than_capacity() {
        let mut head = ResponseHead::ok();
        head.set_content_length(500);
        fit_to_capacity(&mut head, 500, 8);
        assert_eq!(head.content_length().unwrap(), 0);
    }

    #[test]
    fn small_responses_are_untouched() {
        let mut head = ResponseHead::ok();
        head.set_content_length(10);
        fit_to_capacity(&mut head, 10, 1024);
        assert_eq!(head.content_length().unwrap(), 10);
    }

    #[test]
    fn pipelined_and_split_requests() {
        let mut session = session();
        let mut transport = RecordingTransport::new(1 << 20);

        let served = session.on_receive(b"GET main/object HTTP/1.1\r\n\r\n\0GET inline/", &mut transport).unwrap();
        assert_eq!(served, 1);
        let served = session.on_receive(b"object HTTP/1.1\r\n\r\n\0", &mut transport).unwrap();
        assert_eq!(served, 1);

        let mut decoder = ResponseDecoder::new();
        let mut kinds = Vec::new();
        for bytes in transport.take_sent() {
            let mut buf = BytesMut::from(&bytes[..]);
            while let Some(item) = decoder.decode(&mut buf).unwrap() {
                if let Message::Header(head) = item {
                    kinds.push(head.content_type());
                }
            }
            assert!(buf.is_empty());
        }
        assert_eq!(kinds, vec![ObjectKind::Main, ObjectKind::Inline]);
    }

    #[test]
    fn malformed_request_is_a_parse_error() {
        let mut session = session();
        let mut transport = RecordingTransport::new(1024);
        let result = session.on_receive(b"GET main/object\r\n\r\n\0", &mut transport);
        assert!(matches!(result, Err(SessionError::Parse { .. })));
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn datagram_transport_is_incompatible() {
        let session = session();
        assert!(session.on_accept(&RecordingTransport::new(16)).is_ok());
        assert!(matches!(session.on_accept(&RecordingTransport::datagram()), Err(SessionError::IncompatibleTransport { .. })));
    }
}
