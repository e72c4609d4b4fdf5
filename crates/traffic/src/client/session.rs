use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use rand::Rng;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, info};

use crate::client::ClientState;
use crate::codec::{RequestEncoder, ResponseDecoder};
use crate::config::ClientConfig;
use crate::ensure;
use crate::protocol::{HTTP_11, Message, ObjectKind, ParseError, PayloadItem, RequestHead, ResponseHead, SessionError};
use crate::traffic::TrafficModel;
use crate::transport::{Scheduler, TimerId, Transport, ensure_reliable};

/// The object whose response is currently arriving.
#[derive(Debug, Clone, Copy)]
struct InFlight {
    kind: ObjectKind,
    declared: u64,
    received: u64,
}

/// One simulated browsing session.
///
/// Received bytes are appended to an internal buffer and decoded incrementally, so
/// a response head or payload split across any number of deliveries is reassembled
/// before the session acts on it. An object completes only when exactly
/// `ContentLength` payload bytes have arrived; bytes beyond that are a framing
/// desync and fail the session.
///
/// # Type Parameters
///
/// * `R`: The random source reading times are drawn from
#[derive(Debug)]
pub struct ClientSession<R> {
    config: ClientConfig,
    model: Arc<TrafficModel>,
    rng: R,
    state: ClientState,
    buffer: BytesMut,
    decoder: ResponseDecoder,
    encoder: RequestEncoder,
    in_flight: Option<InFlight>,
    /// Declared length of the last completed object.
    last_declared: u64,
    inline_objects_declared: u64,
    inline_objects_loaded: u64,
    reading_timer: Option<TimerId>,
    pages_completed: u64,
    last_reading_time: Option<Duration>,
}

impl<R: Rng> ClientSession<R> {
    pub fn new(config: ClientConfig, model: Arc<TrafficModel>, rng: R) -> Self {
        Self {
            config,
            model,
            rng,
            state: ClientState::Idle,
            buffer: BytesMut::with_capacity(8 * 1024),
            decoder: ResponseDecoder::new(),
            encoder: RequestEncoder::new(),
            in_flight: None,
            last_declared: 0,
            inline_objects_declared: 0,
            inline_objects_loaded: 0,
            reading_timer: None,
            pages_completed: 0,
            last_reading_time: None,
        }
    }

    /// Begins connecting over `transport`.
    ///
    /// # Errors
    ///
    /// - `IncompatibleTransport` if the transport is not a reliable stream, the session stays `Idle`
    /// - `InvalidState` if the session is not `Idle`
    pub fn start<T: Transport + ?Sized>(&mut self, transport: &T) -> Result<(), SessionError> {
        self.expect_state(ClientState::Idle, "start")?;
        ensure_reliable(transport)?;

        info!(remote = %self.config.remote(), "connecting to server");
        self.state = ClientState::AwaitingConnection;
        Ok(())
    }

    /// The connection is up: requests the first main object.
    pub fn on_connection_succeeded<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<(), SessionError> {
        self.expect_state(ClientState::AwaitingConnection, "connection succeeded")?;
        info!(remote = %self.config.remote(), "connection established");
        self.request(ObjectKind::Main, transport)
    }

    /// The connection attempt failed. The session returns to `Idle` without retrying
    /// and hands back the error to report.
    pub fn on_connection_failed(&mut self) -> SessionError {
        if let Err(e) = self.expect_state(ClientState::AwaitingConnection, "connection failed") {
            return e;
        }

        let remote = self.config.remote();
        error!(%remote, "connection failed");
        self.state = ClientState::Idle;
        SessionError::connection_rejected(remote)
    }

    /// Feeds one delivery of received bytes into the session.
    ///
    /// Completing an object triggers the next step of the loop: an inline request, or
    /// the reading pause armed on `scheduler`.
    ///
    /// # Errors
    ///
    /// - `UnexpectedData` if no response is outstanding
    /// - `Parse` if the response head is malformed
    /// - `UnexpectedStatus` if the response is not `200`
    /// - `Desync` if more bytes arrived than the response declared, in the same
    ///   delivery as its end or in front of the next response head
    /// - `Send` if the next request cannot be handed to the transport
    pub fn on_receive<T, S>(&mut self, data: &[u8], transport: &mut T, scheduler: &mut S) -> Result<(), SessionError>
    where
        T: Transport + ?Sized,
        S: Scheduler + ?Sized,
    {
        if self.state.is_closed() {
            debug!(len = data.len(), "session closed, drop received data");
            return Ok(());
        }
        ensure!(self.state.is_awaiting_response(), SessionError::UnexpectedData { state: self.state, len: data.len() });

        self.buffer.extend_from_slice(data);
        while let Some(message) = self.decoder.decode(&mut self.buffer)? {
            match message {
                Message::Header(head) => self.on_header(&head)?,
                Message::Payload(PayloadItem::Chunk(bytes)) => self.on_payload(bytes.len()),
                Message::Payload(PayloadItem::Eof) => self.on_object_complete(transport, scheduler)?,
            }
        }
        Ok(())
    }

    /// The reading pause is over: requests the next main object.
    ///
    /// Timers other than the pending reading-time timer are ignored.
    pub fn on_timer<T: Transport + ?Sized>(&mut self, timer: TimerId, transport: &mut T) -> Result<(), SessionError> {
        if self.state != ClientState::ReadingPause || self.reading_timer != Some(timer) {
            debug!(timer = timer.get(), state = %self.state, "ignore stale timer");
            return Ok(());
        }

        self.reading_timer = None;
        self.request(ObjectKind::Main, transport)
    }

    /// Tears the session down and cancels a pending reading-time timer.
    pub fn close<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if let Some(timer) = self.reading_timer.take() {
            scheduler.cancel(timer);
        }
        if !self.state.is_closed() {
            info!(pages_completed = self.pages_completed, state = %self.state, "session closed");
        }

        self.state = ClientState::Closed;
        self.buffer.clear();
        self.decoder.reset();
        self.in_flight = None;
    }

    fn on_header(&mut self, head: &ResponseHead) -> Result<(), SessionError> {
        if head.version() != HTTP_11 {
            // surplus bytes delivered after an object completed are glued to the next status line
            if let Some(surplus) = head.version().strip_suffix(HTTP_11) {
                return Err(SessionError::desync(self.last_declared + surplus.len() as u64, self.last_declared));
            }
            return Err(ParseError::invalid_header(format!("unsupported version {:?}", head.version())).into());
        }
        ensure!(head.is_ok(), SessionError::UnexpectedStatus { status: format!("{} {}", head.status_code(), head.phrase()) });

        let kind = head.content_type();
        let declared = head.content_length()?;
        if kind == ObjectKind::Main {
            self.inline_objects_declared = head.num_of_inline_objects()?;
        }

        debug!(content_type = kind.as_str(), content_length = declared, "received response head");
        self.in_flight = Some(InFlight { kind, declared, received: 0 });
        Ok(())
    }

    fn on_payload(&mut self, len: usize) {
        if let Some(object) = &mut self.in_flight {
            object.received += len as u64;
            debug!("received {} of {} bytes", object.received, object.declared);
        }
    }

    fn on_object_complete<T, S>(&mut self, transport: &mut T, scheduler: &mut S) -> Result<(), SessionError>
    where
        T: Transport + ?Sized,
        S: Scheduler + ?Sized,
    {
        let Some(object) = self.in_flight.take() else {
            return Err(SessionError::invalid_state(self.state, "payload end without response head"));
        };

        // one request is outstanding at a time, so nothing may follow the payload
        let trailing = self.buffer.len() as u64;
        ensure!(trailing == 0, SessionError::desync(object.received + trailing, object.declared));
        self.last_declared = object.declared;

        match object.kind {
            ObjectKind::Main => {
                self.inline_objects_loaded = 0;
                info!(content_length = object.declared, inline_objects = self.inline_objects_declared, "main object loaded");
                if self.inline_objects_declared == 0 {
                    self.begin_reading_pause(scheduler);
                    Ok(())
                } else {
                    self.request(ObjectKind::Inline, transport)
                }
            }
            ObjectKind::Inline => {
                self.inline_objects_loaded += 1;
                debug!(loaded = self.inline_objects_loaded, declared = self.inline_objects_declared, "inline object loaded");
                if self.inline_objects_loaded < self.inline_objects_declared {
                    self.request(ObjectKind::Inline, transport)
                } else {
                    self.begin_reading_pause(scheduler);
                    Ok(())
                }
            }
        }
    }

    fn begin_reading_pause<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        self.pages_completed += 1;
        let reading_time = self.model.draw_reading_time(&mut self.rng);
        debug!(?reading_time, pages_completed = self.pages_completed, "page loaded, start reading");

        self.reading_timer = Some(scheduler.schedule(reading_time));
        self.last_reading_time = Some(reading_time);
        self.state = ClientState::ReadingPause;
    }

    fn request<T: Transport + ?Sized>(&mut self, kind: ObjectKind, transport: &mut T) -> Result<(), SessionError> {
        let mut dst = BytesMut::new();
        self.encoder.encode(RequestHead::for_object(kind), &mut dst)?;
        transport.send(dst.freeze())?;
        info!(url = kind.as_str(), "request sent");

        self.state = match kind {
            ObjectKind::Main => ClientState::AwaitingMainResponse,
            ObjectKind::Inline => ClientState::AwaitingInlineResponse,
        };
        Ok(())
    }

    fn expect_state(&self, expected: ClientState, event: &'static str) -> Result<(), SessionError> {
        ensure!(self.state == expected, SessionError::invalid_state(self.state, event));
        Ok(())
    }
}

impl<R> ClientSession<R> {
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Pages whose main object and every inline object have been loaded.
    pub fn pages_completed(&self) -> u64 {
        self.pages_completed
    }

    /// Inline objects loaded for the current page.
    pub fn inline_objects_loaded(&self) -> u64 {
        self.inline_objects_loaded
    }

    /// Inline objects the last main object declared.
    pub fn inline_objects_declared(&self) -> u64 {
        self.inline_objects_declared
    }

    /// Payload bytes received for the response in flight.
    pub fn bytes_received(&self) -> u64 {
        self.in_flight.map_or(0, |object| object.received)
    }

    /// The pending reading-time timer, if the session is pausing.
    pub fn reading_timer(&self) -> Option<TimerId> {
        self.reading_timer
    }

    pub fn last_reading_time(&self) -> Option<Duration> {
        self.last_reading_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{deserialize, serialize};
    use crate::protocol::{CONTENT_TYPE, HttpMessage, NUM_OF_INLINE_OBJECTS};
    use crate::traffic::{LogNormalParams, TrafficConfig};
    use crate::transport::testing::{ManualScheduler, RecordingTransport};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn session_with(config: TrafficConfig) -> ClientSession<ChaCha8Rng> {
        let model = Arc::new(TrafficModel::new(config).unwrap());
        ClientSession::new(ClientConfig::default(), model, ChaCha8Rng::seed_from_u64(11))
    }

    fn connected() -> (ClientSession<ChaCha8Rng>, RecordingTransport, ManualScheduler) {
        let mut session = session_with(TrafficConfig::default());
        let mut transport = RecordingTransport::new(64 * 1024);
        session.start(&transport).unwrap();
        session.on_connection_succeeded(&mut transport).unwrap();
        (session, transport, ManualScheduler::default())
    }

    fn response(kind: ObjectKind, length: u64, inline_objects: Option<u64>) -> Vec<u8> {
        let mut head = ResponseHead::ok();
        head.set_field(CONTENT_TYPE, kind.as_str()).unwrap();
        head.set_content_length(length);
        if let Some(count) = inline_objects {
            head.set_field(NUM_OF_INLINE_OBJECTS, count).unwrap();
        }

        let mut dst = BytesMut::new();
        serialize(&HttpMessage::from(head), &mut dst);
        dst.resize(dst.len() + length as usize, b'x');
        dst.to_vec()
    }

    fn sent_urls(transport: &mut RecordingTransport) -> Vec<String> {
        transport
            .take_sent()
            .iter()
            .map(|bytes| {
                let (message, consumed) = deserialize(bytes).unwrap();
                assert_eq!(consumed, bytes.len());
                message.into_request().unwrap().url().to_owned()
            })
            .collect()
    }

    #[test]
    fn connecting_requests_main_object() {
        let (session, mut transport, _) = connected();
        assert_eq!(session.state(), ClientState::AwaitingMainResponse);
        assert_eq!(sent_urls(&mut transport), vec!["main/object"]);
    }

    #[test]
    fn loads_every_inline_object_then_pauses() {
        let (mut session, mut transport, mut scheduler) = connected();
        transport.take_sent();

        session.on_receive(&response(ObjectKind::Main, 500, Some(3)), &mut transport, &mut scheduler).unwrap();
        assert_eq!(session.state(), ClientState::AwaitingInlineResponse);
        assert_eq!(session.inline_objects_declared(), 3);

        let mut inline_requests = sent_urls(&mut transport);
        for i in 0..3 {
            assert_eq!(session.inline_objects_loaded(), i);
            session.on_receive(&response(ObjectKind::Inline, 100 + i, None), &mut transport, &mut scheduler).unwrap();
            inline_requests.extend(sent_urls(&mut transport));
        }

        assert_eq!(inline_requests, vec!["inline/object"; 3]);
        assert_eq!(session.state(), ClientState::ReadingPause);
        assert_eq!(session.pages_completed(), 1);

        let (timer, delay) = scheduler.fire_next().unwrap();
        assert_eq!(Some(delay), session.last_reading_time());
        assert!(delay <= Duration::from_secs(10_000));

        session.on_timer(timer, &mut transport).unwrap();
        assert_eq!(session.state(), ClientState::AwaitingMainResponse);
        assert_eq!(sent_urls(&mut transport), vec!["main/object"]);
    }

    #[test]
    fn partial_deliveries_accumulate() {
        let (mut session, mut transport, mut scheduler) = connected();
        transport.take_sent();

        let bytes = response(ObjectKind::Main, 500, Some(1));
        let header_len = bytes.len() - 500;

        // split inside the head, then inside the payload
        session.on_receive(&bytes[..10], &mut transport, &mut scheduler).unwrap();
        assert_eq!(session.bytes_received(), 0);
        session.on_receive(&bytes[10..header_len + 200], &mut transport, &mut scheduler).unwrap();
        assert_eq!(session.state(), ClientState::AwaitingMainResponse);
        assert_eq!(session.bytes_received(), 200);
        assert!(transport.sent.is_empty());

        session.on_receive(&bytes[header_len + 200..], &mut transport, &mut scheduler).unwrap();
        assert_eq!(session.state(), ClientState::AwaitingInlineResponse);
        assert_eq!(sent_urls(&mut transport), vec!["inline/object"]);
    }

    #[test]
    fn page_without_inline_objects() {
        let (mut session, mut transport, mut scheduler) = connected();
        transport.take_sent();

        session.on_receive(&response(ObjectKind::Main, 42, Some(0)), &mut transport, &mut scheduler).unwrap();

        assert_eq!(session.state(), ClientState::ReadingPause);
        assert!(transport.sent.is_empty());
        assert_eq!(scheduler.armed.len(), 1);
        assert_eq!(session.pages_completed(), 1);
    }

    #[test]
    fn reading_time_is_clamped() {
        let config = TrafficConfig { reading_time: LogNormalParams { mu: 30.0, sigma: 0.1 }, ..TrafficConfig::default() };
        let mut session = session_with(config);
        let mut transport = RecordingTransport::new(1024);
        let mut scheduler = ManualScheduler::default();
        session.start(&transport).unwrap();
        session.on_connection_succeeded(&mut transport).unwrap();

        session.on_receive(&response(ObjectKind::Main, 0, Some(0)), &mut transport, &mut scheduler).unwrap();

        let (_, delay) = scheduler.fire_next().unwrap();
        assert_eq!(delay, Duration::from_secs(10_000));
    }

    #[test]
    fn extra_bytes_are_a_desync() {
        let (mut session, mut transport, mut scheduler) = connected();

        let mut bytes = response(ObjectKind::Main, 5, Some(2));
        bytes.extend_from_slice(b"abc");
        let result = session.on_receive(&bytes, &mut transport, &mut scheduler);

        assert!(matches!(result, Err(SessionError::Desync { received: 8, declared: 5 })));
    }

    #[test]
    fn extra_bytes_in_a_later_delivery_are_a_desync() {
        let (mut session, mut transport, mut scheduler) = connected();
        session.on_receive(&response(ObjectKind::Main, 5, Some(1)), &mut transport, &mut scheduler).unwrap();
        assert_eq!(session.state(), ClientState::AwaitingInlineResponse);

        // no terminator yet, so the surplus waits in the buffer
        session.on_receive(b"abc", &mut transport, &mut scheduler).unwrap();
        let result = session.on_receive(&response(ObjectKind::Inline, 4, None), &mut transport, &mut scheduler);

        assert!(matches!(result, Err(SessionError::Desync { received: 8, declared: 5 })));
        assert_eq!(session.pages_completed(), 0);
    }

    #[test]
    fn unsupported_version_is_a_parse_error() {
        let (mut session, mut transport, mut scheduler) = connected();
        let result = session.on_receive(b"HTTP/2 200 OK\r\n\r\n\0", &mut transport, &mut scheduler);
        assert!(matches!(result, Err(SessionError::Parse { source: ParseError::InvalidHeader { .. } })));
    }

    #[test]
    fn non_ok_status_is_rejected() {
        let (mut session, mut transport, mut scheduler) = connected();
        let result = session.on_receive(b"HTTP/1.1 404 Not Found\r\n\r\n\0", &mut transport, &mut scheduler);
        assert!(matches!(result, Err(SessionError::UnexpectedStatus { status }) if status == "404 Not Found"));
    }

    #[test]
    fn malformed_head_is_a_parse_error() {
        let (mut session, mut transport, mut scheduler) = connected();
        let result = session.on_receive(b"HTTP/1.1 200\r\n\r\n\0", &mut transport, &mut scheduler);
        assert!(matches!(result, Err(SessionError::Parse { .. })));
    }

    #[test]
    fn connection_failure_returns_to_idle() {
        let mut session = session_with(TrafficConfig::default());
        let transport = RecordingTransport::new(1024);

        assert!(matches!(session.on_connection_failed(), SessionError::InvalidState { state: ClientState::Idle, .. }));

        session.start(&transport).unwrap();
        assert!(matches!(session.on_connection_failed(), SessionError::ConnectionRejected { .. }));
        assert_eq!(session.state(), ClientState::Idle);
    }

    #[test]
    fn datagram_transport_is_incompatible() {
        let mut session = session_with(TrafficConfig::default());
        let result = session.start(&RecordingTransport::datagram());

        assert!(matches!(result, Err(SessionError::IncompatibleTransport { .. })));
        assert_eq!(session.state(), ClientState::Idle);
    }

    #[test]
    fn data_during_reading_pause_is_unexpected() {
        let (mut session, mut transport, mut scheduler) = connected();
        session.on_receive(&response(ObjectKind::Main, 1, Some(0)), &mut transport, &mut scheduler).unwrap();

        let result = session.on_receive(b"x", &mut transport, &mut scheduler);
        assert!(matches!(result, Err(SessionError::UnexpectedData { state: ClientState::ReadingPause, len: 1 })));
    }

    #[test]
    fn close_cancels_reading_timer() {
        let (mut session, mut transport, mut scheduler) = connected();
        session.on_receive(&response(ObjectKind::Main, 1, Some(0)), &mut transport, &mut scheduler).unwrap();
        let timer = session.reading_timer().unwrap();
        transport.take_sent();

        session.close(&mut scheduler);
        assert_eq!(session.state(), ClientState::Closed);
        assert_eq!(scheduler.cancelled, vec![timer]);
        assert!(scheduler.armed.is_empty());

        // a timer delivered after close is stale
        session.on_timer(timer, &mut transport).unwrap();
        assert!(transport.sent.is_empty());
        assert_eq!(session.state(), ClientState::Closed);
    }
}
