use std::sync::Arc;

use bytes::BytesMut;
use futures::StreamExt;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::select;
use tokio::time::{Instant, sleep_until};
use tokio_util::codec::{BytesCodec, FramedRead, FramedWrite};
use tracing::{error, info, warn};

use crate::client::{ClientSession, ClientState};
use crate::config::{ClientConfig, DEFAULT_SEND_BUFFER_CAPACITY};
use crate::connection::{StreamTransport, TokioScheduler};
use crate::protocol::{HttpError, SessionError};
use crate::traffic::{TrafficModel, seeded_rng};

/// Drives a [`ClientSession`] over an async byte stream.
///
/// The connection is the session's event source: it turns socket reads into
/// `on_receive` calls, the armed reading-time timer into `on_timer` calls and
/// writes whatever the session sent after each call.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
/// * `G`: The session's random source
#[derive(Debug)]
pub struct ClientConnection<R, W, G> {
    framed_read: FramedRead<R, BytesCodec>,
    framed_write: FramedWrite<W, BytesCodec>,
    session: ClientSession<G>,
    transport: StreamTransport,
    scheduler: TokioScheduler,
}

enum Event {
    Shutdown,
    Received(BytesMut),
    ReadFailed(std::io::Error),
    Disconnected,
    TimerDue,
}

impl ClientConnection<OwnedReadHalf, OwnedWriteHalf, ChaCha8Rng> {
    /// Connects to `config.remote()` over tcp.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionRejected` if the server cannot be reached. Nothing is retried.
    pub async fn connect(config: ClientConfig, model: Arc<TrafficModel>) -> Result<Self, HttpError> {
        let transport = StreamTransport::new(DEFAULT_SEND_BUFFER_CAPACITY);
        let mut session = ClientSession::new(config, model, seeded_rng(config.seed));
        session.start(&transport)?;

        match TcpStream::connect(config.remote()).await {
            Ok(stream) => {
                let (reader, writer) = stream.into_split();
                Ok(Self::with_transport(reader, writer, session, transport))
            }
            Err(e) => {
                warn!(cause = %e, "failed to connect");
                Err(session.on_connection_failed().into())
            }
        }
    }
}

impl<R, W, G> ClientConnection<R, W, G>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    G: Rng,
{
    /// Wraps an already connected stream.
    pub fn new(reader: R, writer: W, session: ClientSession<G>) -> Self {
        Self::with_transport(reader, writer, session, StreamTransport::new(DEFAULT_SEND_BUFFER_CAPACITY))
    }

    fn with_transport(reader: R, writer: W, session: ClientSession<G>, transport: StreamTransport) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, BytesCodec::new(), 8 * 1024),
            framed_write: FramedWrite::new(writer, BytesCodec::new()),
            session,
            transport,
            scheduler: TokioScheduler::new(),
        }
    }

    /// Browses until `shutdown` completes or the server closes the connection.
    ///
    /// Returns the closed session so its statistics can be inspected.
    ///
    /// # Errors
    ///
    /// Returns `HttpError` if the stream fails or the session hits a protocol error.
    /// The session is closed either way.
    pub async fn run<F>(mut self, shutdown: F) -> Result<ClientSession<G>, HttpError>
    where
        F: Future<Output = ()>,
    {
        if self.session.state() == ClientState::Idle {
            self.session.start(&self.transport)?;
        }
        self.session.on_connection_succeeded(&mut self.transport)?;
        self.flush().await?;

        tokio::pin!(shutdown);
        loop {
            let timer = self.scheduler.pending();
            let deadline = timer.map_or_else(Instant::now, |(_, deadline)| deadline);

            let event = select! {
                // shutdown wins over a timer due at the same instant
                biased;
                () = &mut shutdown => Event::Shutdown,
                frame = self.framed_read.next() => match frame {
                    Some(Ok(bytes)) => Event::Received(bytes),
                    Some(Err(e)) => Event::ReadFailed(e),
                    None => Event::Disconnected,
                },
                () = sleep_until(deadline), if timer.is_some() => Event::TimerDue,
            };

            let result = match event {
                Event::Shutdown => {
                    info!("shutdown signal received, stop browsing");
                    break;
                }
                Event::Disconnected => {
                    info!("server closed the connection");
                    break;
                }
                Event::ReadFailed(e) => {
                    error!(cause = %e, "can't receive next response");
                    self.session.close(&mut self.scheduler);
                    return Err(e.into());
                }
                Event::Received(bytes) => self.session.on_receive(&bytes, &mut self.transport, &mut self.scheduler),
                Event::TimerDue => match self.scheduler.take_due(Instant::now()) {
                    Some(timer) => self.session.on_timer(timer, &mut self.transport),
                    None => Ok(()),
                },
            };

            if let Err(e) = result {
                error!(cause = %e, state = %self.session.state(), "client session failed");
                self.session.close(&mut self.scheduler);
                return Err(e.into());
            }
            self.flush().await?;
        }

        self.session.close(&mut self.scheduler);
        Ok(self.session)
    }

    async fn flush(&mut self) -> Result<(), HttpError> {
        self.transport.flush_into(&mut self.framed_write).await.map_err(SessionError::from)?;
        Ok(())
    }
}
