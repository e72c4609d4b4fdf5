use std::sync::Arc;

use futures::StreamExt;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::select;
use tokio_util::codec::{BytesCodec, FramedRead, FramedWrite};
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::connection::StreamTransport;
use crate::protocol::{HttpError, SessionError};
use crate::server::ServerSession;
use crate::traffic::{TrafficModel, seeded_rng};

/// Drives a [`ServerSession`] over an async byte stream.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
/// * `G`: The session's random source
#[derive(Debug)]
pub struct ServerConnection<R, W, G> {
    framed_read: FramedRead<R, BytesCodec>,
    framed_write: FramedWrite<W, BytesCodec>,
    session: ServerSession<G>,
    transport: StreamTransport,
}

impl<R, W, G> ServerConnection<R, W, G>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    G: Rng,
{
    /// `send_buffer_capacity` caps the size of every single response.
    pub fn new(reader: R, writer: W, session: ServerSession<G>, send_buffer_capacity: usize) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, BytesCodec::new(), 8 * 1024),
            framed_write: FramedWrite::new(writer, BytesCodec::new()),
            session,
            transport: StreamTransport::new(send_buffer_capacity),
        }
    }

    /// Answers requests until the client closes the connection.
    ///
    /// Returns the number of responses sent.
    ///
    /// # Errors
    ///
    /// Returns `HttpError` if the stream fails or a request is malformed.
    pub async fn process(mut self) -> Result<u64, HttpError> {
        self.session.on_accept(&self.transport)?;

        loop {
            match self.framed_read.next().await {
                Some(Ok(bytes)) => {
                    let result = self.session.on_receive(&bytes, &mut self.transport);
                    // responses to requests before a bad one still go out
                    self.transport.flush_into(&mut self.framed_write).await.map_err(SessionError::from)?;
                    if let Err(e) = result {
                        error!(cause = %e, "can't answer request");
                        return Err(e.into());
                    }
                }

                Some(Err(e)) => {
                    error!(cause = %e, "can't receive next request");
                    return Err(e.into());
                }

                None => {
                    info!(requests_served = self.session.requests_served(), "cant read more request, break this connection down");
                    return Ok(self.session.requests_served());
                }
            }
        }
    }
}

/// Accepts connections on `listener` until `shutdown` completes.
///
/// Every connection runs its own [`ServerSession`] on a spawned task and keeps
/// running until its client disconnects, shutdown only stops accepting. With
/// `config.seed` set, each connection gets a seed drawn from one root generator,
/// so a run is reproducible as long as connections arrive in the same order.
pub async fn serve<F>(listener: TcpListener, config: ServerConfig, model: Arc<TrafficModel>, shutdown: F)
where
    F: Future<Output = ()>,
{
    match listener.local_addr() {
        Ok(addr) => info!(%addr, "start listening"),
        Err(e) => warn!(cause = %e, "start listening on unknown address"),
    }

    let mut seeds = config.seed.map(|seed| seeded_rng(Some(seed)));
    tokio::pin!(shutdown);

    loop {
        let accepted = select! {
            () = &mut shutdown => break,
            accepted = listener.accept() => accepted,
        };

        let (stream, peer) = match accepted {
            Ok(stream_and_addr) => stream_and_addr,
            Err(e) => {
                warn!(cause = %e, "failed to accept");
                continue;
            }
        };

        let rng = match seeds.as_mut() {
            Some(root) => seeded_rng(Some(root.random())),
            None => seeded_rng(None),
        };
        let model = Arc::clone(&model);

        tokio::spawn(async move {
            let (reader, writer) = stream.into_split();
            let session = ServerSession::<ChaCha8Rng>::new(model, rng);
            let connection = ServerConnection::new(reader, writer, session, config.send_buffer_capacity);

            match connection.process().await {
                Ok(requests_served) => info!(%peer, requests_served, "finished process, connection shutdown"),
                Err(e) => error!(%peer, cause = %e, "service has error, connection shutdown"),
            }
        });
    }

    info!("stop accepting connections");
}
