use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use futures::SinkExt;
use tokio::io::AsyncWrite;
use tokio::time::Instant;
use tokio_util::codec::{BytesCodec, FramedWrite};

use crate::protocol::SendError;
use crate::transport::{Scheduler, SocketType, TimerId, Transport};

/// A [`Transport`] over a tokio byte stream.
///
/// Sessions call `send` synchronously; the connection drains the queue into the
/// socket once the session returns.
#[derive(Debug)]
pub struct StreamTransport {
    capacity: usize,
    queue: VecDeque<Bytes>,
}

impl StreamTransport {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, queue: VecDeque::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Writes every queued send to `framed_write` and flushes it.
    pub async fn flush_into<W>(&mut self, framed_write: &mut FramedWrite<W, BytesCodec>) -> Result<(), SendError>
    where
        W: AsyncWrite + Unpin,
    {
        if self.queue.is_empty() {
            return Ok(());
        }

        while let Some(bytes) = self.queue.pop_front() {
            // feed instead of send, flush once for the whole batch
            framed_write.feed(bytes).await.map_err(SendError::io)?;
        }
        // BytesCodec encodes both Bytes and BytesMut, name the sink item
        SinkExt::<Bytes>::flush(framed_write).await.map_err(SendError::io)
    }
}

impl Transport for StreamTransport {
    fn socket_type(&self) -> SocketType {
        SocketType::Stream
    }

    fn send_capacity(&self) -> usize {
        self.capacity
    }

    fn send(&mut self, data: Bytes) -> Result<(), SendError> {
        self.queue.push_back(data);
        Ok(())
    }
}

/// A [`Scheduler`] holding at most one timer, which is all a client session arms.
#[derive(Debug, Default)]
pub struct TokioScheduler {
    next_id: u64,
    pending: Option<(TimerId, Instant)>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The armed timer and its deadline.
    pub fn pending(&self) -> Option<(TimerId, Instant)> {
        self.pending
    }

    /// Disarms and returns the armed timer once it is due.
    pub fn take_due(&mut self, now: Instant) -> Option<TimerId> {
        match self.pending {
            Some((timer, deadline)) if deadline <= now => {
                self.pending = None;
                Some(timer)
            }
            _ => None,
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.next_id += 1;
        let timer = TimerId::new(self.next_id);
        let now = Instant::now();
        // roughly 30 years, the same horizon tokio uses for "never"
        let deadline = now.checked_add(delay).unwrap_or_else(|| now + Duration::from_secs(86400 * 365 * 30));
        self.pending = Some((timer, deadline));
        timer
    }

    fn cancel(&mut self, timer: TimerId) {
        if matches!(self.pending, Some((pending, _)) if pending == timer) {
            self.pending = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn scheduler_fires_once_and_cancels() {
        let mut scheduler = TokioScheduler::new();
        let timer = scheduler.schedule(Duration::from_secs(5));

        assert_eq!(scheduler.take_due(Instant::now()), None);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(scheduler.take_due(Instant::now()), Some(timer));
        assert_eq!(scheduler.take_due(Instant::now()), None);

        let timer = scheduler.schedule(Duration::from_secs(1));
        scheduler.cancel(TimerId::new(timer.get() + 1));
        assert!(scheduler.pending().is_some());
        scheduler.cancel(timer);
        assert!(scheduler.pending().is_none());
    }

    #[tokio::test]
    async fn queued_sends_reach_the_stream() {
        let (writer, mut reader) = tokio::io::duplex(64);
        let mut framed_write = FramedWrite::new(writer, BytesCodec::new());
        let mut transport = StreamTransport::new(64);

        transport.send(Bytes::from_static(b"GET ")).unwrap();
        transport.send(Bytes::from_static(b"main/object")).unwrap();
        assert_eq!(transport.send_capacity(), 64);
        transport.flush_into(&mut framed_write).await.unwrap();
        assert!(transport.is_empty());

        let mut buf = [0u8; 15];
        tokio::io::AsyncReadExt::read_exact(&mut reader, &mut buf).await.unwrap();
        assert_eq!(&buf, b"GET main/object");
    }
}
