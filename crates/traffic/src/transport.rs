//! The seams between the exchange state machines and the outside world.
//!
//! The state machines never own a socket or a timer. Every transition is a plain
//! method call made by an event source, and every side effect goes through one of
//! the two traits here:
//!
//! - [`Transport`]: an ordered, reliable, connection-oriented byte stream with no
//!   message framing of its own
//! - [`Scheduler`]: one-shot, cancelable timers
//!
//! The tokio adapters in [`crate::connection`] implement both over real streams;
//! tests implement them with plain vectors.

use std::time::Duration;

use bytes::Bytes;

use crate::ensure;
use crate::protocol::{SendError, SessionError};

/// The delivery semantics a transport offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketType {
    /// Ordered, reliable byte stream (tcp).
    Stream,
    /// Ordered, reliable, record preserving.
    SeqPacket,
    /// Unordered, unreliable datagrams (udp).
    Datagram,
}

impl SocketType {
    /// Whether the traffic protocol can run on this transport.
    pub fn is_reliable_stream(self) -> bool {
        matches!(self, SocketType::Stream | SocketType::SeqPacket)
    }
}

pub trait Transport {
    fn socket_type(&self) -> SocketType {
        SocketType::Stream
    }

    /// Bytes the transport can currently accept in one send.
    fn send_capacity(&self) -> usize;

    /// Queues `data` for delivery. Splitting it into segments is the transport's job.
    fn send(&mut self, data: Bytes) -> Result<(), SendError>;
}

/// Identifies one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl TimerId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

pub trait Scheduler {
    /// Arms a one-shot timer. When it fires, the event source calls back into the
    /// session that scheduled it with the returned id.
    fn schedule(&mut self, delay: Duration) -> TimerId;

    /// Disarms a timer. Cancelling a timer that already fired is a no-op.
    fn cancel(&mut self, timer: TimerId);
}

/// Fails with `IncompatibleTransport` unless the transport is a reliable stream.
pub fn ensure_reliable<T: Transport + ?Sized>(transport: &T) -> Result<(), SessionError> {
    let socket_type = transport.socket_type();
    ensure!(socket_type.is_reliable_stream(), SessionError::IncompatibleTransport { socket_type });
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Records everything sent through it.
    #[derive(Debug)]
    pub(crate) struct RecordingTransport {
        pub(crate) socket_type: SocketType,
        pub(crate) capacity: usize,
        pub(crate) sent: Vec<Bytes>,
    }

    impl RecordingTransport {
        pub(crate) fn new(capacity: usize) -> Self {
            Self { socket_type: SocketType::Stream, capacity, sent: Vec::new() }
        }

        pub(crate) fn datagram() -> Self {
            Self { socket_type: SocketType::Datagram, ..Self::new(0) }
        }

        pub(crate) fn take_sent(&mut self) -> Vec<Bytes> {
            std::mem::take(&mut self.sent)
        }
    }

    impl Transport for RecordingTransport {
        fn socket_type(&self) -> SocketType {
            self.socket_type
        }

        fn send_capacity(&self) -> usize {
            self.capacity
        }

        fn send(&mut self, data: Bytes) -> Result<(), SendError> {
            self.sent.push(data);
            Ok(())
        }
    }

    /// Keeps armed timers until the test fires them by hand.
    #[derive(Debug, Default)]
    pub(crate) struct ManualScheduler {
        next_id: u64,
        pub(crate) armed: Vec<(TimerId, Duration)>,
        pub(crate) cancelled: Vec<TimerId>,
    }

    impl Scheduler for ManualScheduler {
        fn schedule(&mut self, delay: Duration) -> TimerId {
            self.next_id += 1;
            let id = TimerId::new(self.next_id);
            self.armed.push((id, delay));
            id
        }

        fn cancel(&mut self, timer: TimerId) {
            self.armed.retain(|(id, _)| *id != timer);
            self.cancelled.push(timer);
        }
    }

    impl ManualScheduler {
        /// Removes and returns the earliest armed timer.
        pub(crate) fn fire_next(&mut self) -> Option<(TimerId, Duration)> {
            if self.armed.is_empty() { None } else { Some(self.armed.remove(0)) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingTransport;
    use super::*;

    #[test]
    fn only_reliable_streams_are_compatible() {
        assert!(SocketType::Stream.is_reliable_stream());
        assert!(SocketType::SeqPacket.is_reliable_stream());
        assert!(!SocketType::Datagram.is_reliable_stream());

        assert!(ensure_reliable(&RecordingTransport::new(16)).is_ok());
        assert!(matches!(
            ensure_reliable(&RecordingTransport::datagram()),
            Err(SessionError::IncompatibleTransport { socket_type: SocketType::Datagram })
        ));
    }
}
