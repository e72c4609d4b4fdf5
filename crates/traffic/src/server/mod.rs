//! Server exchange state machine
//!
//! A [`ServerSession`] answers every request on one accepted connection. The
//! response to a request depends only on its url and fresh draws from the shared
//! [`TrafficModel`](crate::traffic::TrafficModel); nothing is remembered between
//! requests beyond bytes of a request that has not fully arrived yet.

mod session;

pub use session::ServerSession;
