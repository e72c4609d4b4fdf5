//! Client exchange state machine
//!
//! A [`ClientSession`] is one simulated browsing loop over one connection: it
//! fetches a main object, then every inline object the main object declared, then
//! idles for a sampled reading time and starts over.
//!
//! ```text
//! Idle -> AwaitingConnection -> AwaitingMainResponse -> AwaitingInlineResponse (N times)
//!                                   ^                          |
//!                                   +------ ReadingPause <-----+
//! ```
//!
//! `Closed` is reachable from every state. The session is driven entirely by an
//! external event source calling its `on_*` methods; it sends through a
//! [`Transport`](crate::transport::Transport) and arms its reading-time pause
//! through a [`Scheduler`](crate::transport::Scheduler).

mod session;
mod state;

pub use session::ClientSession;
pub use state::ClientState;
