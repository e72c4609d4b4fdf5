//! Tokio connection handling module
//!
//! The state machines in [`client`](crate::client) and [`server`](crate::server)
//! are pure event handlers. This module is the event source that drives them over
//! real async byte streams.
//!
//! # Components
//!
//! - [`ClientConnection`]: runs one [`ClientSession`](crate::client::ClientSession)
//!   over a stream, including the reading-time timer and a shutdown signal
//! - [`ServerConnection`]: runs one [`ServerSession`](crate::server::ServerSession)
//!   until its client disconnects
//! - [`serve`]: accept loop spawning one task per connection
//! - [`StreamTransport`] and [`TokioScheduler`]: the tokio implementations of the
//!   [`Transport`](crate::transport::Transport) and
//!   [`Scheduler`](crate::transport::Scheduler) seams

mod client_connection;
mod server_connection;
mod stream_transport;

pub use client_connection::ClientConnection;
pub use server_connection::{ServerConnection, serve};
pub use stream_transport::{StreamTransport, TokioScheduler};
