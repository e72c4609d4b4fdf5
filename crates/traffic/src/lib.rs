//! Synthetic HTTP web traffic for network simulations
//!
//! This crate generates web-browsing traffic between a simulated client and server.
//! A client requests a main object (a page), learns from the response how many
//! inline objects (embedded resources) the page has, fetches each of them in turn,
//! then pauses for a sampled reading time before requesting the next page. Object
//! sizes, inline object counts and reading times follow empirically fitted
//! distributions.
//!
//! # Features
//!
//! - Delimiter framed wire format with an open-ended set of named header fields
//! - Client and server exchange state machines that reassemble messages split across
//!   any number of deliveries
//! - Event-driven core: the state machines never block and never own a socket or a
//!   timer, so they run equally well inside a discrete-event simulator or on tokio
//! - Reproducible runs through seeded random sources
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use micro_traffic::config::{ClientConfig, ServerConfig};
//! use micro_traffic::connection::{ClientConnection, serve};
//! use micro_traffic::traffic::{TrafficConfig, TrafficModel};
//! use tokio::net::TcpListener;
//! use tracing::{info, Level};
//! use tracing_subscriber::FmtSubscriber;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
//!     tracing::subscriber::set_global_default(subscriber)?;
//!
//!     let model = Arc::new(TrafficModel::new(TrafficConfig::default())?);
//!
//!     let server_config = ServerConfig::new(8080);
//!     let listener = TcpListener::bind(server_config.listen_addr()).await?;
//!     tokio::spawn(serve(listener, server_config, Arc::clone(&model), std::future::pending()));
//!
//!     let client_config = ClientConfig::new([127, 0, 0, 1].into(), 8080);
//!     let connection = ClientConnection::connect(client_config, model).await?;
//!     let session = connection.run(tokio::time::sleep(Duration::from_secs(60))).await?;
//!     info!(pages = session.pages_completed(), "done");
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! The crate is organized into several key modules:
//!
//! - [`protocol`]: Message types, well-known fields and the error taxonomy
//! - [`codec`]: Wire format encoding/decoding
//! - [`traffic`]: The traffic model and its distribution parameters
//! - [`transport`]: The [`Transport`](transport::Transport) and
//!   [`Scheduler`](transport::Scheduler) seams the state machines act through
//! - [`client`]: The client exchange state machine
//! - [`server`]: The server exchange state machine
//! - [`connection`]: Tokio adapters driving both state machines over real streams
//! - [`config`]: Client and server configuration
//!
//! # Error Handling
//!
//! - [`protocol::ParseError`]: Malformed or incomplete wire data
//! - [`protocol::SendError`]: The transport refused a message
//! - [`protocol::SessionError`]: State machine level failures, including framing
//!   desynchronization
//! - [`protocol::HttpError`]: Top-level error of the tokio adapters
//!
//! # Limitations
//!
//! - Maximum header size: 8KB
//! - Header field values cannot contain `:`
//! - Only reliable stream transports are supported

pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod traffic;
pub mod transport;

mod utils;
pub(crate) use utils::ensure;
