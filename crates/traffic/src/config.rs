//! Client and server configuration.
//!
//! Plain structs passed at construction time. Distribution parameters live in
//! [`crate::traffic::TrafficConfig`].

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default port of the traffic server.
pub const DEFAULT_PORT: u16 = 80;

/// Default transport send-buffer size in bytes, used to cap a single response.
pub const DEFAULT_SEND_BUFFER_CAPACITY: usize = 128 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    pub remote_address: IpAddr,
    pub remote_port: u16,
    /// Seeds the reading time generator; `None` seeds from the thread rng.
    pub seed: Option<u64>,
}

impl ClientConfig {
    pub fn new(remote_address: IpAddr, remote_port: u16) -> Self {
        Self { remote_address, remote_port, seed: None }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn remote(&self) -> SocketAddr {
        SocketAddr::new(self.remote_address, self.remote_port)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Upper bound for one response, head and payload together.
    pub send_buffer_capacity: usize,
    /// Seeds the per-connection generators; `None` seeds from the thread rng.
    pub seed: Option<u64>,
}

impl ServerConfig {
    pub fn new(port: u16) -> Self {
        Self { port, send_buffer_capacity: DEFAULT_SEND_BUFFER_CAPACITY, seed: None }
    }

    #[must_use]
    pub fn with_send_buffer_capacity(mut self, capacity: usize) -> Self {
        self.send_buffer_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Wildcard address the server listens on.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let client = ClientConfig::default();
        assert_eq!(client.remote(), "127.0.0.1:80".parse::<SocketAddr>().unwrap());
        assert_eq!(client.seed, None);

        let server = ServerConfig::default().with_seed(3);
        assert_eq!(server.listen_addr(), "0.0.0.0:80".parse::<SocketAddr>().unwrap());
        assert_eq!(server.send_buffer_capacity, 131_072);
        assert_eq!(server.seed, Some(3));
    }
}
