//! One traffic server and a few browsing clients on the loopback interface.
//!
//! ```text
//! cargo run --example client_server -- [clients] [seconds]
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use micro_traffic::config::{ClientConfig, ServerConfig};
use micro_traffic::connection::{ClientConnection, serve};
use micro_traffic::traffic::{TrafficConfig, TrafficModel};

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut args = std::env::args().skip(1);
    let clients: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(2);
    let seconds: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(20);

    let model = match TrafficModel::new(TrafficConfig::default()) {
        Ok(model) => Arc::new(model),
        Err(e) => {
            error!(cause = %e, "invalid traffic model");
            return;
        }
    };

    let server_config = ServerConfig::new(8080).with_seed(1);
    info!(port = server_config.port, "start listening");
    let tcp_listener = match TcpListener::bind((Ipv4Addr::LOCALHOST, server_config.port)).await {
        Ok(tcp_listener) => tcp_listener,
        Err(e) => {
            error!(cause = %e, "bind server error");
            return;
        }
    };

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(serve(tcp_listener, server_config, Arc::clone(&model), async move {
        let _ = stop_rx.await;
    }));

    let mut browsers = Vec::new();
    for id in 0..clients {
        let config = ClientConfig::new(IpAddr::V4(Ipv4Addr::LOCALHOST), server_config.port).with_seed(100 + id);
        let model = Arc::clone(&model);

        browsers.push(tokio::spawn(async move {
            let connection = match ClientConnection::connect(config, model).await {
                Ok(connection) => connection,
                Err(e) => {
                    error!(client = id, cause = %e, "connect error");
                    return;
                }
            };

            match connection.run(tokio::time::sleep(Duration::from_secs(seconds))).await {
                Ok(session) => info!(client = id, pages_completed = session.pages_completed(), "client finished"),
                Err(e) => error!(client = id, cause = %e, "client session failed"),
            }
        }));
    }

    for browser in browsers {
        if let Err(e) = browser.await {
            error!(cause = %e, "client task panicked");
        }
    }

    let _ = stop_tx.send(());
    if let Err(e) = server.await {
        error!(cause = %e, "server task panicked");
    }
}
