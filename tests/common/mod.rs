//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use blockweb::app::{BlockDispatcher, MemoryWorld};
use blockweb::config::ServerConfig;
use blockweb::http::{HttpServer, ServerError};
use blockweb::lifecycle::Shutdown;
use blockweb::net::Listener;

pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

type Served = Result<BlockDispatcher<MemoryWorld>, ServerError>;

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
    handle: JoinHandle<Served>,
}

impl TestServer {
    /// Stop the server and return its dispatcher for inspection.
    pub async fn stop(self) -> BlockDispatcher<MemoryWorld> {
        self.shutdown.trigger();
        tokio::time::timeout(CLIENT_TIMEOUT, self.handle)
            .await
            .expect("server did not stop")
            .expect("server task panicked")
            .expect("server failed")
    }
}

/// Start a server with the player at (1, 2, 3).
#[allow(dead_code)]
pub async fn start_server() -> TestServer {
    start_server_with(|_| {}).await
}

/// Start a server after letting the caller adjust the configuration.
pub async fn start_server_with(tweak: impl FnOnce(&mut ServerConfig)) -> TestServer {
    let mut config = ServerConfig::default();
    config.app.player_position = [1, 2, 3];
    tweak(&mut config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let world = MemoryWorld::new(config.app.player_position.into(), config.app.max_fill_volume);
    let dispatcher = BlockDispatcher::new(&config.app.path_prefix, world);
    let server = HttpServer::new(&config, dispatcher);

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    let handle = tokio::spawn(server.run(Listener::from_tokio(listener), signal));

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// Send raw request bytes and read until the server closes.
#[allow(dead_code)]
pub async fn exchange(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    tokio::time::timeout(CLIENT_TIMEOUT, stream.read_to_string(&mut response))
        .await
        .expect("server did not close the connection")
        .unwrap();
    response
}

/// Build a POST whose declared length covers the body plus its final newline.
#[allow(dead_code)]
pub fn post_request(path: &str, body: &str) -> String {
    format!(
        "POST {} HTTP/1.0\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}\n",
        path,
        body.len() + 1,
        body
    )
}
