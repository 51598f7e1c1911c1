//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use echo_gate::{Server, ServerConfig, ServerError};

/// Upper bound for any single wait in these tests.
pub const WAIT: Duration = Duration::from_secs(5);

/// Start a server on an ephemeral port with the given connection cap.
pub async fn start_server(
    max_connections: usize,
) -> (Server, SocketAddr, JoinHandle<Result<(), ServerError>>) {
    let config = ServerConfig {
        max_connections,
        ..ServerConfig::with_address("127.0.0.1:0")
    };
    start_with_config(config).await
}

pub async fn start_with_config(
    config: ServerConfig,
) -> (Server, SocketAddr, JoinHandle<Result<(), ServerError>>) {
    let server = Server::new(config);
    let running = server.clone();
    let handle = tokio::spawn(async move { running.start().await });

    let addr = tokio::time::timeout(WAIT, server.listening())
        .await
        .expect("server did not start in time")
        .expect("server stopped before listening");
    (server, addr, handle)
}

/// Send `payload` and read back exactly as many bytes.
pub async fn echo_roundtrip(stream: &mut TcpStream, payload: &[u8]) -> Vec<u8> {
    stream.write_all(payload).await.unwrap();
    let mut back = vec![0u8; payload.len()];
    tokio::time::timeout(WAIT, stream.read_exact(&mut back))
        .await
        .expect("echo timed out")
        .unwrap();
    back
}

/// Connect and prove the connection was admitted by echoing a probe.
pub async fn connect_admitted(addr: SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    assert_eq!(echo_roundtrip(&mut stream, b"probe").await, b"probe");
    stream
}

/// Read until EOF or error, returning the bytes received.
pub async fn read_to_close(stream: &mut TcpStream) -> Vec<u8> {
    let mut received = Vec::new();
    let mut buf = [0u8; 256];
    loop {
        let read = tokio::time::timeout(WAIT, stream.read(&mut buf))
            .await
            .expect("server did not close the connection");
        match read {
            Ok(0) | Err(_) => return received,
            Ok(n) => received.extend_from_slice(&buf[..n]),
        }
    }
}

/// Poll until the server reports `expected` active connections.
pub async fn wait_for_active(server: &Server, expected: usize) {
    tokio::time::timeout(WAIT, async {
        while server.active_connections() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| {
        panic!(
            "active connections stuck at {}, expected {}",
            server.active_connections(),
            expected
        )
    });
}
