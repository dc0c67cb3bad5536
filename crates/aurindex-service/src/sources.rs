//! Inbound price feeds.
//!
//! The daemon listens for newline-delimited JSON on a TCP socket; each
//! non-empty line is one price message. Every accepted connection gets its
//! own reader task, and all of them feed the single consumer queue, so the
//! pipeline stays one logical consumer no matter how many publishers
//! connect. A full queue backpressures the connection instead of dropping
//! lines.

use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Bind the intake listener and start accepting publishers. Returns the
/// bound address, which differs from `addr` when port 0 was requested.
pub async fn spawn_tcp_listener(
    addr: &str,
    sender: mpsc::Sender<Vec<u8>>,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    let handle = tokio::spawn(accept_loop(listener, sender));
    Ok((local_addr, handle))
}

async fn accept_loop(listener: TcpListener, sender: mpsc::Sender<Vec<u8>>) {
    while let Ok((stream, peer)) = listener.accept().await {
        info!(%peer, "price publisher connected");
        tokio::spawn(read_lines(stream, peer, sender.clone()));
    }
}

async fn read_lines(stream: TcpStream, peer: SocketAddr, sender: mpsc::Sender<Vec<u8>>) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if sender.send(line.as_bytes().to_vec()).await.is_err() {
                    // Consumer gone; nothing left to feed.
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                warn!(%peer, "price publisher read error: {err}");
                break;
            }
        }
    }
    info!(%peer, "price publisher disconnected");
}

#[cfg(test)]
mod tests {
    use aurindex_core::transport::{ChannelSource, PriceSource};
    use tokio::io::AsyncWriteExt;

    use super::*;

    #[tokio::test]
    async fn test_tcp_lines_reach_the_consumer_queue() {
        let (sender, mut source) = ChannelSource::pair("tcp-intake", 16);
        let (addr, listener) = spawn_tcp_listener("127.0.0.1:0", sender)
            .await
            .expect("listener must bind");

        let mut publisher = TcpStream::connect(addr).await.expect("connect must succeed");
        publisher
            .write_all(b"{\"symbol\": \"GOLD\"}\n\n{\"symbol\": \"BTC\"}\n")
            .await
            .expect("write must succeed");
        publisher.flush().await.expect("flush must succeed");

        let first = source.recv().await.expect("first frame expected");
        assert_eq!(first, b"{\"symbol\": \"GOLD\"}".to_vec());
        let second = source.recv().await.expect("second frame expected");
        assert_eq!(second, b"{\"symbol\": \"BTC\"}".to_vec());

        listener.abort();
    }

    #[tokio::test]
    async fn test_source_closes_when_all_publishers_and_listener_are_gone() {
        let (sender, mut source) = ChannelSource::pair("tcp-intake", 4);
        let (addr, listener) = spawn_tcp_listener("127.0.0.1:0", sender)
            .await
            .expect("listener must bind");

        {
            let mut publisher = TcpStream::connect(addr).await.expect("connect must succeed");
            publisher
                .write_all(b"{\"symbol\": \"OIL\"}\n")
                .await
                .expect("write must succeed");
        }

        assert!(source.recv().await.is_some());
        listener.abort();
        // The accept loop held the last sender clone besides per-connection
        // readers; once both are gone the source drains and closes.
        assert!(source.recv().await.is_none());
    }
}
