//! Per-connection handling
//!
//! A connection starts in request mode: one JSON request per line, one JSON
//! response per line. A `subscribe` request switches it to stream mode for
//! the rest of its life, where the server writes one [`NewFrameEvent`] per
//! line until the peer disconnects or the session times out.
//!
//! [`NewFrameEvent`]: crate::frame::NewFrameEvent

use std::net::SocketAddr;

use bytes::{BufMut, BytesMut};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::error::{Error, Result};
use crate::server::config::ServerConfig;
use crate::server::request::{execute, Reply, Request, Response};
use crate::store::{AccessCoordinator, FrameNotifier, StoreError, Subscription};

/// Stable subscriber id for a peer: hex SHA-256 of its address
///
/// Two observers behind the same address collide; the second one is refused.
pub fn subscriber_id(peer_addr: &SocketAddr) -> String {
    hex::encode(Sha256::digest(peer_addr.to_string().as_bytes()))
}

/// One client connection
pub(crate) struct Session {
    id: u64,
    peer_addr: SocketAddr,
    config: ServerConfig,
    coordinator: AccessCoordinator,
}

impl Session {
    pub(crate) fn new(
        id: u64,
        peer_addr: SocketAddr,
        config: ServerConfig,
        coordinator: AccessCoordinator,
    ) -> Self {
        Self {
            id,
            peer_addr,
            config,
            coordinator,
        }
    }

    /// Serve the connection until it closes
    pub(crate) async fn run(self, socket: TcpStream) -> Result<()> {
        let (read_half, mut writer) = socket.into_split();
        let mut reader = BufReader::new(read_half);
        let mut line = Vec::new();

        loop {
            let read = tokio::time::timeout(
                self.config.idle_timeout,
                read_line(&mut reader, &mut line, self.config.max_line_length),
            )
            .await;

            let n = match read {
                Ok(Ok(n)) => n,
                Ok(Err(Error::LineTooLong(limit))) => {
                    let response = Response::bad_request(format!("line exceeds {} bytes", limit));
                    self.write_json(&mut writer, &response).await?;
                    return Err(Error::LineTooLong(limit));
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    tracing::debug!(session_id = self.id, "Idle timeout");
                    return Ok(());
                }
            };
            if n == 0 {
                return Ok(());
            }

            let text = line.trim_ascii();
            if text.is_empty() {
                continue;
            }

            let response = match serde_json::from_slice::<Request>(text) {
                Ok(Request::Subscribe) => return self.stream(reader, writer).await,
                Ok(request) => execute(&self.coordinator, request).await,
                Err(e) => {
                    tracing::debug!(session_id = self.id, error = %e, "Bad request");
                    Response::bad_request(e.to_string())
                }
            };

            self.write_json(&mut writer, &response).await?;
        }
    }

    /// Register as a subscriber and forward events until the session ends
    async fn stream(
        self,
        mut reader: BufReader<OwnedReadHalf>,
        mut writer: OwnedWriteHalf,
    ) -> Result<()> {
        let subscriber = subscriber_id(&self.peer_addr);

        let registered = self.coordinator.acquire().await.notify(&subscriber);
        let mut subscription = match registered {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::debug!(session_id = self.id, error = %e, "Subscribe refused");
                let response = Response::from(StoreError::from(e));
                return self.write_json(&mut writer, &response).await;
            }
        };

        tracing::info!(
            session_id = self.id,
            peer = %self.peer_addr,
            subscriber = %subscriber,
            "Streaming new frames"
        );

        let result = self
            .forward(&mut subscription, &mut reader, &mut writer)
            .await;

        // Close the queue first so a broadcast waiting on it can finish
        drop(subscription);
        if let Err(e) = self.coordinator.acquire().await.un_notify(&subscriber) {
            tracing::debug!(session_id = self.id, error = %e, "Unsubscribe");
        }

        result
    }

    async fn forward(
        &self,
        subscription: &mut Subscription,
        reader: &mut BufReader<OwnedReadHalf>,
        writer: &mut OwnedWriteHalf,
    ) -> Result<()> {
        let reply = Reply::Subscribed {
            subscriber: subscription.id().to_string(),
        };
        self.write_json(writer, &Response::Ok(reply)).await?;

        let expiry = tokio::time::sleep(self.config.idle_timeout);
        tokio::pin!(expiry);
        let mut scratch = [0u8; 512];

        loop {
            tokio::select! {
                event = subscription.recv() => match event {
                    Some(event) => self.write_json(writer, &event).await?,
                    None => return Ok(()),
                },
                read = reader.read(&mut scratch) => match read {
                    Ok(0) | Err(_) => return Ok(()),
                    Ok(_) => {}
                },
                _ = &mut expiry => {
                    tracing::debug!(session_id = self.id, "Subscription expired");
                    return Ok(());
                }
            }
        }
    }

    async fn write_json<T: Serialize>(&self, writer: &mut OwnedWriteHalf, value: &T) -> Result<()> {
        let mut out = BytesMut::with_capacity(256).writer();
        serde_json::to_writer(&mut out, value)?;
        let mut buf = out.into_inner();
        buf.put_u8(b'\n');

        tokio::time::timeout(self.config.write_timeout, writer.write_all(&buf))
            .await
            .map_err(|_| Error::WriteTimeout)??;
        Ok(())
    }
}

/// Read one `\n`-terminated line of at most `limit` bytes; 0 means EOF
async fn read_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    limit: usize,
) -> Result<usize> {
    buf.clear();
    let n = (&mut *reader)
        .take(limit as u64 + 1)
        .read_until(b'\n', buf)
        .await?;

    if !buf.ends_with(b"\n") && buf.len() > limit {
        return Err(Error::LineTooLong(limit));
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_id_is_stable() {
        let a: SocketAddr = "192.168.1.10:50000".parse().unwrap();
        let b: SocketAddr = "192.168.1.10:50001".parse().unwrap();

        assert_eq!(subscriber_id(&a), subscriber_id(&a));
        assert_ne!(subscriber_id(&a), subscriber_id(&b));
        assert_eq!(subscriber_id(&a).len(), 64);
    }

    #[tokio::test]
    async fn test_read_line_limits() {
        let mut input: &[u8] = b"{\"op\":\"stats\"}\nabcdefghijklmnop\n";
        let mut buf = Vec::new();

        let n = read_line(&mut input, &mut buf, 16).await.unwrap();
        assert_eq!(n, 15);
        assert_eq!(buf.trim_ascii(), b"{\"op\":\"stats\"}");

        let err = read_line(&mut input, &mut buf, 8).await.unwrap_err();
        assert!(matches!(err, Error::LineTooLong(8)));
    }

    #[tokio::test]
    async fn test_read_line_across_segments() {
        let mock = tokio_test::io::Builder::new()
            .read(b"{\"op\":")
            .read(b"\"collectors\"}\n")
            .build();
        let mut reader = BufReader::new(mock);
        let mut buf = Vec::new();

        let n = read_line(&mut reader, &mut buf, 64).await.unwrap();
        assert_eq!(n, 20);
        let request: Request = serde_json::from_slice(buf.trim_ascii()).unwrap();
        assert_eq!(request, Request::Collectors);
    }

    #[tokio::test]
    async fn test_read_line_eof() {
        let mut input: &[u8] = b"";
        let mut buf = Vec::new();

        assert_eq!(read_line(&mut input, &mut buf, 16).await.unwrap(), 0);
    }
}
