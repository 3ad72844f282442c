//! TCP listener with a connection cap.
//!
//! # Responsibilities
//! - Accept incoming TCP connections for axum
//! - Enforce `max_connections` via a semaphore
//! - Keep accepting after transient accept errors

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::net::connection::{ConnectionGuard, ConnectionTracker};

/// A TCP listener that limits concurrent connections.
///
/// When the limit is reached, `accept` waits until a connection closes.
pub struct BoundedListener {
    inner: TcpListener,
    limit: Option<Arc<Semaphore>>,
    tracker: ConnectionTracker,
}

impl BoundedListener {
    /// Wrap a bound listener. `max_connections == 0` means unlimited.
    pub fn new(inner: TcpListener, max_connections: usize, tracker: ConnectionTracker) -> Self {
        let limit = (max_connections > 0).then(|| Arc::new(Semaphore::new(max_connections)));
        Self {
            inner,
            limit,
            tracker,
        }
    }

    /// Free connection slots, `None` when unlimited.
    #[cfg(test)]
    fn available_permits(&self) -> Option<usize> {
        self.limit.as_ref().map(|limit| limit.available_permits())
    }

    async fn slot(&self) -> Option<OwnedSemaphorePermit> {
        let limit = self.limit.as_ref()?;
        Arc::clone(limit).acquire_owned().await.ok()
    }
}

impl axum::serve::Listener for BoundedListener {
    type Io = TrackedStream;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            // Backpressure before accept.
            let permit = self.slot().await;

            match self.inner.accept().await {
                Ok((stream, addr)) => {
                    let guard = self.tracker.track();
                    tracing::debug!(
                        peer_addr = %addr,
                        connection_id = %guard.id(),
                        "Connection accepted"
                    );
                    return (
                        TrackedStream {
                            inner: stream,
                            _guard: guard,
                            _permit: permit,
                        },
                        addr,
                    );
                }
                Err(e) if is_connection_error(&e) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Accept failed");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.inner.local_addr()
    }
}

fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

/// An accepted stream holding its connection slot until dropped.
pub struct TrackedStream {
    inner: TcpStream,
    _guard: ConnectionGuard,
    _permit: Option<OwnedSemaphorePermit>,
}

impl AsyncRead for TrackedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for TrackedStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::serve::Listener;

    #[tokio::test]
    async fn permits_are_held_per_connection() {
        let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let tracker = ConnectionTracker::new();
        let mut listener = BoundedListener::new(tcp, 2, tracker.clone());
        let addr = listener.local_addr().unwrap();

        let _client = TcpStream::connect(addr).await.unwrap();
        let (stream, _) = listener.accept().await;
        assert_eq!(listener.available_permits(), Some(1));
        assert_eq!(tracker.active_count(), 1);

        drop(stream);
        assert_eq!(listener.available_permits(), Some(2));
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn zero_means_unlimited() {
        let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let listener = BoundedListener::new(tcp, 0, ConnectionTracker::new());
        assert_eq!(listener.available_permits(), None);
    }
}
