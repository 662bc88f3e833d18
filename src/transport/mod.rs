//! Packet-oriented transport abstraction
//!
//! The exchange engine talks to the network only through [`Transport`]. Two
//! implementations ship with the crate:
//! - [`crate::network::UdpTransport`], a broadcast-capable UDP socket
//! - [`MemoryTransport`], an in-process datagram link used by tests and
//!   simulations

mod memory;

pub use memory::MemoryTransport;

use std::{future::Future, io, net::SocketAddr, sync::Arc};
use thiserror::Error;
use tokio::{sync::watch, time::Instant};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Read deadline elapsed without data")]
    Timeout,

    #[error("Read deadline is already in the past")]
    DeadlineInPast,

    #[error("Transport is closed")]
    Closed,

    #[error("Transport I/O error")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// True for both flavours of deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout | TransportError::DeadlineInPast)
    }
}

/// A duplex datagram channel.
///
/// Implementations must keep these rules so they can be swapped freely:
/// - `recv_from` rejects a deadline that has already elapsed with
///   [`TransportError::DeadlineInPast`], and returns [`TransportError::Timeout`]
///   when it elapses while waiting.
/// - After `close`, pending and future reads return [`TransportError::Closed`]
///   and writes fail with [`TransportError::Closed`].
/// - Both futures are cancel-safe: dropping a pending `recv_from` loses no
///   datagram.
pub trait Transport: Send + Sync + 'static {
    fn recv_from(
        &self,
        buf: &mut [u8],
        deadline: Instant,
    ) -> impl Future<Output = Result<(usize, SocketAddr), TransportError>> + Send;

    fn send_to(
        &self,
        buf: &[u8],
        dest: SocketAddr,
    ) -> impl Future<Output = Result<usize, TransportError>> + Send;

    fn close(&self);
}

impl<T: Transport> Transport for Arc<T> {
    fn recv_from(
        &self,
        buf: &mut [u8],
        deadline: Instant,
    ) -> impl Future<Output = Result<(usize, SocketAddr), TransportError>> + Send {
        (**self).recv_from(buf, deadline)
    }

    fn send_to(
        &self,
        buf: &[u8],
        dest: SocketAddr,
    ) -> impl Future<Output = Result<usize, TransportError>> + Send {
        (**self).send_to(buf, dest)
    }

    fn close(&self) {
        (**self).close()
    }
}

/// Rejects deadlines that are not strictly in the future.
pub fn check_deadline(deadline: Instant) -> Result<(), TransportError> {
    if deadline <= Instant::now() {
        return Err(TransportError::DeadlineInPast);
    }
    Ok(())
}

/// Resolves once the close flag is raised (or its owner is gone).
pub(crate) async fn wait_closed(mut closed: watch::Receiver<bool>) {
    loop {
        let is_closed = *closed.borrow_and_update();
        if is_closed || closed.changed().await.is_err() {
            return;
        }
    }
}
