use super::{check_deadline, wait_closed, Transport, TransportError};
use bytes::Bytes;
use std::net::SocketAddr;
use tokio::{
    sync::{mpsc, watch, Mutex},
    time::{self, Instant},
};

#[derive(Debug)]
struct Datagram {
    source: SocketAddr,
    payload: Bytes,
}

/// One end of an in-memory datagram link.
///
/// Every write lands in the peer's inbound queue tagged with this end's
/// local address, whatever destination was given. If the peer has been
/// dropped the datagram is silently lost, like UDP to an absent host.
pub struct MemoryTransport {
    local: SocketAddr,
    inbound_tx: mpsc::UnboundedSender<Datagram>,
    inbound: Mutex<mpsc::UnboundedReceiver<Datagram>>,
    peer: mpsc::UnboundedSender<Datagram>,
    closed: watch::Sender<bool>,
}

impl MemoryTransport {
    /// Creates two connected endpoints with the given local addresses.
    pub fn pair(a: SocketAddr, b: SocketAddr) -> (MemoryTransport, MemoryTransport) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();

        let end_a = MemoryTransport {
            local: a,
            inbound_tx: a_tx.clone(),
            inbound: Mutex::new(a_rx),
            peer: b_tx.clone(),
            closed: watch::Sender::new(false),
        };
        let end_b = MemoryTransport {
            local: b,
            inbound_tx: b_tx,
            inbound: Mutex::new(b_rx),
            peer: a_tx,
            closed: watch::Sender::new(false),
        };
        (end_a, end_b)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    /// Queues raw bytes on this end as if they had arrived from `source`.
    pub fn inject(&self, payload: impl Into<Bytes>, source: SocketAddr) {
        let datagram = Datagram {
            source,
            payload: payload.into(),
        };
        // The receiver lives as long as `self`, so this cannot fail.
        let _ = self.inbound_tx.send(datagram);
    }

    /// Number of datagrams waiting to be read.
    ///
    /// Returns zero while a read is in progress.
    pub fn queued(&self) -> usize {
        self.inbound.try_lock().map(|rx| rx.len()).unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

impl Transport for MemoryTransport {
    async fn recv_from(
        &self,
        buf: &mut [u8],
        deadline: Instant,
    ) -> Result<(usize, SocketAddr), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        check_deadline(deadline)?;

        let closed = self.closed.subscribe();
        let mut inbound = self.inbound.lock().await;

        tokio::select! {
            _ = wait_closed(closed) => Err(TransportError::Closed),
            received = time::timeout_at(deadline, inbound.recv()) => match received {
                Ok(Some(datagram)) => {
                    let len = datagram.payload.len().min(buf.len());
                    buf[..len].copy_from_slice(&datagram.payload[..len]);
                    Ok((len, datagram.source))
                }
                // We hold our own sender, so the queue never reports end-of-data.
                Ok(None) => Err(TransportError::Closed),
                Err(_) => Err(TransportError::Timeout),
            },
        }
    }

    async fn send_to(&self, buf: &[u8], _dest: SocketAddr) -> Result<usize, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let datagram = Datagram {
            source: self.local,
            payload: Bytes::copy_from_slice(buf),
        };
        if self.peer.send(datagram).is_err() {
            tracing::trace!("Peer of {} is gone, dropping datagram", self.local);
        }
        Ok(buf.len())
    }

    fn close(&self) {
        self.closed.send_replace(true);
    }
}
