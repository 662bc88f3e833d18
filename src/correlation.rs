//! Matching inbound datagrams against the outstanding request.

use crate::codec::{CodecError, Packet, Xid};
use std::net::SocketAddr;

/// A received datagram after a decode attempt.
#[derive(Debug)]
pub struct Envelope<P> {
    pub source: SocketAddr,
    pub packet: Result<P, CodecError>,
}

impl<P: Packet> Envelope<P> {
    pub fn decode(source: SocketAddr, bytes: &[u8]) -> Self {
        Self {
            source,
            packet: P::decode(bytes),
        }
    }
}

/// A reply accepted for the current exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response<P> {
    pub source: SocketAddr,
    pub packet: P,
}

/// Accepts exactly the envelopes that decoded and carry the expected xid.
#[derive(Debug, Clone, Copy)]
pub struct Correlator {
    xid: Xid,
}

impl Correlator {
    pub fn new(xid: Xid) -> Self {
        Self { xid }
    }

    pub fn xid(&self) -> Xid {
        self.xid
    }

    pub fn accept<P: Packet>(&self, envelope: &Envelope<P>) -> bool {
        matches!(&envelope.packet, Ok(packet) if packet.xid() == self.xid)
    }

    /// Turns an envelope into a [`Response`], or drops it.
    pub fn correlate<P: Packet>(&self, envelope: Envelope<P>) -> Option<Response<P>> {
        if self.accept(&envelope) {
            let source = envelope.source;
            return envelope.packet.ok().map(|packet| Response { source, packet });
        }
        match &envelope.packet {
            Ok(packet) => {
                tracing::debug!(
                    source = %envelope.source,
                    "XID mismatch ({} != {}), ignoring packet",
                    packet.xid(),
                    self.xid
                );
            }
            Err(e) => {
                tracing::debug!(source = %envelope.source, "Discarding undecodable datagram: {}", e);
            }
        }
        None
    }
}
