//! Packet codec boundary
//!
//! The engine never looks inside a DHCP packet except for its transaction
//! identifier. Everything else is delegated to a [`Packet`] implementation;
//! the crate ships one for [`dhcproto::v4::Message`].

use dhcproto::{v4, Decodable, Decoder, Encodable, Encoder};
use std::{error::Error as StdError, fmt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to encode packet")]
    Encode(#[source] Box<dyn StdError + Send + Sync>),

    #[error("Failed to decode packet")]
    Decode(#[source] Box<dyn StdError + Send + Sync>),
}

/// A DHCPv4 transaction identifier.
///
/// Four opaque bytes in network order. Replies are correlated with their
/// request by comparing this value and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Xid(pub [u8; 4]);

impl Xid {
    pub fn random() -> Self {
        Xid(rand::random())
    }

    pub fn as_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }
}

impl From<u32> for Xid {
    fn from(value: u32) -> Self {
        Xid(value.to_be_bytes())
    }
}

impl From<[u8; 4]> for Xid {
    fn from(bytes: [u8; 4]) -> Self {
        Xid(bytes)
    }
}

impl From<Xid> for u32 {
    fn from(xid: Xid) -> Self {
        xid.as_u32()
    }
}

impl fmt::Display for Xid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.as_u32())
    }
}

/// What the engine needs from a packet type: its xid and a wire form.
///
/// `decode` must reject malformed input outright (a truncated header is an
/// error, never a partially filled packet).
pub trait Packet: Sized + Send + 'static {
    fn xid(&self) -> Xid;

    fn encode(&self) -> Result<Vec<u8>, CodecError>;

    fn decode(bytes: &[u8]) -> Result<Self, CodecError>;
}

impl Packet for v4::Message {
    fn xid(&self) -> Xid {
        Xid::from(v4::Message::xid(self))
    }

    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut buffer = Vec::new();
        let mut encoder = Encoder::new(&mut buffer);
        Encodable::encode(self, &mut encoder).map_err(|e| CodecError::Encode(Box::new(e)))?;
        Ok(buffer)
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        <v4::Message as Decodable>::decode(&mut Decoder::new(bytes))
            .map_err(|e| CodecError::Decode(Box::new(e)))
    }
}
