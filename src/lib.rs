//! # dhcp-exchange - the transport engine of a DHCPv4 client
//!
//! This crate sends a DHCP packet to one or more servers over an unreliable
//! datagram transport, listens for replies carrying the same transaction
//! identifier, retransmits on timeout and streams every matching reply back to
//! the caller as it arrives. Malformed datagrams and foreign traffic are
//! dropped silently.
//!
//! ## Features
//!
//! - Streaming multi-response exchanges and a single-response convenience call
//! - Fixed per-attempt timeout with a bounded retry count
//! - Cooperative cancellation with bounded latency
//! - Pluggable transports: broadcast UDP sockets and an in-memory link
//!
//! ## Example
//!
//! ```rust,no_run
//! use dhcp_exchange::{cancellation, v4, Client, ClientConfig, Exchange, Xid};
//! use bytes::Bytes;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mac_addr = Bytes::from_static(&[0x00, 0x0c, 0x29, 0xa8, 0x92, 0xf4]);
//!     let client = Client::bind(ClientConfig::default().with_interface("eth0"))?;
//!
//!     let discover = v4::build_discover(&mac_addr, Xid::random());
//!     let (_handle, cancel) = cancellation();
//!     let Exchange { completion, mut responses, errors } =
//!         client.simple_send_and_read(cancel, client.destinations(), &discover)?;
//!
//!     while let Some(offer) = responses.recv().await {
//!         println!("Offer from {}: {}", offer.source, offer.packet.yiaddr());
//!     }
//!     completion.wait().await;
//!     if let Ok(err) = errors.await {
//!         return Err(err.into());
//!     }
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod client;
pub mod codec;
pub mod config;
pub mod correlation;
pub mod error;
pub mod network;
pub mod retry;
pub mod transport;
pub mod v4;

pub use cancel::{cancellation, CancelHandle, Cancellation};
pub use client::{Client, ClientBuilder, Completion, Exchange};
pub use codec::{CodecError, Packet, Xid};
pub use config::{Args, ClientConfig, DEFAULT_SERVERS};
pub use correlation::{Correlator, Envelope, Response};
pub use error::ClientError;
pub use network::{SocketError, UdpTransport};
pub use transport::{MemoryTransport, Transport, TransportError};
