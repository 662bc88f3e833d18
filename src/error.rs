use crate::{codec::CodecError, network::SocketError, transport::TransportError};
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("No transport configured for the client")]
    MissingTransport,

    #[error("Per-attempt timeout must be greater than zero")]
    InvalidTimeout,

    #[error("At least one destination address is required")]
    NoDestinations,

    #[error("Failed to encode request packet")]
    Encode(#[source] CodecError),

    #[error("Request could not be sent to any destination")]
    SendFailed(#[source] TransportError),

    #[error("No response after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    #[error("Exchange ended without a response or an error")]
    Interrupted,

    #[error("Socket operation failed")]
    Socket(#[from] SocketError),

    #[error("I/O error")]
    Io(#[from] io::Error),
}

impl ClientError {
    /// Whether this is the retries-exhausted terminal signal.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout { .. })
    }
}
