//! DHCPv4 message helpers
//!
//! Builders for the requests a client hands to the exchange engine, plus
//! accessors for the few options callers inspect on replies. Lease handling
//! is left to the caller.

pub mod message;

#[cfg(test)]
mod tests;

pub use message::{
    build_discover, build_request, message_type, parse_mac_address, server_identifier,
};
