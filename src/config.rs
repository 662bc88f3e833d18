use clap::Parser;
use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    time::Duration,
};

pub const DHCP_CLIENT_PORT: u16 = 68;
pub const DHCP_SERVER_PORT: u16 = 67;

/// The limited broadcast address on the DHCP server port.
pub const DEFAULT_SERVERS: [SocketAddr; 1] = [SocketAddr::V4(SocketAddrV4::new(
    Ipv4Addr::BROADCAST,
    DHCP_SERVER_PORT,
))];

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The network interface to bind to (e.g., 'eth0', 'lo')
    #[arg(short, long)]
    pub interface: String,

    /// Hardware address to put in the request; read from sysfs when omitted
    #[arg(short, long)]
    pub mac: Option<String>,

    /// Additional transmissions after the first one
    #[arg(short, long, default_value_t = 3)]
    pub retries: u32,

    /// Seconds to listen for replies after each transmission
    #[arg(short, long, default_value_t = 5)]
    pub timeout_secs: u64,

    /// Server address to send to, repeatable (defaults to broadcast)
    #[arg(short, long = "server")]
    pub servers: Vec<SocketAddr>,
}

impl Args {
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::default()
            .with_interface(self.interface.clone())
            .with_retries(self.retries)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if !self.servers.is_empty() {
            config = config.with_destinations(self.servers.clone());
        }
        config
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Transmissions after the first one.
    pub retries: u32,
    /// Listening window after each transmission.
    pub timeout: Duration,
    /// Where requests go unless a call overrides it.
    pub destinations: Vec<SocketAddr>,
    /// Responses buffered between the worker and the caller.
    pub queue_capacity: usize,
    /// Device to pin the default UDP socket to.
    pub interface: Option<String>,
    pub client_port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            timeout: Duration::from_secs(5),
            destinations: DEFAULT_SERVERS.to_vec(),
            queue_capacity: 16,
            interface: None,
            client_port: DHCP_CLIENT_PORT,
        }
    }
}

impl ClientConfig {
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_destinations(mut self, destinations: Vec<SocketAddr>) -> Self {
        self.destinations = destinations;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    pub fn with_client_port(mut self, port: u16) -> Self {
        self.client_port = port;
        self
    }
}
