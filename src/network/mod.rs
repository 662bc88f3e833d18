use crate::transport::{check_deadline, wait_closed, Transport, TransportError};
use std::{
    io,
    net::{Ipv4Addr, SocketAddr, UdpSocket as StdUdpSocket},
};
use thiserror::Error;
use tokio::{
    net::UdpSocket as TokioUdpSocket,
    sync::watch,
    time::{self, Instant},
};

/// Defines all possible errors for socket operations.
#[derive(Error, Debug)]
pub enum SocketError {
    #[error("Failed to create a new socket")]
    CreateSocket(#[source] io::Error),

    #[error("Failed to enable broadcast on socket")]
    SetBroadcast(#[source] io::Error),

    #[error("Failed to set SO_BINDTODEVICE on interface '{interface}'")]
    BindToDevice {
        interface: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to bind socket to address")]
    BindSocket(#[source] io::Error),

    #[error("Failed to set SO_REUSEADDR on socket")]
    SetReuseAddress(#[source] io::Error),

    #[error("Failed to set socket to non-blocking mode")]
    SetNonBlocking(#[source] io::Error),

    #[error("Failed to convert socket to TokioUdpSocket")]
    ConvertToTokio(#[source] io::Error),

    #[error("Binding to a specific device is not implemented on this platform")]
    NotImplemented,
}

/// Creates a broadcast-capable `tokio::net::UdpSocket` on `0.0.0.0:port`,
/// optionally pinned to one network device.
///
/// Must be called from within a Tokio runtime.
pub fn new_broadcast_socket(
    interface: Option<&str>,
    port: u16,
) -> Result<TokioUdpSocket, SocketError> {
    use socket2::{Domain, Socket, Type};

    // Create a socket2 socket, which allows setting options before binding.
    let socket2 =
        Socket::new(Domain::IPV4, Type::DGRAM, None).map_err(SocketError::CreateSocket)?;

    // `SO_BROADCAST` is required to reach 255.255.255.255.
    socket2
        .set_broadcast(true)
        .map_err(SocketError::SetBroadcast)?;

    socket2
        .set_reuse_address(true)
        .map_err(SocketError::SetReuseAddress)?;

    if let Some(interface) = interface {
        bind_to_device(&socket2, interface)?;
    }

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    socket2.bind(&addr.into()).map_err(SocketError::BindSocket)?;

    // Convert to a standard socket, then into a Tokio socket.
    let std_socket: StdUdpSocket = socket2.into();
    std_socket
        .set_nonblocking(true)
        .map_err(SocketError::SetNonBlocking)?;
    TokioUdpSocket::from_std(std_socket).map_err(SocketError::ConvertToTokio)
}

#[cfg(target_os = "linux")]
fn bind_to_device(socket: &socket2::Socket, interface: &str) -> Result<(), SocketError> {
    use std::os::fd::AsRawFd;

    // Set `SO_BINDTODEVICE`. This is an unsafe raw syscall.
    // It is safe here because we use a valid file descriptor and correct parameters.
    let ret = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_BINDTODEVICE,
            interface.as_ptr() as *const libc::c_void,
            interface.len() as libc::socklen_t,
        )
    };
    if ret < 0 {
        return Err(SocketError::BindToDevice {
            interface: interface.to_string(),
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

/// Fallback for non-Linux systems where `SO_BINDTODEVICE` is not available.
#[cfg(not(target_os = "linux"))]
fn bind_to_device(_socket: &socket2::Socket, _interface: &str) -> Result<(), SocketError> {
    Err(SocketError::NotImplemented)
}

/// [`Transport`] over a real UDP socket.
pub struct UdpTransport {
    socket: TokioUdpSocket,
    closed: watch::Sender<bool>,
}

impl UdpTransport {
    pub fn new(socket: TokioUdpSocket) -> Self {
        Self {
            socket,
            closed: watch::Sender::new(false),
        }
    }

    /// Opens the conventional DHCP client socket, see [`new_broadcast_socket`].
    pub fn bind(interface: Option<&str>, port: u16) -> Result<Self, SocketError> {
        new_broadcast_socket(interface, port).map(Self::new)
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

impl Transport for UdpTransport {
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
        tokio::select! {
            _ = wait_closed(closed) => Err(TransportError::Closed),
            received = time::timeout_at(deadline, self.socket.recv_from(buf)) => match received {
                Ok(Ok((len, addr))) => {
                    tracing::trace!("Received {} bytes from {}", len, addr);
                    Ok((len, addr))
                }
                Ok(Err(e)) => Err(TransportError::Io(e)),
                Err(_) => Err(TransportError::Timeout),
            },
        }
    }

    async fn send_to(&self, buf: &[u8], dest: SocketAddr) -> Result<usize, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        Ok(self.socket.send_to(buf, dest).await?)
    }

    fn close(&self) {
        self.closed.send_replace(true);
    }
}
