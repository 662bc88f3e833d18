//! DHCP exchange client
//!
//! This module drives one request/response exchange:
//! - transmission of the request to every destination
//! - the listening loop with per-attempt deadlines and retransmission
//! - delivery of correlated responses to the caller as they arrive
//!
//! One [`Client`] is meant to host one exchange at a time. Two concurrent
//! exchanges on the same transport would steal each other's datagrams unless
//! the transport itself fans reads out per caller.

use crate::{
    cancel::{cancellation, Cancellation},
    codec::{Packet, Xid},
    config::ClientConfig,
    correlation::{Correlator, Envelope, Response},
    error::ClientError,
    network::UdpTransport,
    retry::{AttemptState, RetryScheduler},
    transport::{Transport, TransportError},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{self, Instant},
};

/// Largest payload a UDP datagram over IPv4 can carry.
const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Pause after a failed read before trying again.
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(10);

pub struct ClientBuilder<T> {
    config: ClientConfig,
    transport: Option<T>,
}

impl<T: Transport> ClientBuilder<T> {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
        }
    }

    pub fn transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Client<T>, ClientError> {
        let transport = self.transport.ok_or(ClientError::MissingTransport)?;
        Client::new(transport, self.config)
    }
}

pub struct Client<T> {
    transport: Arc<T>,
    retries: u32,
    timeout: Duration,
    destinations: Vec<SocketAddr>,
    queue_capacity: usize,
}

/// Waits for the background worker of an exchange to exit.
#[derive(Debug)]
pub struct Completion {
    handle: JoinHandle<()>,
}

impl Completion {
    /// Returns once the worker can no longer touch the response stream or
    /// the error signal.
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            tracing::error!("Exchange worker failed: {}", e);
        }
    }
}

/// The three halves of a running exchange.
///
/// `responses` yields correlated replies in arrival order and closes when the
/// exchange ends. `errors` yields at most one value: the reason the exchange
/// failed. A closed stream with no error means success or cancellation.
///
/// The error, if any, is in place before the stream closes.
#[derive(Debug)]
pub struct Exchange<P> {
    pub completion: Completion,
    pub responses: mpsc::Receiver<Response<P>>,
    pub errors: oneshot::Receiver<ClientError>,
}

impl Client<UdpTransport> {
    /// Builds a client over a broadcast UDP socket on `config.client_port`,
    /// bound to `config.interface` when one is set.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = UdpTransport::bind(config.interface.as_deref(), config.client_port)?;
        tracing::info!(
            "Socket bound on port {} (interface: {})",
            config.client_port,
            config.interface.as_deref().unwrap_or("any")
        );
        Client::new(transport, config)
    }
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T, config: ClientConfig) -> Result<Self, ClientError> {
        if config.timeout.is_zero() {
            return Err(ClientError::InvalidTimeout);
        }
        Ok(Self {
            transport: Arc::new(transport),
            retries: config.retries,
            timeout: config.timeout,
            destinations: config.destinations,
            queue_capacity: config.queue_capacity.max(1),
        })
    }

    pub fn builder(config: ClientConfig) -> ClientBuilder<T> {
        ClientBuilder::new(config)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn destinations(&self) -> &[SocketAddr] {
        &self.destinations
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Closes the underlying transport, waking any pending read.
    pub fn close(&self) {
        self.transport.close();
    }

    /// Sends `request` to every destination and streams back each reply
    /// carrying the same xid until the exchange ends.
    ///
    /// The exchange ends when
    /// - an attempt window closes after at least one reply was delivered
    ///   (success, no error),
    /// - every attempt window closed empty (`ClientError::Timeout`),
    /// - no destination accepted the request (`ClientError::SendFailed`),
    /// - `cancel` fires (no error).
    ///
    /// Must be called from within a Tokio runtime.
    pub fn simple_send_and_read<P: Packet>(
        &self,
        cancel: Cancellation,
        destinations: &[SocketAddr],
        request: &P,
    ) -> Result<Exchange<P>, ClientError> {
        if destinations.is_empty() {
            return Err(ClientError::NoDestinations);
        }
        let payload = request.encode().map_err(ClientError::Encode)?;

        let (response_tx, response_rx) = mpsc::channel(self.queue_capacity);
        let (error_tx, error_rx) = oneshot::channel();

        let worker = Worker {
            transport: self.transport.clone(),
            destinations: destinations.to_vec(),
            payload,
            correlator: Correlator::new(request.xid()),
            scheduler: RetryScheduler::new(self.retries, self.timeout),
            cancel,
            responses: response_tx,
        };
        let handle = tokio::spawn(worker.run(error_tx));

        Ok(Exchange {
            completion: Completion { handle },
            responses: response_rx,
            errors: error_rx,
        })
    }

    /// Sends `request` to the configured destinations and returns the first
    /// correlated reply. Later replies are discarded.
    pub async fn send_and_read_one<P: Packet>(&self, request: &P) -> Result<P, ClientError> {
        let (handle, cancel) = cancellation();
        let Exchange {
            completion,
            mut responses,
            errors,
        } = self.simple_send_and_read(cancel, &self.destinations, request)?;

        let first = responses.recv().await;
        handle.cancel();
        while responses.recv().await.is_some() {}
        completion.wait().await;

        match first {
            Some(response) => {
                tracing::debug!(source = %response.source, "Received response");
                Ok(response.packet)
            }
            None => Err(errors.await.unwrap_or(ClientError::Interrupted)),
        }
    }
}

/// Why a listening window ended.
enum WindowEnd {
    Expired,
    Cancelled,
}

/// State owned by the background task of one exchange.
struct Worker<T, P> {
    transport: Arc<T>,
    destinations: Vec<SocketAddr>,
    payload: Vec<u8>,
    correlator: Correlator,
    scheduler: RetryScheduler,
    cancel: Cancellation,
    responses: mpsc::Sender<Response<P>>,
}

impl<T: Transport, P: Packet> Worker<T, P> {
    fn xid(&self) -> Xid {
        self.correlator.xid()
    }

    /// Runs the exchange, then signals its error. The response stream closes
    /// when `self` drops at the end, after the error is sent.
    async fn run(mut self, errors: oneshot::Sender<ClientError>) {
        if let Err(e) = self.exchange().await {
            let _ = errors.send(e);
        }
    }

    async fn exchange(&mut self) -> Result<(), ClientError> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            if self.cancel.is_cancelled() {
                self.scheduler.cancel();
                tracing::debug!(xid = %self.xid(), "Exchange cancelled before sending");
                return Ok(());
            }

            self.send_all().await?;
            let deadline = self.scheduler.sent(Instant::now());
            tracing::debug!(
                xid = %self.xid(),
                attempt = self.scheduler.transmissions(),
                "Waiting for responses until {:?}",
                deadline
            );

            match self.listen(&mut buf, deadline).await {
                WindowEnd::Cancelled => {
                    self.scheduler.cancel();
                    tracing::debug!(
                        xid = %self.xid(),
                        delivered = self.scheduler.delivered(),
                        "Exchange cancelled"
                    );
                    return Ok(());
                }
                WindowEnd::Expired => match self.scheduler.expired() {
                    AttemptState::Retrying => {
                        tracing::info!(
                            xid = %self.xid(),
                            remaining = self.scheduler.attempts_remaining(),
                            "Timeout waiting for response, retransmitting"
                        );
                        self.scheduler.retransmit();
                    }
                    AttemptState::TimedOut => {
                        tracing::debug!(xid = %self.xid(), "Retries exhausted");
                        return Err(ClientError::Timeout {
                            attempts: self.scheduler.transmissions(),
                        });
                    }
                    state => {
                        tracing::debug!(
                            xid = %self.xid(),
                            delivered = self.scheduler.delivered(),
                            "Exchange finished in state {:?}",
                            state
                        );
                        return Ok(());
                    }
                },
            }
        }
    }

    /// Transmits the request to every destination. Only a total failure is
    /// an error.
    async fn send_all(&self) -> Result<(), ClientError> {
        let mut delivered = 0;
        let mut last_error = None;

        for &dest in &self.destinations {
            match self.transport.send_to(&self.payload, dest).await {
                Ok(len) => {
                    tracing::debug!(xid = %self.xid(), "Sent {} bytes to {}", len, dest);
                    delivered += 1;
                }
                Err(e) => {
                    tracing::warn!(xid = %self.xid(), "Failed to send request to {}: {}", dest, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if delivered == 0 => Err(ClientError::SendFailed(e)),
            _ => Ok(()),
        }
    }

    /// Reads until the attempt deadline or cancellation, publishing every
    /// correlated response on the way.
    async fn listen(&mut self, buf: &mut [u8], deadline: Instant) -> WindowEnd {
        loop {
            if Instant::now() >= deadline {
                return WindowEnd::Expired;
            }

            let received = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return WindowEnd::Cancelled,
                received = self.transport.recv_from(buf, deadline) => received,
            };

            let (len, source) = match received {
                Ok(datagram) => datagram,
                Err(e) if e.is_timeout() => return WindowEnd::Expired,
                Err(TransportError::Io(e)) => {
                    tracing::warn!(xid = %self.xid(), "Transport read failed, retrying: {}", e);
                    let resume = (Instant::now() + READ_ERROR_BACKOFF).min(deadline);
                    if let WindowEnd::Cancelled = self.idle_until(resume).await {
                        return WindowEnd::Cancelled;
                    }
                    continue;
                }
                Err(e) => {
                    // Nothing more can be read in this window.
                    tracing::warn!(xid = %self.xid(), "Transport read failed: {}", e);
                    return self.idle_until(deadline).await;
                }
            };

            if len == buf.len() {
                tracing::trace!(
                    xid = %self.xid(),
                    source = %source,
                    "Datagram may have been truncated"
                );
            }

            let envelope = Envelope::<P>::decode(source, &buf[..len]);
            let Some(response) = self.correlator.correlate(envelope) else {
                continue;
            };

            tracing::debug!(xid = %self.xid(), source = %source, "Accepted response");
            self.scheduler.accepted();

            let published = tokio::select! {
                biased;
                sent = self.responses.send(response) => sent.is_ok(),
                _ = self.cancel.cancelled() => return WindowEnd::Cancelled,
            };
            if !published {
                tracing::debug!(xid = %self.xid(), "Response stream dropped by caller");
                return WindowEnd::Cancelled;
            }
        }
    }

    async fn idle_until(&self, deadline: Instant) -> WindowEnd {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => WindowEnd::Cancelled,
            _ = time::sleep_until(deadline) => WindowEnd::Expired,
        }
    }
}
