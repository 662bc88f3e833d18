#![allow(dead_code)]

use dhcp_exchange::{
    Client, ClientConfig, ClientError, Exchange, MemoryTransport, Packet, Response, Transport,
    TransportError, Xid,
};
use dhcproto::v4;
use std::{
    collections::VecDeque,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::time::Instant;

pub const TIMEOUT: Duration = Duration::from_secs(1);

pub fn client_addr() -> SocketAddr {
    "0.0.0.0:68".parse().unwrap()
}

pub fn server_addr() -> SocketAddr {
    "192.168.1.1:67".parse().unwrap()
}

pub fn request(xid: [u8; 4]) -> v4::Message {
    let mut msg = v4::Message::default();
    msg.set_opcode(v4::Opcode::BootRequest).set_xid(Xid(xid).as_u32());
    msg
}

pub fn reply(xid: [u8; 4]) -> v4::Message {
    tagged_reply(xid, 0)
}

/// A reply made distinguishable from its siblings through the `secs` field.
pub fn tagged_reply(xid: [u8; 4], tag: u16) -> v4::Message {
    let mut msg = v4::Message::default();
    msg.set_opcode(v4::Opcode::BootReply)
        .set_xid(Xid(xid).as_u32())
        .set_secs(tag);
    msg
}

/// Compares two packets by their wire form.
pub fn assert_same_packet(got: &v4::Message, want: &v4::Message) {
    assert_eq!(
        Packet::encode(got).unwrap(),
        Packet::encode(want).unwrap(),
        "packet got {:?}, want {:?}",
        got,
        want
    );
}

/// A fake DHCP server on the far end of a memory link.
///
/// The n-th request it receives is answered with the n-th entry of its
/// script; once the script runs out requests are recorded but ignored.
pub struct Responder {
    received: Arc<Mutex<Vec<v4::Message>>>,
}

impl Responder {
    pub fn spawn(server: MemoryTransport, script: Vec<Vec<v4::Message>>) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = received.clone();
        let mut script: VecDeque<_> = script.into();

        tokio::spawn(async move {
            let mut buf = [0u8; 1500];
            loop {
                let deadline = Instant::now() + Duration::from_secs(3600);
                let (len, source) = match server.recv_from(&mut buf, deadline).await {
                    Ok(datagram) => datagram,
                    Err(TransportError::Timeout) => continue,
                    Err(_) => break,
                };

                let request = <v4::Message as Packet>::decode(&buf[..len])
                    .expect("client sent an invalid DHCP packet");
                log.lock().unwrap().push(request);

                for resp in script.pop_front().unwrap_or_default() {
                    let bytes = Packet::encode(&resp).unwrap();
                    server.send_to(&bytes, source).await.unwrap();
                }
            }
        });

        Self { received }
    }

    /// Number of requests seen so far.
    pub fn transmissions(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    pub fn received(&self) -> Vec<v4::Message> {
        self.received.lock().unwrap().clone()
    }
}

/// A client with `retries` retries on one end of a memory link and a
/// scripted responder on the other.
pub fn serve_and_client(
    retries: u32,
    script: Vec<Vec<v4::Message>>,
) -> (Client<MemoryTransport>, Responder) {
    serve_and_client_with(ClientConfig::default().with_retries(retries), script)
}

pub fn serve_and_client_with(
    config: ClientConfig,
    script: Vec<Vec<v4::Message>>,
) -> (Client<MemoryTransport>, Responder) {
    let (client_end, server_end) = MemoryTransport::pair(client_addr(), server_addr());
    let client = Client::builder(config.with_timeout(TIMEOUT))
        .transport(client_end)
        .build()
        .unwrap();
    (client, Responder::spawn(server_end, script))
}

/// Drains an exchange to the end.
pub async fn collect<P>(exchange: Exchange<P>) -> (Vec<Response<P>>, Option<ClientError>) {
    let Exchange {
        completion,
        mut responses,
        errors,
    } = exchange;

    let mut received = Vec::new();
    while let Some(response) = responses.recv().await {
        received.push(response);
    }
    completion.wait().await;
    (received, errors.await.ok())
}
