use crate::codec::Xid;
use bytes::{BufMut as _, Bytes, BytesMut};
use dhcproto::v4::{self, OptionCode};
use std::{net::Ipv4Addr, num::ParseIntError};

/// Parses a MAC address string (e.g., "0a:1b:2c:3d:4e:5f") into a `Bytes` object.
pub fn parse_mac_address(mac_str: &str) -> Result<Bytes, ParseIntError> {
    let mut bytes = BytesMut::new();
    for byte_str in mac_str.split(':') {
        if !byte_str.is_empty() {
            let byte = u8::from_str_radix(byte_str, 16)?;
            bytes.put_u8(byte);
        }
    }
    Ok(bytes.freeze())
}

/// Client Identifier (option 61): htype Ethernet followed by the MAC address.
fn client_identifier(mac_addr: &Bytes) -> v4::DhcpOption {
    let mut client_id_data = BytesMut::new();
    client_id_data.put_u8(1);
    client_id_data.extend_from_slice(mac_addr);
    v4::DhcpOption::ClientIdentifier(client_id_data.freeze().to_vec())
}

fn parameter_request_list() -> v4::DhcpOption {
    v4::DhcpOption::ParameterRequestList(vec![
        OptionCode::SubnetMask,       // 1
        OptionCode::Router,           // 3
        OptionCode::DomainNameServer, // 6
        OptionCode::DomainName,       // 15
    ])
}

/// A broadcast BOOTREQUEST skeleton carrying `xid`.
fn base_request(mac_addr: &Bytes, xid: Xid) -> v4::Message {
    let mut msg = v4::Message::default();
    msg.set_opcode(v4::Opcode::BootRequest)
        .set_chaddr(mac_addr)
        .set_htype(v4::HType::Eth)
        .set_hops(0)
        .set_xid(xid.as_u32())
        .set_secs(0)
        .set_flags(v4::Flags::default().set_broadcast());
    msg
}

/// Constructs a DHCP Discover message.
pub fn build_discover(mac_addr: &Bytes, xid: Xid) -> v4::Message {
    let mut msg = base_request(mac_addr, xid);
    msg.opts_mut()
        .insert(v4::DhcpOption::MessageType(v4::MessageType::Discover));
    msg.opts_mut().insert(client_identifier(mac_addr));
    msg.opts_mut().insert(parameter_request_list());
    msg
}

/// Constructs a DHCP Request for an offered address.
pub fn build_request(
    mac_addr: &Bytes,
    xid: Xid,
    offered_ip: Ipv4Addr,
    server_ip: Ipv4Addr,
) -> v4::Message {
    let mut msg = base_request(mac_addr, xid);
    msg.set_ciaddr(Ipv4Addr::UNSPECIFIED);
    msg.opts_mut()
        .insert(v4::DhcpOption::MessageType(v4::MessageType::Request));
    msg.opts_mut()
        .insert(v4::DhcpOption::RequestedIpAddress(offered_ip));
    msg.opts_mut()
        .insert(v4::DhcpOption::ServerIdentifier(server_ip));
    msg.opts_mut().insert(client_identifier(mac_addr));
    msg.opts_mut().insert(parameter_request_list());
    msg
}

/// The DHCP Message Type (option 53), if present.
pub fn message_type(msg: &v4::Message) -> Option<v4::MessageType> {
    match msg.opts().get(OptionCode::MessageType) {
        Some(v4::DhcpOption::MessageType(kind)) => Some(*kind),
        _ => None,
    }
}

/// The Server Identifier (option 54), if present.
pub fn server_identifier(msg: &v4::Message) -> Option<Ipv4Addr> {
    match msg.opts().get(OptionCode::ServerIdentifier) {
        Some(v4::DhcpOption::ServerIdentifier(ip)) => Some(*ip),
        _ => None,
    }
}
