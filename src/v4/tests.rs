use super::*;
use crate::codec::{Packet, Xid};
use bytes::Bytes;
use dhcproto::v4;
use std::net::Ipv4Addr;

const MAC: [u8; 6] = [0x00, 0x0c, 0x29, 0xa8, 0x92, 0xf4];

#[test]
fn test_build_discover() {
    let mac_addr = Bytes::from_static(&MAC);
    let xid = Xid::from(0x12345678u32);

    let msg = build_discover(&mac_addr, xid);

    // Round-trip through the wire format to verify it's valid
    let bytes = Packet::encode(&msg).unwrap();
    let decoded = <v4::Message as Packet>::decode(&bytes).unwrap();

    assert_eq!(decoded.xid(), 0x12345678);
    assert_eq!(decoded.chaddr(), &mac_addr[..]);
    assert_eq!(decoded.opcode(), v4::Opcode::BootRequest);
    assert!(decoded.flags().broadcast());
    assert_eq!(message_type(&decoded), Some(v4::MessageType::Discover));

    let client_id = decoded.opts().get(v4::OptionCode::ClientIdentifier);
    assert!(matches!(
        client_id,
        Some(v4::DhcpOption::ClientIdentifier(id)) if id[0] == 1 && id[1..] == MAC
    ));
}

#[test]
fn test_build_request() {
    let mac_addr = Bytes::from_static(&MAC);
    let xid = Xid::from(0x87654321u32);
    let offered_ip = Ipv4Addr::new(192, 168, 1, 100);
    let server_ip = Ipv4Addr::new(192, 168, 1, 1);

    let msg = build_request(&mac_addr, xid, offered_ip, server_ip);

    assert_eq!(Packet::xid(&msg), xid);
    assert_eq!(msg.opcode(), v4::Opcode::BootRequest);
    assert_eq!(message_type(&msg), Some(v4::MessageType::Request));
    assert_eq!(server_identifier(&msg), Some(server_ip));

    let requested_ip = msg.opts().get(v4::OptionCode::RequestedIpAddress);
    assert!(matches!(requested_ip, Some(v4::DhcpOption::RequestedIpAddress(ip)) if *ip == offered_ip));

    assert!(msg.flags().broadcast());
}

#[test]
fn test_option_accessors_on_bare_message() {
    let msg = v4::Message::default();
    assert_eq!(message_type(&msg), None);
    assert_eq!(server_identifier(&msg), None);
}

#[test]
fn test_parse_mac_address() {
    let mac = parse_mac_address("00:0c:29:a8:92:f4").unwrap();
    assert_eq!(&mac[..], &MAC);

    assert!(parse_mac_address("00:zz:29:a8:92:f4").is_err());
}
