use std::fmt;

use serde::{Deserialize, Serialize};

pub const ICMP_HEADER_LEN: usize = 8;
pub const IPV4_HEADER_LEN: usize = 20;

/// Header encoding shared by every wire struct: fixed width integers,
/// network byte order.
pub fn coder() -> impl bincode::Options {
    use bincode::Options;

    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_big_endian()
        .allow_trailing_bytes()
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct IcmpHeader {
    pub message_type: u8,
    pub message_code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence_num: u16,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Ipv4Header {
    pub version_and_header_len: u8,
    pub dscp_and_ecn: u8,
    pub datagram_length: u16,
    pub ip_identifier: u16,
    pub flags_and_5frag_offset: u8, // flags are u3
    pub rest_of_frag_offset: u8,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub source_ip: u32,
    pub destination_ip: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcmpType {
    EchoReply,
    DestinationUnreachable,
    EchoRequest,
    TimeExceeded,
    Other(u8),
}

impl From<u8> for IcmpType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => IcmpType::EchoReply,
            0x03 => IcmpType::DestinationUnreachable,
            0x08 => IcmpType::EchoRequest,
            0x0B => IcmpType::TimeExceeded,
            other => IcmpType::Other(other),
        }
    }
}

impl From<IcmpType> for u8 {
    fn from(value: IcmpType) -> Self {
        match value {
            IcmpType::EchoReply => 0x00,
            IcmpType::DestinationUnreachable => 0x03,
            IcmpType::EchoRequest => 0x08,
            IcmpType::TimeExceeded => 0x0B,
            IcmpType::Other(other) => other,
        }
    }
}

impl fmt::Display for IcmpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IcmpType::EchoReply => f.write_str("echo reply"),
            IcmpType::DestinationUnreachable => f.write_str("destination unreachable"),
            IcmpType::EchoRequest => f.write_str("echo request"),
            IcmpType::TimeExceeded => f.write_str("time exceeded"),
            IcmpType::Other(other) => write!(f, "unknown ({})", other),
        }
    }
}

/// Destination Unreachable codes (RFC 792)
pub mod dest_unreachable {
    pub const HOST_UNREACHABLE: u8 = 1;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpProtocol {
    Icmp,
    Igmp,
    Tcp,
    Udp,
    Other(u8),
}

impl From<u8> for IpProtocol {
    fn from(value: u8) -> Self {
        match value {
            1 => IpProtocol::Icmp,
            2 => IpProtocol::Igmp,
            6 => IpProtocol::Tcp,
            17 => IpProtocol::Udp,
            other => IpProtocol::Other(other),
        }
    }
}

impl From<IpProtocol> for u8 {
    fn from(value: IpProtocol) -> Self {
        match value {
            IpProtocol::Icmp => 1,
            IpProtocol::Igmp => 2,
            IpProtocol::Tcp => 6,
            IpProtocol::Udp => 17,
            IpProtocol::Other(other) => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bincode::Options;

    #[test]
    fn icmp_header_is_eight_bytes_big_endian() {
        let header = IcmpHeader {
            message_type: 8,
            message_code: 0,
            checksum: 0xABCD,
            identifier: 0x5e1d,
            sequence_num: 0x0020,
        };
        let bytes = coder().serialize(&header).unwrap();
        assert_eq!(bytes, vec![0x08, 0x00, 0xAB, 0xCD, 0x5e, 0x1d, 0x00, 0x20]);
        assert_eq!(bytes.len(), ICMP_HEADER_LEN);
    }

    #[test]
    fn ipv4_header_is_twenty_bytes() {
        let header = Ipv4Header {
            version_and_header_len: 0x45,
            dscp_and_ecn: 0,
            datagram_length: 28,
            ip_identifier: 0,
            flags_and_5frag_offset: 0,
            rest_of_frag_offset: 0,
            ttl: 64,
            protocol: 1,
            checksum: 0,
            source_ip: 0x0A000001,
            destination_ip: 0x0415030B,
        };
        let bytes = coder().serialize(&header).unwrap();
        assert_eq!(bytes.len(), IPV4_HEADER_LEN);
        assert_eq!(&bytes[12..], &[10, 0, 0, 1, 4, 21, 3, 11]);
    }

    #[test]
    fn enums_roundtrip_every_byte() {
        for value in 0..=255u8 {
            assert_eq!(u8::from(IcmpType::from(value)), value);
            assert_eq!(u8::from(IpProtocol::from(value)), value);
        }
        assert_eq!(IcmpType::from(0x0B), IcmpType::TimeExceeded);
        assert_eq!(IpProtocol::from(17), IpProtocol::Udp);
    }

    #[test]
    fn icmp_type_names() {
        assert_eq!(IcmpType::DestinationUnreachable.to_string(), "destination unreachable");
        assert_eq!(IcmpType::TimeExceeded.to_string(), "time exceeded");
        assert_eq!(IcmpType::EchoRequest.to_string(), "echo request");
        assert_eq!(IcmpType::Other(42).to_string(), "unknown (42)");
    }
}
