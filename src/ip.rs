use std::convert::TryFrom;

use bincode::Options;

use crate::addr::IpAddress;
use crate::error::{Error, Result};
use crate::packet::{coder, IpProtocol, Ipv4Header, IPV4_HEADER_LEN};
use crate::util;

pub const DEFAULT_TTL: u8 = 64;

/// An IPv4 datagram with a fixed 20 byte header. Options are not supported;
/// anything after the first 20 bytes is payload.
///
/// As with ICMP, `checksum` is the wire value and covers the header only.
#[derive(Debug, Clone, PartialEq)]
pub struct IpPacket {
    pub version: u8,
    pub ihl: u8,
    pub dscp: u8,
    pub ecn: u8,
    pub total_length: u16,
    pub identification: u16,
    pub flags: u8,
    pub fragment_offset: u16,
    pub ttl: u8,
    pub protocol: IpProtocol,
    pub checksum: u16,
    pub source: IpAddress,
    pub destination: IpAddress,
    pub payload: Vec<u8>,
}

impl IpPacket {
    /// Fails if the datagram would not fit the 16-bit total length field.
    pub fn new(protocol: IpProtocol, source: IpAddress, destination: IpAddress, payload: Vec<u8>) -> Result<Self> {
        let len = IPV4_HEADER_LEN + payload.len();
        let total_length = u16::try_from(len).map_err(|_| Error::PacketTooLarge { len })?;

        let mut packet = IpPacket {
            version: 4,
            ihl: (IPV4_HEADER_LEN / 4) as u8,
            dscp: 0,
            ecn: 0,
            total_length,
            identification: 0,
            flags: 0,
            fragment_offset: 0,
            ttl: DEFAULT_TTL,
            protocol,
            checksum: 0,
            source,
            destination,
            payload,
        };
        packet.seal();
        Ok(packet)
    }

    /// Header length in bytes as announced by the first byte of a datagram.
    pub fn header_len(first_byte: u8) -> usize {
        4 * (first_byte & 0x0F) as usize
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < IPV4_HEADER_LEN {
            return Err(Error::TruncatedPacket { needed: IPV4_HEADER_LEN, got: data.len() });
        }

        let header: Ipv4Header = coder().deserialize(&data[..IPV4_HEADER_LEN])?;

        Ok(IpPacket {
            version: header.version_and_header_len >> 4,
            ihl: header.version_and_header_len & 0x0F,
            dscp: header.dscp_and_ecn >> 2,
            ecn: header.dscp_and_ecn & 0x03,
            total_length: header.datagram_length,
            identification: header.ip_identifier,
            flags: header.flags_and_5frag_offset >> 5,
            fragment_offset: ((header.flags_and_5frag_offset & 0x1F) as u16) << 8
                | header.rest_of_frag_offset as u16,
            ttl: header.ttl,
            protocol: header.protocol.into(),
            checksum: header.checksum,
            source: IpAddress(header.source_ip),
            destination: IpAddress(header.destination_ip),
            payload: data[IPV4_HEADER_LEN..].to_vec(),
        })
    }

    /// The 20 byte header with a freshly computed checksum.
    pub fn header_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = self.encode_header(0)?;
        util::set_checksum(&mut bytes, 5);
        Ok(bytes)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = self.header_bytes()?;
        bytes.extend_from_slice(&self.payload);
        Ok(bytes)
    }

    pub fn compute_checksum(&self) -> Result<u16> {
        Ok(util::checksum(&self.encode_header(0)?))
    }

    pub fn seal(&mut self) {
        if let Ok(sum) = self.compute_checksum() {
            self.checksum = sum;
        }
    }

    pub fn is_valid(&self) -> bool {
        match self.encode_header(self.checksum) {
            Ok(bytes) => util::checksum(&bytes) == 0,
            Err(_) => false,
        }
    }

    fn encode_header(&self, checksum: u16) -> Result<Vec<u8>> {
        let header = Ipv4Header {
            version_and_header_len: self.version << 4 | (self.ihl & 0x0F),
            dscp_and_ecn: self.dscp << 2 | (self.ecn & 0x03),
            datagram_length: self.total_length,
            ip_identifier: self.identification,
            flags_and_5frag_offset: self.flags << 5 | ((self.fragment_offset >> 8) as u8 & 0x1F),
            rest_of_frag_offset: self.fragment_offset as u8,
            ttl: self.ttl,
            protocol: self.protocol.into(),
            checksum,
            source_ip: self.source.0,
            destination_ip: self.destination.0,
        };

        Ok(coder().serialize(&header)?)
    }
}
