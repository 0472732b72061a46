use bincode::Options;

use crate::error::{Error, Result};
use crate::packet::{coder, IcmpHeader, IcmpType, ICMP_HEADER_LEN};
use crate::util;

/// An ICMP message: the 8 byte header plus whatever follows it.
///
/// `checksum` is the value carried on the wire. Packets built with
/// [`IcmpPacket::new`] are sealed on construction; after mutating fields,
/// call [`IcmpPacket::seal`] before relying on [`IcmpPacket::is_valid`].
/// [`IcmpPacket::to_bytes`] always writes a fresh checksum.
#[derive(Debug, Clone, PartialEq)]
pub struct IcmpPacket {
    pub kind: IcmpType,
    pub code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence: u16,
    pub payload: Vec<u8>,
}

impl IcmpPacket {
    pub fn new(kind: IcmpType, code: u8, identifier: u16, sequence: u16, payload: Vec<u8>) -> Self {
        let mut packet = IcmpPacket {
            kind,
            code,
            checksum: 0,
            identifier,
            sequence,
            payload,
        };
        packet.seal();
        packet
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < ICMP_HEADER_LEN {
            return Err(Error::TruncatedPacket { needed: ICMP_HEADER_LEN, got: data.len() });
        }

        let header: IcmpHeader = coder().deserialize(&data[..ICMP_HEADER_LEN])?;

        Ok(IcmpPacket {
            kind: header.message_type.into(),
            code: header.message_code,
            checksum: header.checksum,
            identifier: header.identifier,
            sequence: header.sequence_num,
            payload: data[ICMP_HEADER_LEN..].to_vec(),
        })
    }

    /// Serialize with a freshly computed checksum.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = self.encode(0)?;
        util::set_checksum(&mut bytes, 1);
        Ok(bytes)
    }

    pub fn compute_checksum(&self) -> Result<u16> {
        Ok(util::checksum(&self.encode(0)?))
    }

    pub fn seal(&mut self) {
        // Encoding a fixed width header cannot fail.
        if let Ok(sum) = self.compute_checksum() {
            self.checksum = sum;
        }
    }

    /// True when the carried checksum matches the rest of the message.
    pub fn is_valid(&self) -> bool {
        match self.encode(self.checksum) {
            Ok(bytes) => util::checksum(&bytes) == 0,
            Err(_) => false,
        }
    }

    fn encode(&self, checksum: u16) -> Result<Vec<u8>> {
        let header = IcmpHeader {
            message_type: self.kind.into(),
            message_code: self.code,
            checksum,
            identifier: self.identifier,
            sequence_num: self.sequence,
        };

        let mut bytes = coder().serialize(&header)?;
        bytes.extend_from_slice(&self.payload);
        Ok(bytes)
    }
}
