//! IPv4 addresses as plain 32-bit values.

use std::fmt;
use std::net::Ipv4Addr;

/// A 32-bit IPv4 address, most-significant octet first.
///
/// Zero is reserved as the nil address and is what [`IpAddress::parse`]
/// returns for anything it cannot make sense of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IpAddress(pub u32);

impl IpAddress {
    pub const NIL: IpAddress = IpAddress(0);

    pub fn parse(value: &str) -> Self {
        let parts: Vec<&str> = value.trim().split('.').collect();
        if parts.len() != 4 {
            return Self::NIL;
        }

        let mut ip = 0u32;
        for part in parts {
            match part.parse::<u8>() {
                Ok(octet) => ip = ip << 8 | octet as u32,
                Err(_) => return Self::NIL,
            }
        }

        IpAddress(ip)
    }

    pub fn is_nil(self) -> bool {
        self == Self::NIL
    }

    pub fn octets(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.octets();
        write!(f, "{}.{}.{}.{}", a, b, c, d)
    }
}

impl From<Ipv4Addr> for IpAddress {
    fn from(addr: Ipv4Addr) -> Self {
        IpAddress(u32::from(addr))
    }
}

impl From<IpAddress> for Ipv4Addr {
    fn from(addr: IpAddress) -> Self {
        Ipv4Addr::from(addr.0)
    }
}

impl From<[u8; 4]> for IpAddress {
    fn from(octets: [u8; 4]) -> Self {
        IpAddress(u32::from_be_bytes(octets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_most_significant_octet_first() {
        assert_eq!(IpAddress(0x0415030B).to_string(), "4.21.3.11");
        assert_eq!(IpAddress(0).to_string(), "0.0.0.0");
        assert_eq!(IpAddress(u32::MAX).to_string(), "255.255.255.255");
    }

    #[test]
    fn malformed_parses_to_nil() {
        assert!(IpAddress::parse("").is_nil());
        assert!(IpAddress::parse("10.0.1").is_nil());
        assert!(IpAddress::parse("10.0.x.1").is_nil());
        assert!(IpAddress::parse("10.0.0.256").is_nil());
        assert!(IpAddress::parse("10.0.0.-1").is_nil());
        assert!(IpAddress::parse("localhost").is_nil());
    }

    #[test]
    fn converts_to_std() {
        let addr = IpAddress::parse("192.168.1.20");
        assert_eq!(Ipv4Addr::from(addr), Ipv4Addr::new(192, 168, 1, 20));
        assert_eq!(IpAddress::from(Ipv4Addr::new(192, 168, 1, 20)), addr);
        assert_eq!(IpAddress::from([192, 168, 1, 20]), addr);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn proptest_parse_format_roundtrip(raw in any::<u32>()) {
            let addr = IpAddress(raw);
            prop_assert_eq!(IpAddress::parse(&addr.to_string()), addr);
        }

        /// Three or fewer parts never make an address
        #[test]
        fn proptest_short_quads_are_nil(octets in prop::collection::vec(any::<u8>(), 0..4)) {
            let text = octets.iter().map(|o| o.to_string()).collect::<Vec<_>>().join(".");
            prop_assert!(IpAddress::parse(&text).is_nil());
        }

        #[test]
        fn proptest_non_numeric_octet_is_nil(raw in any::<u32>(), pos in 0usize..4, junk in "[a-z]{1,3}") {
            let mut parts: Vec<String> = IpAddress(raw).octets().iter().map(|o| o.to_string()).collect();
            parts[pos] = junk;
            prop_assert!(IpAddress::parse(&parts.join(".")).is_nil());
        }
    }
}
