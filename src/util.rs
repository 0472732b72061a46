use std::net::{IpAddr, ToSocketAddrs};

use crate::addr::IpAddress;
use crate::error::{Error, Result};

/// Resolve a hostname or dotted quad to the first IPv4 address it maps to.
pub fn resolve_dest(dest: &str) -> Result<IpAddress> {
    let addrs = format!("{}:0", dest)
        .to_socket_addrs()
        .map_err(|e| Error::Resolve(format!("{}: {}", dest, e)))?;

    for addr in addrs {
        if let IpAddr::V4(v4) = addr.ip() {
            return Ok(v4.into());
        }
    }

    Err(Error::Resolve(format!("{}: no ipv4 address", dest)))
}

/// Zero the 16-bit word at word offset `location`, then write the checksum
/// of `data` into it.
#[allow(clippy::double_parens)] // For stylistic reasons
pub fn set_checksum(data: &mut [u8], location: usize) {
    data[location*2    ] = 0;
    data[location*2 + 1] = 0;

    let sum = checksum(data);
    data[location*2    ] = ((sum & 0xFF00) >> 8) as u8;
    data[location*2 + 1] = ((sum & 0x00FF)     ) as u8;
}

/// RFC 1071 internet checksum. An odd trailing byte is summed as if a zero
/// byte followed it.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum = sum_be_words(data);
    while sum >> 16 != 0 {
        sum = (sum >> 16) + (sum & 0xFFFF);
    }

    !sum as u16 // The checksum field should be the ones complement of the sum
}

/// Sum all words (16 bit chunks) in the given data. Each word is treated as
/// big endian.
fn sum_be_words(data: &[u8]) -> u32 {
    data.chunks(2)
        .map(|word| match *word {
            [wh] => u16::from_be_bytes([wh, 0]),
            [wh, wl] => u16::from_be_bytes([wh, wl]),
            _ => unreachable!(),
        })
        .fold(0, |acc, w| acc.wrapping_add(w as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_all_ones() {
        assert_eq!(checksum(&[]), 0xFFFF);
    }

    #[test]
    fn odd_length_pads_low_byte() {
        assert_eq!(checksum(&[0x12]), checksum(&[0x12, 0x00]));
        // 0xABCD + 0xEF00 = 0x1_9ACD -> 0x9ACE
        assert_eq!(checksum(&[0xAB, 0xCD, 0xEF]), !0x9ACE);
    }

    #[test]
    fn folds_carry() {
        // 0xFFFF + 0x0001 = 0x1_0000 -> folds to 0x0001
        assert_eq!(checksum(&[0xFF, 0xFF, 0x00, 0x01]), !0x0001);
    }

    #[test]
    fn rfc1071_example() {
        let data = [0x00, 0x01, 0xF2, 0x03, 0xF4, 0xF5, 0xF6, 0xF7];
        assert_eq!(checksum(&data), !0xDDF2);
    }

    #[test]
    fn set_checksum_makes_data_sum_to_zero() {
        let mut data = vec![0x45, 0x00, 0x00, 0x1c, 0xde, 0xad, 0xbe, 0xef, 0x12];
        data[2] = 0x99; // stale value in the checksum word is ignored
        set_checksum(&mut data, 1);
        assert_eq!(checksum(&data), 0);
    }

    #[test]
    fn resolves_literal() {
        assert_eq!(resolve_dest("127.0.0.1").unwrap(), IpAddress::parse("127.0.0.1"));
    }

    use proptest::prelude::*;

    proptest! {
        /// Writing the checksum into any buffer makes the whole buffer sum to zero
        #[test]
        fn proptest_set_checksum_zeroes_sum(
            mut data in prop::collection::vec(any::<u8>(), 2..600),
            word in any::<prop::sample::Index>(),
        ) {
            let location = word.index(data.len() / 2);
            set_checksum(&mut data, location);
            prop_assert_eq!(checksum(&data), 0);
        }

        #[test]
        fn proptest_odd_length_pads_with_zero(data in prop::collection::vec(any::<u8>(), 0..600)) {
            let mut padded = data.clone();
            if padded.len() % 2 != 0 {
                padded.push(0);
            }
            prop_assert_eq!(checksum(&data), checksum(&padded));
        }
    }
}
