//! Conversions between kernel-embedded address words and [`IpAddr`].
//!
//! The kernel hands addresses over as four 32-bit words that are raw
//! memory copies of the in-kernel byte sequence. Reconstructing the byte
//! order therefore goes through `to_ne_bytes`, an explicit copy; typed
//! memory is never aliased as raw bytes.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::{Error, Result};

/// Convert four kernel address words to an address, using `family` as the
/// interpretation hint.
///
/// AF_INET reads only the first 4 bytes, AF_INET6 all 16. Any other
/// family fails with [`Error::UnsupportedFamily`].
pub fn to_addr_with_family(family: u8, words: &[u32; 4]) -> Result<IpAddr> {
    let bytes = words_to_bytes(words);
    match family as i32 {
        libc::AF_INET => {
            let mut v4 = [0u8; 4];
            v4.copy_from_slice(&bytes[..4]);
            Ok(IpAddr::V4(Ipv4Addr::from(v4)))
        }
        libc::AF_INET6 => Ok(IpAddr::V6(Ipv6Addr::from(bytes))),
        _ => Err(Error::UnsupportedFamily(family)),
    }
}

/// Convert four kernel address words to an address without a family tag.
///
/// Legacy heuristic kept for callers that lack one: the value is treated
/// as IPv6 unless the last three words are all zero, in which case it is
/// an IPv4 address embedded in the first word.
pub fn to_addr(words: &[u32; 4]) -> IpAddr {
    if words[1] == 0 && words[2] == 0 && words[3] == 0 {
        let mut v4 = [0u8; 4];
        v4.copy_from_slice(&words[0].to_ne_bytes());
        IpAddr::V4(Ipv4Addr::from(v4))
    } else {
        IpAddr::V6(Ipv6Addr::from(words_to_bytes(words)))
    }
}

/// Convert a port from its network-byte-order wire reading to host order.
pub fn ntohs(port: u16) -> u16 {
    u16::from_be(port)
}

fn words_to_bytes(words: &[u32; 4]) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    for (chunk, word) in bytes.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&word.to_ne_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unspecified_with_family() {
        let zero = [0u32; 4];
        assert_eq!(
            to_addr_with_family(libc::AF_INET as u8, &zero).unwrap(),
            "0.0.0.0".parse::<IpAddr>().unwrap()
        );
        assert_eq!(
            to_addr_with_family(libc::AF_INET6 as u8, &zero).unwrap(),
            "::".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_loopback_v4() {
        // 127.0.0.1 as the kernel stores it on a little-endian host.
        let words = [u32::from_ne_bytes([127, 0, 0, 1]), 0, 0, 0];
        assert_eq!(
            to_addr_with_family(libc::AF_INET as u8, &words).unwrap(),
            "127.0.0.1".parse::<IpAddr>().unwrap()
        );
        // The heuristic agrees when the trailing words are zero.
        assert_eq!(to_addr(&words), "127.0.0.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_loopback_v6() {
        let mut words = [0u32; 4];
        words[3] = u32::from_ne_bytes([0, 0, 0, 1]);
        assert_eq!(
            to_addr_with_family(libc::AF_INET6 as u8, &words).unwrap(),
            "::1".parse::<IpAddr>().unwrap()
        );
        assert_eq!(to_addr(&words), "::1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_unsupported_family() {
        let err = to_addr_with_family(libc::AF_PACKET as u8, &[0; 4]).unwrap_err();
        match err {
            Error::UnsupportedFamily(family) => assert_eq!(family, libc::AF_PACKET as u8),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ntohs() {
        // Port 8080 (0x1F90) read native from its wire bytes on a
        // little-endian host.
        assert_eq!(ntohs(u16::from_ne_bytes([0x1F, 0x90])), 0x1F90);
        assert_eq!(ntohs(ntohs(0x1234)), 0x1234);
    }
}
