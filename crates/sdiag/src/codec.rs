//! Fixed-layout struct codec.
//!
//! Kernel ABI structures cross the netlink boundary as raw in-memory
//! copies: fixed size, fixed field order, host-native byte order. Byte
//! order is therefore a property of the `#[repr(C)]` type definitions in
//! [`crate::types`], not of ambient state; this module only moves bytes
//! in and out of those shapes.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{Error, Result};

/// Serialize a fixed-layout structure to its wire bytes.
pub fn encode<T: IntoBytes + Immutable>(value: &T) -> &[u8] {
    value.as_bytes()
}

/// Decode a fixed-layout structure from the front of `data`.
///
/// Fails with [`Error::Truncated`] if `data` is shorter than the
/// structure's static size; no partial decode is attempted.
pub fn decode<T: FromBytes + KnownLayout>(data: &[u8]) -> Result<T> {
    T::read_from_prefix(data)
        .map(|(value, _)| value)
        .map_err(|_| Error::Truncated {
            expected: size_of::<T>(),
            actual: data.len(),
        })
}

/// Decode a fixed-layout structure, zero-padding a short buffer.
///
/// Newer kernels append trailing fields to extension structures; older
/// kernels send shorter payloads. Padding with zero bytes keeps both
/// directions decodable.
pub fn decode_padded<T: FromBytes + KnownLayout>(data: &[u8]) -> T {
    if data.len() >= size_of::<T>() {
        // Infallible: the prefix is long enough and T has no alignment
        // requirement on the source (read, not ref).
        return T::read_from_prefix(data).map(|(value, _)| value).unwrap();
    }
    let mut padded = vec![0u8; size_of::<T>()];
    padded[..data.len()].copy_from_slice(data);
    T::read_from_bytes(&padded).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InetDiagReqV2, MemInfo, SockId};

    #[test]
    fn test_encode_decode_round_trip() {
        let req = InetDiagReqV2 {
            family: libc::AF_INET as u8,
            protocol: libc::IPPROTO_TCP as u8,
            ext: 1 << 1,
            pad: 0,
            states: !0u32,
            id: SockId {
                sport: 0x901F,
                dport: 0,
                src: [0x0100007F, 0, 0, 0],
                dst: [0; 4],
                iface: 2,
                cookie: [0xdead, 0xbeef],
            },
        };

        let bytes = encode(&req).to_vec();
        assert_eq!(bytes.len(), 56);

        let back: InetDiagReqV2 = decode(&bytes).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn test_decode_short_buffer() {
        let err = decode::<MemInfo>(&[0u8; 8]).unwrap_err();
        match err {
            Error::Truncated { expected, actual } => {
                assert_eq!(expected, 16);
                assert_eq!(actual, 8);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_padded_extends_short_buffer() {
        // First field populated, the rest zero-filled.
        let mi: MemInfo = decode_padded(&42u32.to_ne_bytes());
        assert_eq!(mi.rmem, 42);
        assert_eq!(mi.wmem, 0);
        assert_eq!(mi.fmem, 0);
        assert_eq!(mi.tmem, 0);
    }

    #[test]
    fn test_decode_padded_ignores_trailing_bytes() {
        let mut data = vec![0u8; 32];
        data[0] = 7;
        let mi: MemInfo = decode_padded(&data);
        assert_eq!(mi.rmem, 7);
    }
}
