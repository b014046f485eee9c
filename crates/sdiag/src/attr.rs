//! Netlink attribute (nlattr) TLV stream walking.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{Error, Result};

/// Netlink attribute alignment.
pub const NLA_ALIGNTO: usize = 4;

/// Align a length to NLA_ALIGNTO boundary.
#[inline]
pub const fn nla_align(len: usize) -> usize {
    (len + NLA_ALIGNTO - 1) & !(NLA_ALIGNTO - 1)
}

/// Size of the attribute header.
pub const NLA_HDRLEN: usize = 4;

/// Netlink attribute header (mirrors struct nlattr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlAttr {
    /// Length including header.
    pub nla_len: u16,
    /// Attribute type.
    pub nla_type: u16,
}

impl NlAttr {
    /// Encode an attribute header for `data_len` payload bytes.
    pub fn new(attr_type: u16, data_len: usize) -> Self {
        Self {
            nla_len: (NLA_HDRLEN + data_len) as u16,
            nla_type: attr_type,
        }
    }
}

/// Iterator over the attributes in a payload.
///
/// Yields `(type code, payload)` per well-formed entry. A clean buffer
/// end terminates the iteration; an entry whose declared length reads
/// past the remaining buffer yields an error, after which the stream is
/// abandoned (every later offset would be unverifiable).
pub struct AttrIter<'a> {
    data: &'a [u8],
}

impl<'a> AttrIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for AttrIter<'a> {
    type Item = Result<(u16, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }

        let remaining = self.data.len();
        let attr = match NlAttr::read_from_prefix(self.data) {
            Ok((attr, _)) => attr,
            Err(_) => {
                self.data = &[];
                return Some(Err(Error::InvalidMessage(format!(
                    "dangling attribute header: {remaining} trailing bytes"
                ))));
            }
        };

        let len = attr.nla_len as usize;
        if len < NLA_HDRLEN || len > remaining {
            self.data = &[];
            return Some(Err(Error::InvalidMessage(format!(
                "attribute length {len} exceeds remaining {remaining} bytes"
            ))));
        }

        let payload = &self.data[NLA_HDRLEN..len];

        let aligned_len = nla_align(len);
        if aligned_len >= self.data.len() {
            self.data = &[];
        } else {
            self.data = &self.data[aligned_len..];
        }

        Some(Ok((attr.nla_type, payload)))
    }
}

/// Append one attribute (header, payload, alignment padding) to a buffer.
pub fn put_attr(buf: &mut Vec<u8>, attr_type: u16, payload: &[u8]) {
    buf.extend_from_slice(NlAttr::new(attr_type, payload.len()).as_bytes());
    buf.extend_from_slice(payload);
    buf.resize(nla_align(buf.len()), 0);
}
