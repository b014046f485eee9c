//! Unix-domain socket response decoding.

use serde::Serialize;

use crate::attr::AttrIter;
use crate::codec;
use crate::error::{Error, Issue, Result};
use crate::types::{
    MemInfo, UNIX_DIAG_ICONS, UNIX_DIAG_MEMINFO, UNIX_DIAG_NAME, UNIX_DIAG_PEER, UNIX_DIAG_RQLEN,
    UNIX_DIAG_SHUTDOWN, UNIX_DIAG_UID, UNIX_DIAG_VFS, UnixDiagMsg, UnixDiagRqLen, UnixDiagVfs,
};

/// Optional attributes of one unix socket, sparsely populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnixAttrs {
    /// Bound name. Abstract-namespace names keep their leading NUL
    /// rendered as '@'.
    pub name: Option<String>,
    pub vfs: Option<UnixDiagVfs>,
    /// Inode of the peer socket.
    pub peer: Option<u32>,
    /// Inodes of sockets queued on a listener, pending accept.
    pub icons: Option<Vec<u32>>,
    pub rqlen: Option<UnixDiagRqLen>,
    pub mem_info: Option<MemInfo>,
    pub shutdown: Option<u8>,
    pub uid: Option<u32>,
}

/// One kernel-reported unix socket.
#[derive(Debug, Clone, Serialize)]
pub struct UnixSocket {
    pub msg: UnixDiagMsg,
    pub attrs: UnixAttrs,
    pub issues: Vec<Issue>,
}

impl UnixSocket {
    /// Decode one raw response message: fixed header, then attributes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let msg: UnixDiagMsg = codec::decode(data)?;
        let (attrs, issues) = decode_attrs(&data[size_of::<UnixDiagMsg>()..]);
        Ok(Self { msg, attrs, issues })
    }
}

/// Walk the attribute payload of a unix message.
///
/// A TLV entry whose declared length overruns the buffer ends the walk,
/// recorded as [`Issue::CorruptAttributeStream`]; attributes decoded
/// before it are kept.
pub fn decode_attrs(data: &[u8]) -> (UnixAttrs, Vec<Issue>) {
    let mut attrs = UnixAttrs::default();
    let mut issues = Vec::new();

    for entry in AttrIter::new(data) {
        let (kind, payload) = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let detail = match err {
                    Error::InvalidMessage(msg) => msg,
                    other => other.to_string(),
                };
                issues.push(Issue::CorruptAttributeStream { detail });
                break;
            }
        };
        match kind {
            UNIX_DIAG_NAME => match decode_name(payload) {
                Some(name) => attrs.name = Some(name),
                None => issues.push(Issue::InvalidString { kind }),
            },
            UNIX_DIAG_VFS => set_struct(&mut attrs.vfs, kind, payload, &mut issues),
            UNIX_DIAG_PEER => set_u32(&mut attrs.peer, kind, payload, &mut issues),
            UNIX_DIAG_ICONS => {
                let inodes: Vec<u32> = payload
                    .chunks_exact(4)
                    .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                    .collect();
                attrs.icons = Some(inodes);
            }
            UNIX_DIAG_RQLEN => set_struct(&mut attrs.rqlen, kind, payload, &mut issues),
            UNIX_DIAG_MEMINFO => set_struct(&mut attrs.mem_info, kind, payload, &mut issues),
            UNIX_DIAG_SHUTDOWN => match payload.first() {
                Some(&value) => attrs.shutdown = Some(value),
                None => issues.push(Issue::TruncatedAttribute {
                    kind,
                    expected: 1,
                    actual: 0,
                }),
            },
            UNIX_DIAG_UID => set_u32(&mut attrs.uid, kind, payload, &mut issues),
            _ => issues.push(Issue::UnsupportedAttribute { kind }),
        }
    }

    (attrs, issues)
}

/// Decode a socket name; a leading NUL marks the abstract namespace.
/// The name ends at the first NUL after that, like a C string.
fn decode_name(payload: &[u8]) -> Option<String> {
    if payload.is_empty() {
        return Some(String::new());
    }
    if payload[0] == 0 {
        let raw = &payload[1..];
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let name = std::str::from_utf8(&raw[..end]).ok()?;
        Some(format!("@{name}"))
    } else {
        let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
        let name = std::str::from_utf8(&payload[..end]).ok()?;
        Some(name.to_string())
    }
}

fn set_u32(field: &mut Option<u32>, kind: u16, payload: &[u8], issues: &mut Vec<Issue>) {
    if payload.len() < 4 {
        issues.push(Issue::TruncatedAttribute {
            kind,
            expected: 4,
            actual: payload.len(),
        });
        return;
    }
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&payload[..4]);
    *field = Some(u32::from_ne_bytes(bytes));
}

fn set_struct<T>(field: &mut Option<T>, kind: u16, payload: &[u8], issues: &mut Vec<Issue>)
where
    T: zerocopy::FromBytes + zerocopy::KnownLayout,
{
    match codec::decode::<T>(payload) {
        Ok(value) => *field = Some(value),
        Err(_) => issues.push(Issue::TruncatedAttribute {
            kind,
            expected: size_of::<T>(),
            actual: payload.len(),
        }),
    }
}
