//! Inet (TCP/UDP/RAW/SCTP) response decoding.

use serde::Serialize;

use crate::attr::AttrIter;
use crate::codec;
use crate::error::{Error, Issue, Result};
use crate::types::{
    BbrInfo, DctcpInfo, INET_DIAG_BBRINFO, INET_DIAG_CGROUP_ID, INET_DIAG_CLASS_ID,
    INET_DIAG_CONG, INET_DIAG_DCTCPINFO, INET_DIAG_INFO, INET_DIAG_MARK, INET_DIAG_MEMINFO,
    INET_DIAG_NONE, INET_DIAG_PAD, INET_DIAG_PROTOCOL, INET_DIAG_SHUTDOWN, INET_DIAG_SKMEMINFO,
    INET_DIAG_SKV6ONLY, INET_DIAG_SOCKOPT, INET_DIAG_TCLASS, INET_DIAG_TOS, INET_DIAG_VEGASINFO,
    InetDiagMsg, MemInfo, SctpInfo, SkMemInfo, SockOpt, TcpInfo, VegasInfo,
};

/// Optional attributes of one inet socket, sparsely populated.
///
/// `None` means the kernel omitted the attribute; a present zero value is
/// a real zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InetAttrs {
    pub mem_info: Option<MemInfo>,
    pub vegas_info: Option<VegasInfo>,
    /// Congestion-control algorithm name.
    pub cong: Option<String>,
    pub tos: Option<u8>,
    pub tclass: Option<u8>,
    pub sk_mem_info: Option<SkMemInfo>,
    pub shutdown: Option<u8>,
    pub dctcp_info: Option<DctcpInfo>,
    /// Transport protocol (IPPROTO_*), when the kernel reports one.
    pub protocol: Option<u8>,
    pub skv6only: Option<u8>,
    pub mark: Option<u32>,
    pub bbr_info: Option<BbrInfo>,
    pub class_id: Option<u32>,
    pub cgroup_id: Option<u64>,
    pub sock_opt: Option<SockOpt>,
    /// Resolved from INET_DIAG_INFO when the protocol is TCP.
    pub tcp_info: Option<TcpInfo>,
    /// Resolved from INET_DIAG_INFO when the protocol is SCTP.
    pub sctp_info: Option<SctpInfo>,
}

/// One kernel-reported inet socket: fixed header, best-effort attributes,
/// and the non-fatal issues hit while decoding them.
#[derive(Debug, Clone, Serialize)]
pub struct InetSocket {
    pub msg: InetDiagMsg,
    pub attrs: InetAttrs,
    pub issues: Vec<Issue>,
}

impl InetSocket {
    /// Decode one raw response message: fixed header, then attributes.
    ///
    /// A short header is fatal; attribute-level problems are recorded in
    /// `issues` and never suppress the rest of the socket's information.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let msg: InetDiagMsg = codec::decode(data)?;
        let (attrs, issues) = decode_attrs(&data[size_of::<InetDiagMsg>()..]);
        Ok(Self { msg, attrs, issues })
    }
}

/// Walk the attribute payload of an inet message.
///
/// Returns the populated record plus the ordered non-fatal issue list.
/// A TLV entry whose declared length overruns the buffer ends the walk
/// (later offsets are unverifiable), recorded as
/// [`Issue::CorruptAttributeStream`]; attributes decoded before it are
/// kept. Per-message netlink framing isolates the corruption, so the
/// rest of the dump is unaffected.
pub fn decode_attrs(data: &[u8]) -> (InetAttrs, Vec<Issue>) {
    let mut attrs = InetAttrs::default();
    let mut issues = Vec::new();
    // INET_DIAG_INFO is protocol-opaque and the protocol attribute may
    // arrive after it; capture raw and resolve once the walk is done.
    let mut raw_info: Option<Vec<u8>> = None;

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
            INET_DIAG_NONE | INET_DIAG_PAD => {}
            INET_DIAG_MEMINFO => {
                set_struct(&mut attrs.mem_info, kind, payload, &mut issues);
            }
            INET_DIAG_INFO => {
                raw_info = Some(payload.to_vec());
            }
            INET_DIAG_VEGASINFO => {
                set_struct(&mut attrs.vegas_info, kind, payload, &mut issues);
            }
            INET_DIAG_CONG => {
                let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
                match std::str::from_utf8(&payload[..end]) {
                    Ok(s) => attrs.cong = Some(s.to_string()),
                    Err(_) => issues.push(Issue::InvalidString { kind }),
                }
            }
            INET_DIAG_TOS => set_u8(&mut attrs.tos, kind, payload, &mut issues),
            INET_DIAG_TCLASS => set_u8(&mut attrs.tclass, kind, payload, &mut issues),
            INET_DIAG_SKMEMINFO => {
                set_struct(&mut attrs.sk_mem_info, kind, payload, &mut issues);
            }
            INET_DIAG_SHUTDOWN => set_u8(&mut attrs.shutdown, kind, payload, &mut issues),
            INET_DIAG_DCTCPINFO => {
                set_struct(&mut attrs.dctcp_info, kind, payload, &mut issues);
            }
            INET_DIAG_PROTOCOL => set_u8(&mut attrs.protocol, kind, payload, &mut issues),
            INET_DIAG_SKV6ONLY => set_u8(&mut attrs.skv6only, kind, payload, &mut issues),
            INET_DIAG_MARK => set_u32(&mut attrs.mark, kind, payload, &mut issues),
            INET_DIAG_BBRINFO => {
                set_struct(&mut attrs.bbr_info, kind, payload, &mut issues);
            }
            INET_DIAG_CLASS_ID => set_u32(&mut attrs.class_id, kind, payload, &mut issues),
            INET_DIAG_CGROUP_ID => {
                if payload.len() < 8 {
                    issues.push(Issue::TruncatedAttribute {
                        kind,
                        expected: 8,
                        actual: payload.len(),
                    });
                } else {
                    let mut bytes = [0u8; 8];
                    bytes.copy_from_slice(&payload[..8]);
                    attrs.cgroup_id = Some(u64::from_ne_bytes(bytes));
                }
            }
            INET_DIAG_SOCKOPT => {
                set_struct(&mut attrs.sock_opt, kind, payload, &mut issues);
            }
            _ => issues.push(Issue::UnsupportedAttribute { kind }),
        }
    }

    if let Some(raw) = raw_info {
        resolve_info(&raw, &mut attrs, &mut issues);
    }

    (attrs, issues)
}

/// Resolve the deferred INET_DIAG_INFO payload once the protocol is known.
///
/// Short payloads are zero-padded up to the target structure, so results
/// from older kernels still decode, with the trailing fields at zero.
fn resolve_info(raw: &[u8], attrs: &mut InetAttrs, issues: &mut Vec<Issue>) {
    let Some(protocol) = attrs.protocol else {
        return;
    };
    match protocol as i32 {
        libc::IPPROTO_TCP => attrs.tcp_info = Some(codec::decode_padded(raw)),
        libc::IPPROTO_SCTP => attrs.sctp_info = Some(codec::decode_padded(raw)),
        _ => issues.push(Issue::ExtensionNotImplemented { protocol }),
    }
}

fn set_u8(field: &mut Option<u8>, kind: u16, payload: &[u8], issues: &mut Vec<Issue>) {
    match payload.first() {
        Some(&value) => *field = Some(value),
        None => issues.push(Issue::TruncatedAttribute {
            kind,
            expected: 1,
            actual: 0,
        }),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::put_attr;
    use crate::types::{INET_DIAG_MD5SIG, ext};
    use zerocopy::IntoBytes;

    #[test]
    fn test_decode_simple_attrs() {
        let mut buf = Vec::new();
        put_attr(&mut buf, INET_DIAG_TOS, &[0x10]);
        put_attr(&mut buf, INET_DIAG_MARK, &42u32.to_ne_bytes());
        put_attr(&mut buf, INET_DIAG_CONG, b"cubic\0");

        let (attrs, issues) = decode_attrs(&buf);
        assert!(issues.is_empty());
        assert_eq!(attrs.tos, Some(0x10));
        assert_eq!(attrs.mark, Some(42));
        assert_eq!(attrs.cong.as_deref(), Some("cubic"));
        assert_eq!(attrs.tclass, None);
        assert_eq!(attrs.mem_info, None);
    }

    #[test]
    fn test_decode_is_idempotent() {
        let mut buf = Vec::new();
        put_attr(&mut buf, INET_DIAG_MEMINFO, MemInfo::default().as_bytes());
        put_attr(&mut buf, INET_DIAG_SHUTDOWN, &[2]);

        let first = decode_attrs(&buf);
        let second = decode_attrs(&buf);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_attribute_is_isolated() {
        let mut clean = Vec::new();
        put_attr(&mut clean, INET_DIAG_TOS, &[0x10]);
        put_attr(&mut clean, INET_DIAG_MARK, &42u32.to_ne_bytes());

        let mut dirty = Vec::new();
        put_attr(&mut dirty, INET_DIAG_TOS, &[0x10]);
        put_attr(&mut dirty, INET_DIAG_MD5SIG, &[0xAA; 8]);
        put_attr(&mut dirty, INET_DIAG_MARK, &42u32.to_ne_bytes());

        let (clean_attrs, clean_issues) = decode_attrs(&clean);
        let (dirty_attrs, dirty_issues) = decode_attrs(&dirty);

        // Every decoded field identical, exactly one extra issue.
        assert_eq!(clean_attrs, dirty_attrs);
        assert!(clean_issues.is_empty());
        assert_eq!(
            dirty_issues,
            vec![Issue::UnsupportedAttribute {
                kind: INET_DIAG_MD5SIG
            }]
        );
    }

    #[test]
    fn test_truncated_struct_attribute_is_nonfatal() {
        let mut buf = Vec::new();
        put_attr(&mut buf, INET_DIAG_TOS, &[0x10]);
        put_attr(&mut buf, INET_DIAG_MEMINFO, &[0u8; 8]); // needs 16
        put_attr(&mut buf, INET_DIAG_MARK, &7u32.to_ne_bytes());

        let (attrs, issues) = decode_attrs(&buf);
        assert_eq!(attrs.tos, Some(0x10));
        assert_eq!(attrs.mark, Some(7));
        assert_eq!(attrs.mem_info, None);
        assert_eq!(
            issues,
            vec![Issue::TruncatedAttribute {
                kind: INET_DIAG_MEMINFO,
                expected: 16,
                actual: 8,
            }]
        );
    }

    #[test]
    fn test_repeated_attribute_last_wins() {
        let mut buf = Vec::new();
        put_attr(&mut buf, INET_DIAG_TOS, &[0x10]);
        put_attr(&mut buf, INET_DIAG_TOS, &[0x20]);

        let (attrs, issues) = decode_attrs(&buf);
        assert!(issues.is_empty());
        assert_eq!(attrs.tos, Some(0x20));
    }

    #[test]
    fn test_info_resolved_as_tcp() {
        let info = TcpInfo {
            state: 1,
            retransmits: 3,
            rtt: 1234,
            ..Default::default()
        };
        // Protocol attribute after the opaque payload: order must not matter.
        let mut buf = Vec::new();
        put_attr(&mut buf, INET_DIAG_INFO, info.as_bytes());
        put_attr(&mut buf, INET_DIAG_PROTOCOL, &[libc::IPPROTO_TCP as u8]);

        let (attrs, issues) = decode_attrs(&buf);
        assert!(issues.is_empty());
        let decoded = attrs.tcp_info.unwrap();
        assert_eq!(decoded.state, 1);
        assert_eq!(decoded.retransmits, 3);
        assert_eq!(decoded.rtt, 1234);
        assert_eq!(attrs.sctp_info, None);
    }

    #[test]
    fn test_info_short_payload_zero_padded() {
        // Pre-extension kernels sent only the first 104 bytes.
        let info = TcpInfo {
            state: 10,
            snd_cwnd: 64,
            ..Default::default()
        };
        let mut buf = Vec::new();
        put_attr(&mut buf, INET_DIAG_INFO, &info.as_bytes()[..104]);
        put_attr(&mut buf, INET_DIAG_PROTOCOL, &[libc::IPPROTO_TCP as u8]);

        let (attrs, issues) = decode_attrs(&buf);
        assert!(issues.is_empty());
        let decoded = attrs.tcp_info.unwrap();
        assert_eq!(decoded.state, 10);
        assert_eq!(decoded.snd_cwnd, 64);
        assert_eq!(decoded.pacing_rate, 0);
        assert_eq!(decoded.snd_wnd, 0);
    }

    #[test]
    fn test_info_unimplemented_protocol() {
        let mut buf = Vec::new();
        put_attr(&mut buf, INET_DIAG_TOS, &[0x10]);
        put_attr(&mut buf, INET_DIAG_INFO, &[0u8; 32]);
        put_attr(&mut buf, INET_DIAG_PROTOCOL, &[33]); // DCCP

        let (attrs, issues) = decode_attrs(&buf);
        assert_eq!(attrs.tos, Some(0x10));
        assert_eq!(attrs.protocol, Some(33));
        assert_eq!(attrs.tcp_info, None);
        assert_eq!(attrs.sctp_info, None);
        assert_eq!(
            issues,
            vec![Issue::ExtensionNotImplemented { protocol: 33 }]
        );
    }

    #[test]
    fn test_info_without_protocol_stays_unresolved() {
        let mut buf = Vec::new();
        put_attr(&mut buf, INET_DIAG_INFO, &[0u8; 32]);

        let (attrs, issues) = decode_attrs(&buf);
        assert!(issues.is_empty());
        assert_eq!(attrs.tcp_info, None);
        assert_eq!(attrs.sctp_info, None);
    }

    #[test]
    fn test_from_bytes_header_and_attrs() {
        let msg = InetDiagMsg {
            family: libc::AF_INET as u8,
            state: 1, // ESTABLISHED
            ..Default::default()
        };
        let mut buf = msg.as_bytes().to_vec();
        put_attr(&mut buf, INET_DIAG_TOS, &[0x10]);
        put_attr(&mut buf, INET_DIAG_MARK, &42u32.to_ne_bytes());

        let sock = InetSocket::from_bytes(&buf).unwrap();
        assert_eq!(sock.msg.state, 1);
        assert!(sock.issues.is_empty());
        assert_eq!(sock.attrs.tos, Some(0x10));
        assert_eq!(sock.attrs.mark, Some(42));
        assert_eq!(sock.attrs, InetAttrs {
            tos: Some(0x10),
            mark: Some(42),
            ..Default::default()
        });
    }

    #[test]
    fn test_corrupt_stream_keeps_earlier_attrs() {
        let mut buf = Vec::new();
        put_attr(&mut buf, INET_DIAG_TOS, &[0x10]);
        // Declared length 64 with only 8 bytes behind it.
        buf.extend_from_slice(&64u16.to_ne_bytes());
        buf.extend_from_slice(&1u16.to_ne_bytes());
        buf.extend_from_slice(&[0u8; 4]);

        let (attrs, issues) = decode_attrs(&buf);
        assert_eq!(attrs.tos, Some(0x10));
        assert_eq!(issues.len(), 1);
        assert!(matches!(issues[0], Issue::CorruptAttributeStream { .. }));
    }

    #[test]
    fn test_cong_truncates_at_first_nul() {
        let mut buf = Vec::new();
        put_attr(&mut buf, INET_DIAG_CONG, b"cubic\0\xFF\xFF junk");

        let (attrs, issues) = decode_attrs(&buf);
        assert!(issues.is_empty());
        assert_eq!(attrs.cong.as_deref(), Some("cubic"));
    }

    #[test]
    fn test_socket_serializes_to_json() {
        let msg = InetDiagMsg {
            family: libc::AF_INET as u8,
            state: 1,
            ..Default::default()
        };
        let mut buf = msg.as_bytes().to_vec();
        put_attr(&mut buf, INET_DIAG_TOS, &[0x10]);
        put_attr(&mut buf, INET_DIAG_CONG, b"bbr\0");

        let sock = InetSocket::from_bytes(&buf).unwrap();
        let json = serde_json::to_value(&sock).unwrap();
        assert_eq!(json["msg"]["state"], 1);
        assert_eq!(json["attrs"]["tos"], 0x10);
        assert_eq!(json["attrs"]["cong"], "bbr");
        // Omitted attributes serialize as null, not as absent keys.
        assert_eq!(json["attrs"]["mark"], serde_json::Value::Null);
        assert_eq!(json["issues"], serde_json::json!([]));
    }

    #[test]
    fn test_from_bytes_short_header_is_fatal() {
        assert!(InetSocket::from_bytes(&[0u8; 16]).is_err());
    }

    #[test]
    fn test_ext_bits_are_one_based_shifts() {
        assert_eq!(u16::from(ext::MEMINFO), 1 << (INET_DIAG_MEMINFO - 1));
        assert_eq!(u16::from(ext::INFO), 1 << (INET_DIAG_INFO - 1));
        assert_eq!(u16::from(ext::SKMEMINFO), 1 << (INET_DIAG_SKMEMINFO - 1));
    }
}
