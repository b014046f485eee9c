//! Kernel ABI structures and protocol constants for NETLINK_SOCK_DIAG.
//!
//! Every `#[repr(C)]` structure here mirrors the corresponding kernel
//! structure field for field, in host-native byte order, including
//! reserved/padding fields (emitted as zero, ignored on read). The
//! zerocopy derives enforce that the layouts contain no compiler padding
//! and nothing but primitive integers, fixed arrays, and nested fixed
//! structures.

use serde::Serialize;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Message type for socket diagnostics requests and responses.
pub const SOCK_DIAG_BY_FAMILY: u16 = 20;

// inet_diag attribute type codes (enum inet_diag_attr).
pub const INET_DIAG_NONE: u16 = 0;
pub const INET_DIAG_MEMINFO: u16 = 1;
pub const INET_DIAG_INFO: u16 = 2;
pub const INET_DIAG_VEGASINFO: u16 = 3;
pub const INET_DIAG_CONG: u16 = 4;
pub const INET_DIAG_TOS: u16 = 5;
pub const INET_DIAG_TCLASS: u16 = 6;
pub const INET_DIAG_SKMEMINFO: u16 = 7;
pub const INET_DIAG_SHUTDOWN: u16 = 8;
pub const INET_DIAG_DCTCPINFO: u16 = 9;
pub const INET_DIAG_PROTOCOL: u16 = 10;
pub const INET_DIAG_SKV6ONLY: u16 = 11;
pub const INET_DIAG_LOCALS: u16 = 12;
pub const INET_DIAG_PEERS: u16 = 13;
pub const INET_DIAG_PAD: u16 = 14;
pub const INET_DIAG_MARK: u16 = 15;
pub const INET_DIAG_BBRINFO: u16 = 16;
pub const INET_DIAG_CLASS_ID: u16 = 17;
pub const INET_DIAG_MD5SIG: u16 = 18;
pub const INET_DIAG_ULP_INFO: u16 = 19;
pub const INET_DIAG_SK_BPF_STORAGES: u16 = 20;
pub const INET_DIAG_CGROUP_ID: u16 = 21;
pub const INET_DIAG_SOCKOPT: u16 = 22;

// unix_diag attribute type codes (enum unix_diag_attr).
pub const UNIX_DIAG_NAME: u16 = 0;
pub const UNIX_DIAG_VFS: u16 = 1;
pub const UNIX_DIAG_PEER: u16 = 2;
pub const UNIX_DIAG_ICONS: u16 = 3;
pub const UNIX_DIAG_RQLEN: u16 = 4;
pub const UNIX_DIAG_MEMINFO: u16 = 5;
pub const UNIX_DIAG_SHUTDOWN: u16 = 6;
pub const UNIX_DIAG_UID: u16 = 7;

/// Socket address family selectable in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AddressFamily {
    /// IPv4.
    Inet,
    /// IPv6.
    Inet6,
    /// Unix domain sockets.
    Unix,
}

impl AddressFamily {
    /// Get the raw AF_* value.
    pub fn raw(&self) -> u8 {
        match self {
            Self::Inet => libc::AF_INET as u8,
            Self::Inet6 => libc::AF_INET6 as u8,
            Self::Unix => libc::AF_UNIX as u8,
        }
    }
}

/// Transport protocol selectable in an inet query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Protocol {
    /// TCP.
    Tcp,
    /// UDP.
    Udp,
    /// Raw IP.
    Raw,
    /// SCTP.
    Sctp,
}

impl Protocol {
    /// Get the raw IPPROTO_* value.
    pub fn raw(&self) -> u8 {
        match self {
            Self::Tcp => libc::IPPROTO_TCP as u8,
            Self::Udp => libc::IPPROTO_UDP as u8,
            Self::Raw => libc::IPPROTO_RAW as u8,
            Self::Sctp => libc::IPPROTO_SCTP as u8,
        }
    }
}

/// Bitmask covering every kernel socket state.
pub const ALL_STATES: u32 = !0;

/// Request-extension bits for `InetDiagReqV2::ext` (1 << (INET_DIAG_* - 1)).
pub mod ext {
    pub const MEMINFO: u8 = 1 << 0;
    pub const INFO: u8 = 1 << 1;
    pub const VEGASINFO: u8 = 1 << 2;
    pub const CONG: u8 = 1 << 3;
    pub const TOS: u8 = 1 << 4;
    pub const TCLASS: u8 = 1 << 5;
    pub const SKMEMINFO: u8 = 1 << 6;
    pub const SHUTDOWN: u8 = 1 << 7;
}

/// Show bits for `UnixDiagReq::show`, selecting optional attributes.
pub mod show {
    pub const NAME: u32 = 0x0000_0001;
    pub const VFS: u32 = 0x0000_0002;
    pub const PEER: u32 = 0x0000_0004;
    pub const ICONS: u32 = 0x0000_0008;
    pub const RQLEN: u32 = 0x0000_0010;
    pub const MEMINFO: u32 = 0x0000_0020;
    pub const UID: u32 = 0x0000_0040;

    /// Everything the kernel can include.
    pub const ALL: u32 = NAME | VFS | PEER | ICONS | RQLEN | MEMINFO | UID;
}

/// Socket identifier (mirrors struct inet_diag_sockid).
///
/// `sport` and `dport` stay in network byte order until explicitly
/// converted with [`crate::addr::ntohs`]; `src` and `dst` are raw address
/// words interpreted by [`crate::addr::to_addr_with_family`].
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
    Serialize,
)]
pub struct SockId {
    /// Source port, network byte order.
    pub sport: u16,
    /// Destination port, network byte order.
    pub dport: u16,
    /// Source address words; meaning depends on the message family.
    pub src: [u32; 4],
    /// Destination address words; meaning depends on the message family.
    pub dst: [u32; 4],
    /// Interface index.
    pub iface: u32,
    /// Kernel socket cookie.
    pub cookie: [u32; 2],
}

/// Inet dump request (mirrors struct inet_diag_req_v2).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct InetDiagReqV2 {
    pub family: u8,
    pub protocol: u8,
    /// Request-extension bitmask, see [`ext`].
    pub ext: u8,
    /// Reserved, must be zero.
    pub pad: u8,
    /// Socket-state bitmask, one bit per kernel state.
    pub states: u32,
    pub id: SockId,
}

/// Unix dump request (mirrors struct unix_diag_req).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct UnixDiagReq {
    pub family: u8,
    pub protocol: u8,
    /// Reserved, must be zero.
    pub pad: u16,
    /// Socket-state bitmask.
    pub states: u32,
    /// Restrict to a single inode, 0 for all.
    pub ino: u32,
    /// Attribute-selection bitmask, see [`show`].
    pub show: u32,
    pub cookie: [u32; 2],
}

/// Fixed response header for inet sockets (mirrors struct inet_diag_msg).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
    Serialize,
)]
pub struct InetDiagMsg {
    pub family: u8,
    pub state: u8,
    pub timer: u8,
    pub retrans: u8,
    pub id: SockId,
    pub expires: u32,
    pub rqueue: u32,
    pub wqueue: u32,
    pub uid: u32,
    pub inode: u32,
}

/// Fixed response header for unix sockets (mirrors struct unix_diag_msg).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
    Serialize,
)]
pub struct UnixDiagMsg {
    pub family: u8,
    /// Socket type (SOCK_STREAM, SOCK_DGRAM, SOCK_SEQPACKET).
    pub kind: u8,
    pub state: u8,
    /// Reserved, must be zero.
    pub pad: u8,
    pub ino: u32,
    pub cookie: [u32; 2],
}

/// Memory usage (mirrors struct inet_diag_meminfo).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
    Serialize,
)]
pub struct MemInfo {
    pub rmem: u32,
    pub wmem: u32,
    pub fmem: u32,
    pub tmem: u32,
}

/// Socket memory counters (SK_MEMINFO_* array, see sock_diag(7)).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
    Serialize,
)]
pub struct SkMemInfo {
    /// Data in the receive queue.
    pub rmem_alloc: u32,
    /// Receive buffer as set by SO_RCVBUF.
    pub rcvbuf: u32,
    /// Data in the send queue.
    pub wmem_alloc: u32,
    /// Send buffer as set by SO_SNDBUF.
    pub sndbuf: u32,
    /// Memory scheduled for future use (TCP only).
    pub fwd_alloc: u32,
    /// Data queued by TCP but not yet sent.
    pub wmem_queued: u32,
    /// Memory allocated for the socket's service needs.
    pub optmem: u32,
    /// Packets in the backlog, not yet processed.
    pub backlog: u32,
    pub drops: u32,
}

/// Vegas congestion stats (mirrors struct tcpvegas_info).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
    Serialize,
)]
pub struct VegasInfo {
    pub enabled: u32,
    pub rttcnt: u32,
    pub rtt: u32,
    pub minrtt: u32,
}

/// DCTCP congestion stats (mirrors struct tcp_dctcp_info).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
    Serialize,
)]
pub struct DctcpInfo {
    pub enabled: u16,
    pub ce_state: u16,
    pub alpha: u32,
    pub ab_ecn: u32,
    pub ab_tot: u32,
}

/// BBR congestion stats (mirrors struct tcp_bbr_info).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
    Serialize,
)]
pub struct BbrInfo {
    pub bw_lo: u32,
    pub bw_hi: u32,
    pub min_rtt: u32,
    pub pacing_gain: u32,
    pub cwnd_gain: u32,
}

/// Socket-option bitfields (mirrors struct inet_diag_sockopt).
///
/// `bitfield1` packs recverr:1, is_icsk:1, freebind:1, hdrincl:1,
/// mc_loop:1, transparent:1, mc_all:1, nodefrag:1; `bitfield2` packs
/// bind_address_no_port:1, recverr_rfc4884:1, defer_connect:1.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
    Serialize,
)]
pub struct SockOpt {
    pub bitfield1: u8,
    pub bitfield2: u8,
}

/// VFS identity of a bound unix socket (mirrors struct unix_diag_vfs).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
    Serialize,
)]
pub struct UnixDiagVfs {
    pub ino: u32,
    pub dev: u32,
}

/// Queue lengths of a unix socket (mirrors struct unix_diag_rqlen).
///
/// For listening sockets these are the pending-connection counts; for
/// established sockets, queued bytes.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
    Serialize,
)]
pub struct UnixDiagRqLen {
    pub rqueue: u32,
    pub wqueue: u32,
}

/// TCP statistics (mirrors struct tcp_info through tcpi_snd_wnd, 232 bytes).
///
/// Kernels older than the struct send a prefix; the extension resolver
/// zero-pads before decoding, so trailing fields read as zero there.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
    Serialize,
)]
pub struct TcpInfo {
    pub state: u8,
    pub ca_state: u8,
    pub retransmits: u8,
    pub probes: u8,
    pub backoff: u8,
    pub options: u8,
    /// snd_wscale:4, rcv_wscale:4.
    pub wscale: u8,
    /// delivery_rate_app_limited:1, fastopen_client_fail:2.
    pub app_limited: u8,

    pub rto: u32,
    pub ato: u32,
    pub snd_mss: u32,
    pub rcv_mss: u32,

    pub unacked: u32,
    pub sacked: u32,
    pub lost: u32,
    pub retrans: u32,
    pub fackets: u32,

    pub last_data_sent: u32,
    pub last_ack_sent: u32,
    pub last_data_recv: u32,
    pub last_ack_recv: u32,

    pub pmtu: u32,
    pub rcv_ssthresh: u32,
    pub rtt: u32,
    pub rttvar: u32,
    pub snd_ssthresh: u32,
    pub snd_cwnd: u32,
    pub advmss: u32,
    pub reordering: u32,

    pub rcv_rtt: u32,
    pub rcv_space: u32,

    pub total_retrans: u32,

    pub pacing_rate: u64,
    pub max_pacing_rate: u64,
    pub bytes_acked: u64,
    pub bytes_received: u64,
    pub segs_out: u32,
    pub segs_in: u32,

    pub notsent_bytes: u32,
    pub min_rtt: u32,
    pub data_segs_in: u32,
    pub data_segs_out: u32,

    pub delivery_rate: u64,

    pub busy_time: u64,
    pub rwnd_limited: u64,
    pub sndbuf_limited: u64,

    pub delivered: u32,
    pub delivered_ce: u32,

    pub bytes_sent: u64,
    pub bytes_retrans: u64,
    pub dsack_dups: u32,
    pub reord_seen: u32,

    pub rcv_ooopack: u32,
    pub snd_wnd: u32,
}

impl TcpInfo {
    /// Send window scale (high nibble of wscale).
    pub fn snd_wscale(&self) -> u8 {
        self.wscale >> 4
    }

    /// Receive window scale (low nibble of wscale).
    pub fn rcv_wscale(&self) -> u8 {
        self.wscale & 0x0f
    }
}

/// SCTP association statistics (fixed prefix of struct sctp_info through
/// sctpi_ictrlchunks, 168 bytes).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
    Serialize,
)]
pub struct SctpInfo {
    pub tag: u32,
    pub state: u32,
    pub rwnd: u32,
    pub unackdata: u16,
    pub penddata: u16,
    pub instrms: u16,
    pub outstrms: u16,
    pub fragmentation_point: u32,
    pub inqueue: u32,
    pub outqueue: u32,
    pub overall_error: u32,
    pub max_burst: u32,
    pub maxseg: u32,
    pub peer_rwnd: u32,
    pub peer_tag: u32,
    pub peer_capable: u8,
    pub peer_sack: u8,
    /// Reserved, must be zero.
    pub reserved1: u16,

    pub isacks: u64,
    pub osacks: u64,
    pub opackets: u64,
    pub ipackets: u64,
    pub rtxchunks: u64,
    pub outofseqtsns: u64,
    pub idupchunks: u64,
    pub gapcnt: u64,
    pub ouodchunks: u64,
    pub iuodchunks: u64,
    pub oodchunks: u64,
    pub iodchunks: u64,
    pub octrlchunks: u64,
    pub ictrlchunks: u64,
}
