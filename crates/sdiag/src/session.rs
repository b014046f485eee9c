//! Diagnostics session: one request/response dump cycle per call.

use std::path::PathBuf;

use tracing::debug;

use crate::codec;
use crate::error::Result;
use crate::inet::InetSocket;
use crate::socket::DiagSocket;
use crate::transport::{NetlinkTransport, Transport};
use crate::types::{
    ALL_STATES, AddressFamily, InetDiagReqV2, Protocol, SockId, UnixDiagReq, show,
};
use crate::unix::UnixSocket;

/// Options for opening a session.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Network namespace to query, as a namespace file path
    /// (e.g. `/var/run/netns/<name>` or `/proc/<pid>/ns/net`).
    /// `None` queries the caller's namespace.
    pub netns: Option<PathBuf>,
    /// Receive buffer size (SO_RCVBUF) for the netlink socket.
    /// `None` keeps the system default.
    pub recv_buffer: Option<usize>,
}

/// Query parameters for one inet dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InetQuery {
    pub family: AddressFamily,
    pub protocol: Protocol,
    /// Socket-state bitmask; [`ALL_STATES`] requests every state.
    pub states: u32,
    /// Request-extension bitmask, see [`crate::types::ext`].
    pub ext: u8,
}

impl InetQuery {
    /// Build the fixed-size kernel request structure.
    pub fn to_request(&self) -> InetDiagReqV2 {
        InetDiagReqV2 {
            family: self.family.raw(),
            protocol: self.protocol.raw(),
            ext: self.ext,
            pad: 0,
            states: self.states,
            id: SockId::default(),
        }
    }
}

/// Query parameters for one unix dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnixQuery {
    /// Socket-state bitmask.
    pub states: u32,
    /// Attribute-selection bitmask, see [`crate::types::show`].
    pub show: u32,
}

impl UnixQuery {
    /// Build the fixed-size kernel request structure.
    pub fn to_request(&self) -> UnixDiagReq {
        UnixDiagReq {
            family: AddressFamily::Unix.raw(),
            protocol: 0,
            pad: 0,
            states: self.states,
            ino: 0,
            show: self.show,
            cookie: [0; 2],
        }
    }
}

/// A socket-diagnostics session over one transport connection.
///
/// One dump is in flight at a time; callers wanting parallel dumps use
/// separate sessions, each with its own connection.
pub struct Diag<T = NetlinkTransport> {
    transport: T,
}

impl Diag<NetlinkTransport> {
    /// Open a session over a new NETLINK_SOCK_DIAG socket.
    pub fn open(config: &Config) -> Result<Self> {
        let socket = match &config.netns {
            Some(path) => DiagSocket::new_in_namespace_path(path)?,
            None => DiagSocket::new()?,
        };
        if let Some(size) = config.recv_buffer {
            socket.set_recv_buffer_size(size)?;
        }
        Ok(Self::with_transport(NetlinkTransport::new(socket)))
    }
}

impl<T: Transport> Diag<T> {
    /// Build a session over an existing transport.
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    /// Dump inet sockets matching `query`.
    ///
    /// A short fixed header in any response aborts the whole dump; every
    /// attribute-level problem is carried per socket in its issue list.
    pub async fn dump_inet(&self, query: &InetQuery) -> Result<Vec<InetSocket>> {
        let request = query.to_request();
        let messages = self.transport.dump(codec::encode(&request)).await?;

        let mut results = Vec::with_capacity(messages.len());
        for message in &messages {
            results.push(InetSocket::from_bytes(message)?);
        }
        debug!(
            family = ?query.family,
            protocol = ?query.protocol,
            states = query.states,
            count = results.len(),
            "inet dump complete"
        );
        Ok(results)
    }

    /// Dump unix sockets matching `query`.
    pub async fn dump_unix_query(&self, query: &UnixQuery) -> Result<Vec<UnixSocket>> {
        let request = query.to_request();
        let messages = self.transport.dump(codec::encode(&request)).await?;

        let mut results = Vec::with_capacity(messages.len());
        for message in &messages {
            results.push(UnixSocket::from_bytes(message)?);
        }
        debug!(
            states = query.states,
            show = query.show,
            count = results.len(),
            "unix dump complete"
        );
        Ok(results)
    }

    /// Dump all TCP sockets across IPv4 and IPv6, every state.
    pub async fn dump_tcp(&self) -> Result<Vec<InetSocket>> {
        self.dump_both_families(Protocol::Tcp, 0).await
    }

    /// Dump all UDP sockets across IPv4 and IPv6, every state.
    pub async fn dump_udp(&self) -> Result<Vec<InetSocket>> {
        self.dump_both_families(Protocol::Udp, 0).await
    }

    /// Dump all raw sockets across IPv4 and IPv6, every state.
    pub async fn dump_raw(&self) -> Result<Vec<InetSocket>> {
        self.dump_both_families(Protocol::Raw, 0).await
    }

    /// Dump all unix sockets with every optional attribute requested.
    pub async fn dump_unix(&self) -> Result<Vec<UnixSocket>> {
        self.dump_unix_query(&UnixQuery {
            states: ALL_STATES,
            show: show::ALL,
        })
        .await
    }

    async fn dump_both_families(&self, protocol: Protocol, ext: u8) -> Result<Vec<InetSocket>> {
        let mut results = Vec::new();
        for family in [AddressFamily::Inet, AddressFamily::Inet6] {
            let query = InetQuery {
                family,
                protocol,
                states: ALL_STATES,
                ext,
            };
            results.extend(self.dump_inet(&query).await?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::put_attr;
    use crate::error::{Error, Issue};
    use zerocopy::IntoBytes;
    use crate::types::{INET_DIAG_MARK, INET_DIAG_TOS, InetDiagMsg};
    use std::sync::Mutex;

    /// Canned transport: records request payloads, replays fixed frames.
    struct MockTransport {
        requests: Mutex<Vec<Vec<u8>>>,
        frames: Vec<Vec<u8>>,
    }

    impl MockTransport {
        fn new(frames: Vec<Vec<u8>>) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                frames,
            }
        }
    }

    impl Transport for MockTransport {
        async fn dump(&self, payload: &[u8]) -> Result<Vec<Vec<u8>>> {
            self.requests.lock().unwrap().push(payload.to_vec());
            Ok(self.frames.clone())
        }
    }

    fn established_message() -> Vec<u8> {
        let msg = InetDiagMsg {
            family: libc::AF_INET as u8,
            state: 1, // ESTABLISHED
            ..Default::default()
        };
        let mut buf = msg.as_bytes().to_vec();
        put_attr(&mut buf, INET_DIAG_TOS, &[0x10]);
        put_attr(&mut buf, INET_DIAG_MARK, &42u32.to_ne_bytes());
        buf
    }

    #[tokio::test]
    async fn test_end_to_end_synthetic_dump() {
        let diag = Diag::with_transport(MockTransport::new(vec![established_message()]));

        let query = InetQuery {
            family: AddressFamily::Inet,
            protocol: Protocol::Tcp,
            states: ALL_STATES,
            ext: 0,
        };
        let sockets = diag.dump_inet(&query).await.unwrap();
        assert_eq!(sockets.len(), 1);

        let sock = &sockets[0];
        assert_eq!(sock.msg.state, 1);
        assert!(sock.issues.is_empty());
        assert_eq!(sock.attrs.tos, Some(16));
        assert_eq!(sock.attrs.mark, Some(42));
        // Every other optional field absent.
        assert_eq!(sock.attrs, crate::inet::InetAttrs {
            tos: Some(16),
            mark: Some(42),
            ..Default::default()
        });
    }

    #[tokio::test]
    async fn test_request_encoding_round_trips() {
        let transport = MockTransport::new(Vec::new());
        let diag = Diag::with_transport(transport);

        let query = InetQuery {
            family: AddressFamily::Inet6,
            protocol: Protocol::Tcp,
            states: 1 << 10, // LISTEN
            ext: crate::types::ext::INFO,
        };
        diag.dump_inet(&query).await.unwrap();

        let requests = diag.transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let back: InetDiagReqV2 = codec::decode(&requests[0]).unwrap();
        assert_eq!(back, query.to_request());
        assert_eq!(back.family, libc::AF_INET6 as u8);
        assert_eq!(back.states, 1 << 10);
    }

    #[tokio::test]
    async fn test_tcp_fan_out_concatenates_families() {
        let diag = Diag::with_transport(MockTransport::new(vec![established_message()]));

        let sockets = diag.dump_tcp().await.unwrap();
        // One canned message per family dump.
        assert_eq!(sockets.len(), 2);

        let requests = diag.transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        let first: InetDiagReqV2 = codec::decode(&requests[0]).unwrap();
        let second: InetDiagReqV2 = codec::decode(&requests[1]).unwrap();
        assert_eq!(first.family, libc::AF_INET as u8);
        assert_eq!(second.family, libc::AF_INET6 as u8);
        assert_eq!(first.states, ALL_STATES);
    }

    #[tokio::test]
    async fn test_corrupt_attr_stream_keeps_other_sockets() {
        // Valid header and TOS attribute, then a TLV declaring 64 bytes
        // with only 8 behind it.
        let msg = InetDiagMsg {
            family: libc::AF_INET as u8,
            state: 4, // FIN_WAIT1
            ..Default::default()
        };
        let mut corrupt = msg.as_bytes().to_vec();
        put_attr(&mut corrupt, INET_DIAG_TOS, &[0x10]);
        corrupt.extend_from_slice(&64u16.to_ne_bytes());
        corrupt.extend_from_slice(&1u16.to_ne_bytes());
        corrupt.extend_from_slice(&[0u8; 4]);

        let diag = Diag::with_transport(MockTransport::new(vec![
            established_message(),
            corrupt,
        ]));
        let query = InetQuery {
            family: AddressFamily::Inet,
            protocol: Protocol::Tcp,
            states: ALL_STATES,
            ext: 0,
        };

        // Per-socket corruption never costs the rest of the dump.
        let sockets = diag.dump_inet(&query).await.unwrap();
        assert_eq!(sockets.len(), 2);
        assert!(sockets[0].issues.is_empty());
        assert_eq!(sockets[1].msg.state, 4);
        assert_eq!(sockets[1].attrs.tos, Some(0x10));
        assert!(matches!(
            sockets[1].issues[..],
            [Issue::CorruptAttributeStream { .. }]
        ));
    }

    #[tokio::test]
    async fn test_short_fixed_header_aborts_dump() {
        let diag = Diag::with_transport(MockTransport::new(vec![
            established_message(),
            vec![0u8; 16], // shorter than InetDiagMsg
        ]));

        let query = InetQuery {
            family: AddressFamily::Inet,
            protocol: Protocol::Tcp,
            states: ALL_STATES,
            ext: 0,
        };
        let err = diag.dump_inet(&query).await.unwrap_err();
        assert!(matches!(err, Error::Truncated { expected: 72, .. }));
    }

    #[tokio::test]
    async fn test_unix_request_encoding() {
        let diag = Diag::with_transport(MockTransport::new(Vec::new()));
        diag.dump_unix().await.unwrap();

        let requests = diag.transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let back: UnixDiagReq = codec::decode(&requests[0]).unwrap();
        assert_eq!(back.family, libc::AF_UNIX as u8);
        assert_eq!(back.states, ALL_STATES);
        assert_eq!(back.show, show::ALL);
    }
}
