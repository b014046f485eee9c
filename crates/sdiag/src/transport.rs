//! Transport seam between the session and the netlink socket.

use tracing::trace;

use crate::error::{Error, Result};
use crate::message::{MessageIter, NLM_F_DUMP, NLM_F_REQUEST, NlMsgError, build_message};
use crate::socket::DiagSocket;
use crate::types::SOCK_DIAG_BY_FAMILY;

/// The transport a [`crate::Diag`] session dumps through.
///
/// Implementations own sequence-number correlation and dump-completion
/// detection; the session only sees the per-socket message payloads
/// (netlink header already stripped). Tests inject a canned
/// implementation; production uses [`NetlinkTransport`].
pub trait Transport {
    /// Submit `payload` as a SOCK_DIAG_BY_FAMILY dump request and collect
    /// the payloads of all response messages until the dump completes.
    fn dump(&self, payload: &[u8]) -> impl Future<Output = Result<Vec<Vec<u8>>>> + Send;
}

/// Real transport over an async NETLINK_SOCK_DIAG socket.
pub struct NetlinkTransport {
    socket: DiagSocket,
}

impl NetlinkTransport {
    pub fn new(socket: DiagSocket) -> Self {
        Self { socket }
    }

    pub fn socket(&self) -> &DiagSocket {
        &self.socket
    }
}

impl Transport for NetlinkTransport {
    async fn dump(&self, payload: &[u8]) -> Result<Vec<Vec<u8>>> {
        let seq = self.socket.next_seq();
        let msg = build_message(
            SOCK_DIAG_BY_FAMILY,
            NLM_F_REQUEST | NLM_F_DUMP,
            seq,
            self.socket.pid(),
            payload,
        );
        self.socket.send(&msg).await?;

        let mut responses = Vec::new();

        loop {
            let data = self.socket.recv_msg().await?;

            for result in MessageIter::new(&data) {
                let (header, payload) = result?;

                if header.nlmsg_seq != seq {
                    trace!(
                        seq = header.nlmsg_seq,
                        expected = seq,
                        "skipping foreign-sequence message"
                    );
                    continue;
                }

                if header.is_error() {
                    let err = NlMsgError::from_bytes(payload)?;
                    if !err.is_ack() {
                        return Err(Error::from_errno(err.error));
                    }
                    continue;
                }

                if header.is_done() {
                    return Ok(responses);
                }

                responses.push(payload.to_vec());
            }
        }
    }
}
