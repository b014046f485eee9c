//! Socket diagnostics for Linux via NETLINK_SOCK_DIAG.
//!
//! This crate enumerates live TCP, UDP, raw, and unix-domain sockets and
//! their extended state (congestion-control info, memory usage, socket
//! options) directly from the kernel socket tables, without parsing
//! `/proc`.
//!
//! The core is a wire-format codec: typed queries are encoded into the
//! fixed kernel ABI request structures, and responses — a fixed-size
//! header followed by a stream of netlink attributes — are decoded
//! best-effort. One unknown or malformed attribute never suppresses the
//! rest of a socket's information; such problems are accumulated as
//! ordered, non-fatal [`Issue`]s on the result.
//!
//! # Example
//!
//! ```ignore
//! use sdiag::{Config, Diag};
//! use sdiag::addr::{ntohs, to_addr_with_family};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let diag = Diag::open(&Config::default())?;
//!
//!     for sock in diag.dump_tcp().await? {
//!         let src = to_addr_with_family(sock.msg.family, &sock.msg.id.src)?;
//!         println!("{}:{}", src, ntohs(sock.msg.id.sport));
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Namespaces
//!
//! Pass a namespace file path in [`Config`] to query another network
//! namespace:
//!
//! ```ignore
//! let diag = Diag::open(&Config {
//!     netns: Some("/var/run/netns/myns".into()),
//!     ..Default::default()
//! })?;
//! ```
//!
//! # Concurrency
//!
//! A session performs one dump at a time and holds no internal locking;
//! the decode paths are pure and stateless. For parallel dumps, open one
//! session per task, each with its own socket.

pub mod addr;
pub mod attr;
pub mod codec;
pub mod error;
pub mod inet;
pub mod message;
pub mod session;
pub mod socket;
pub mod transport;
pub mod types;
pub mod unix;

pub use error::{Error, Issue, Result};
pub use inet::{InetAttrs, InetSocket};
pub use session::{Config, Diag, InetQuery, UnixQuery};
pub use transport::{NetlinkTransport, Transport};
pub use types::{AddressFamily, Protocol};
pub use unix::{UnixAttrs, UnixSocket};
