//! Error and non-fatal issue types for socket diagnostics.

use std::io;

use serde::Serialize;

/// Result type for diagnostics operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors: these abort the current dump.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Kernel returned an error code.
    #[error("kernel error: {message} (errno {errno})")]
    Kernel {
        /// The errno value from the kernel.
        errno: i32,
        /// Human-readable error message.
        message: String,
    },

    /// Buffer shorter than a fixed structure's static size.
    #[error("truncated structure: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Static size of the target structure.
        expected: usize,
        /// Actual bytes available.
        actual: usize,
    },

    /// Malformed netlink framing.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Address family that is neither AF_INET nor AF_INET6.
    #[error("expected AF_INET or AF_INET6 as family, but got {0}")]
    UnsupportedFamily(u8),
}

impl Error {
    /// Create a kernel error from a (negative) errno value.
    pub fn from_errno(errno: i32) -> Self {
        let message = io::Error::from_raw_os_error(-errno).to_string();
        Self::Kernel {
            errno: -errno,
            message,
        }
    }

    /// Check if this is a permission error (EPERM, EACCES).
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } => matches!(*errno, 1 | 13),
            _ => false,
        }
    }

    /// Get the errno value if this is a kernel error.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Kernel { errno, .. } => Some(*errno),
            _ => None,
        }
    }
}

/// Non-fatal decode issues, accumulated per socket.
///
/// One bad or unknown attribute never suppresses the rest of a socket's
/// information: decoding continues and the issue is recorded here, in
/// stream order. An empty list signals a clean decode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum Issue {
    /// Attribute type code with no known decoder.
    #[error("attribute type {kind} not implemented")]
    UnsupportedAttribute {
        /// The raw attribute type code.
        kind: u16,
    },

    /// Attribute payload shorter than its fixed structure.
    #[error("attribute type {kind} truncated: expected {expected} bytes, got {actual}")]
    TruncatedAttribute {
        /// The raw attribute type code.
        kind: u16,
        /// Static size of the target structure.
        expected: usize,
        /// Actual payload length.
        actual: usize,
    },

    /// String attribute that is not valid UTF-8.
    #[error("attribute type {kind} is not valid UTF-8")]
    InvalidString {
        /// The raw attribute type code.
        kind: u16,
    },

    /// Protocol-specific extension with no implemented decoder.
    #[error("protocol {protocol} extension not implemented")]
    ExtensionNotImplemented {
        /// The raw IPPROTO_* value.
        protocol: u8,
    },

    /// TLV entry whose declared length overruns the attribute buffer.
    ///
    /// Every later offset in the stream is unverifiable, so the walk
    /// stops here; attributes decoded before this point are kept.
    #[error("attribute stream corrupt: {detail}")]
    CorruptAttributeStream {
        /// What the walker tripped over.
        detail: String,
    },
}
