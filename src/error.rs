//! Error types for the packtern codec.

use crate::wire::WireType;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors the codec raises.
///
/// Everything here is fatal to the stream except [`Error::TypeMismatch`],
/// which the object binder recovers from locally at field boundaries by
/// skipping the offending value (the low-level API treats it as fatal to
/// the call).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unexpected end of stream inside a token")]
    Truncated,

    #[error("malformed token: 0x{0:02X}")]
    MalformedToken(u8),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: WireType,
    },

    #[error("use of undefined key id {0}")]
    UnknownKeyId(u32),

    #[error("use of undefined struct id {0}")]
    UnknownStructId(u32),

    #[error("{what} limit exceeded: {actual} > {limit}")]
    LimitExceeded {
        what: &'static str,
        actual: usize,
        limit: usize,
    },

    #[error("invalid nesting: {0}")]
    InvalidNesting(&'static str),

    #[error("unsupported target: {0}")]
    UnsupportedTarget(&'static str),

    #[error("invalid UTF-8 in string payload")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("I/O error: {0}")]
    Io(std::io::Error),
}

impl From<std::io::Error> for Error {
    /// End-of-file from the source is a truncated token by the time it
    /// reaches the codec; everything else passes through as I/O.
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::Truncated
        } else {
            Self::Io(e)
        }
    }
}

impl Error {
    /// Shorthand for a [`Error::TypeMismatch`] at a typed read.
    pub(crate) fn mismatch(expected: &'static str, found: WireType) -> Self {
        Self::TypeMismatch { expected, found }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_becomes_truncated() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        assert!(matches!(Error::from(io), Error::Truncated));
    }

    #[test]
    fn other_io_passes_through() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        assert!(matches!(Error::from(io), Error::Io(_)));
    }
}
