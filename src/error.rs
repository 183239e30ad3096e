//! Error taxonomy shared by every component.
//!
//! Each module keeps its own `thiserror` enum; `ErrorKind` is the coarse
//! classification callers branch on (and the HTTP layer maps to status codes).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Slot or file absent.
    NotFound,
    /// Bytes do not parse as the expected document or image shape.
    InvalidFormat,
    /// A schema rule or image dimension/encoding rule was violated.
    ValidationFailed,
    /// A resolved path escapes its sandbox root.
    Forbidden,
    /// The state provider is unreachable or answered with an error.
    UpstreamUnavailable,
    /// Filesystem faults and anything else the caller cannot fix.
    Fatal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidFormat => "invalid_format",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::UpstreamUnavailable => "upstream_unavailable",
            ErrorKind::Fatal => "fatal",
        };
        f.write_str(name)
    }
}
