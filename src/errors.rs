//! Closed result-code enumeration shared by every table and chain operation.

use crate::caps::Capability;
use core::fmt;

/// Every fallible operation in the crate reports one of these codes.
/// Nothing panics or aborts on these paths; multi-step operations either
/// complete or leave the structure as it was (or, for copy-over, empty).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A capability required by the requested operation is not configured.
    Missing(Capability),
    /// The table was destroyed (or a builder produced no table); the
    /// operation was rejected before touching any state.
    NotInitialized,
    /// An argument is outside the accepted domain: zero bucket counts,
    /// or a fixed key width other than 1, 2, 4, or 8 bytes.
    InvalidArgument,
    /// A user copier declined to produce a copy.
    AllocFailed,
    /// No entry matched the key under the configured comparator.
    NotFound,
    /// An equal key is already present; insert never upserts.
    AlreadyExists,
    /// A bucket index at or past the current bucket count.
    OutOfBounds,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Missing(cap) => write!(f, "required {} capability is not set", cap),
            Error::NotInitialized => write!(f, "table is not initialized"),
            Error::InvalidArgument => write!(f, "invalid argument"),
            Error::AllocFailed => write!(f, "element copy reported allocation failure"),
            Error::NotFound => write!(f, "key not found"),
            Error::AlreadyExists => write!(f, "key already exists"),
            Error::OutOfBounds => write!(f, "bucket index out of bounds"),
        }
    }
}

impl std::error::Error for Error {}
