//! Error types for slotcache

use std::fmt;
use std::io;

/// Result type alias for slotcache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache construction and access
#[derive(Debug)]
pub enum Error {
    /// Key size must be at least one byte
    InvalidKeySize(usize),

    /// Value size must be at least one byte
    InvalidValueSize(usize),

    /// Region cannot hold a single slot
    RegionTooSmall {
        /// Requested region size in bytes
        size: usize,
        /// Minimum size: one full slot
        min: usize,
    },

    /// No hash function was supplied
    MissingHashFunction,

    /// A required builder parameter was never set
    MissingParameter(&'static str),

    /// Slot geometry does not fit in `usize`
    SizeOverflow,

    /// Key length differs from the configured key size
    KeyLength {
        /// Length of the supplied key
        actual: usize,
        /// Configured key size
        expected: usize,
    },

    /// Value length differs from the configured value size
    ValueLength {
        /// Length of the supplied value
        actual: usize,
        /// Configured value size
        expected: usize,
    },

    /// Anonymous mapping could not be created
    Alloc(io::Error),

    /// System allocator refused a region of this size
    AllocLayout(usize),

    /// OS entropy source failed while seeding randomized hash tables
    Entropy(getrandom::Error),
}

impl Error {
    /// Returns true for errors raised while constructing a cache from bad parameters.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::InvalidKeySize(_)
                | Error::InvalidValueSize(_)
                | Error::RegionTooSmall { .. }
                | Error::MissingHashFunction
                | Error::MissingParameter(_)
                | Error::SizeOverflow
        )
    }

    /// Returns true for errors raised by `put`/`get` on malformed input.
    pub fn is_input(&self) -> bool {
        matches!(self, Error::KeyLength { .. } | Error::ValueLength { .. })
    }

    /// Returns true when the backing memory could not be obtained.
    pub fn is_resource(&self) -> bool {
        matches!(self, Error::Alloc(_) | Error::AllocLayout(_) | Error::Entropy(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidKeySize(size) => {
                write!(f, "Invalid key size {} (must be larger than zero)", size)
            }
            Error::InvalidValueSize(size) => {
                write!(f, "Invalid value size {} (must be larger than zero)", size)
            }
            Error::RegionTooSmall { size, min } => {
                write!(f, "Region too small: {} bytes (min {})", size, min)
            }
            Error::MissingHashFunction => write!(f, "Hash function instance is required"),
            Error::MissingParameter(name) => write!(f, "Missing cache parameter: {}", name),
            Error::SizeOverflow => write!(f, "Slot size overflows the address space"),
            Error::KeyLength { actual, expected } => {
                write!(f, "Invalid key length {} expected {}", actual, expected)
            }
            Error::ValueLength { actual, expected } => {
                write!(f, "Invalid value length {} expected {}", actual, expected)
            }
            Error::Alloc(e) => write!(f, "Allocation error: {}", e),
            Error::AllocLayout(size) => write!(f, "Allocation error: cannot allocate {} bytes", size),
            Error::Entropy(e) => write!(f, "Entropy error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Alloc(e) => Some(e),
            Error::Entropy(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Alloc(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(Error::InvalidKeySize(0).is_config());
        assert!(Error::MissingHashFunction.is_config());
        assert!(Error::RegionTooSmall { size: 1, min: 6 }.is_config());
        assert!(Error::KeyLength { actual: 2, expected: 1 }.is_input());
        assert!(Error::ValueLength { actual: 0, expected: 1 }.is_input());
        assert!(Error::AllocLayout(usize::MAX).is_resource());
        assert!(!Error::SizeOverflow.is_input());
    }

    #[test]
    fn test_display() {
        let err = Error::KeyLength { actual: 3, expected: 8 };
        assert_eq!(err.to_string(), "Invalid key length 3 expected 8");

        let err = Error::RegionTooSmall { size: 2, min: 6 };
        assert_eq!(err.to_string(), "Region too small: 2 bytes (min 6)");
    }

    #[test]
    fn test_io_source() {
        use std::error::Error as _;

        let err: Error = io::Error::new(io::ErrorKind::OutOfMemory, "no mapping").into();
        assert!(err.is_resource());
        assert!(err.source().is_some());
    }
}
