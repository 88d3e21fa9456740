//! Error types for Ripple incremental views.

use alloc::string::String;
use core::fmt;

/// Result type alias for Ripple operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types raised while building or maintaining a derived collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A required argument was missing or malformed at construction.
    InvalidArgument {
        message: String,
    },
    /// An edit referenced an index that does not exist in the collection
    /// it was applied to.
    IndexOutOfRange {
        index: usize,
        len: usize,
    },
    /// Two explicit groups were declared with the same key.
    DuplicateKey {
        key: String,
    },
    /// A user callback (selector, teardown, subscriber) failed.
    CallbackFailure {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument { message } => {
                write!(f, "Invalid argument: {}", message)
            }
            Error::IndexOutOfRange { index, len } => {
                write!(f, "Index {} out of range for collection of length {}", index, len)
            }
            Error::DuplicateKey { key } => {
                write!(f, "Duplicate explicit group key: {}", key)
            }
            Error::CallbackFailure { message } => {
                write!(f, "Callback failed: {}", message)
            }
        }
    }
}

impl Error {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an index out of range error.
    pub fn index_out_of_range(index: usize, len: usize) -> Self {
        Error::IndexOutOfRange { index, len }
    }

    /// Creates a duplicate key error.
    pub fn duplicate_key(key: impl Into<String>) -> Self {
        Error::DuplicateKey { key: key.into() }
    }

    /// Creates a callback failure error.
    pub fn callback_failure(message: impl Into<String>) -> Self {
        Error::CallbackFailure {
            message: message.into(),
        }
    }

    /// Returns `Ok(())` when `index < len`, otherwise an index error.
    #[inline]
    pub fn check_index(index: usize, len: usize) -> Result<()> {
        if index < len {
            Ok(())
        } else {
            Err(Error::index_out_of_range(index, len))
        }
    }

    /// Like [`Error::check_index`] but also accepts `index == len`
    /// (an insertion point).
    #[inline]
    pub fn check_insert_index(index: usize, len: usize) -> Result<()> {
        if index <= len {
            Ok(())
        } else {
            Err(Error::index_out_of_range(index, len))
        }
    }
}
