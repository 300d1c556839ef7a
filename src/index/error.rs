//! Index errors.

use crate::datum::Type;
use crate::heap::Rid;
use crate::storage::StorageError;

/// Errors from B+-tree operations.
#[derive(Debug)]
pub enum IndexError {
    /// The composite `(key, rid)` entry is already present.
    Exists(Rid),
    /// No entry matches the composite `(key, rid)`.
    NotFound(Rid),
    /// A key value unusable for indexing: NULL, or the wrong type.
    InvalidKey {
        /// The attribute type the index is built on.
        expected: Type,
        /// The offending value's type, or `None` for NULL.
        found: Option<Type>,
    },
    /// Underlying page I/O failed.
    Storage(StorageError),
    /// Node structure disagrees with itself.
    Corrupted(String),
}

impl std::fmt::Display for IndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexError::Exists(rid) => write!(f, "entry for {} already exists", rid),
            IndexError::NotFound(rid) => write!(f, "no entry for {}", rid),
            IndexError::InvalidKey { expected, found } => match found {
                Some(found) => write!(f, "invalid key: expected {}, found {}", expected, found),
                None => write!(f, "invalid key: expected {}, found NULL", expected),
            },
            IndexError::Storage(e) => write!(f, "storage error: {}", e),
            IndexError::Corrupted(msg) => write!(f, "index corruption: {}", msg),
        }
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IndexError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for IndexError {
    fn from(e: StorageError) -> Self {
        IndexError::Storage(e)
    }
}
