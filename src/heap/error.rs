//! Record store errors.

use crate::datum::SerializationError;
use crate::heap::Rid;
use crate::storage::StorageError;

/// Errors from record store operations.
#[derive(Debug)]
pub enum HeapError {
    /// Record too large to fit in a page.
    RecordTooLarge {
        /// Encoded record size.
        size: usize,
        /// Maximum record size a page can hold.
        max: usize,
    },
    /// No live record at the given RID (tombstoned or out of range).
    NotFound(Rid),
    /// Attribute name not present in the record descriptor.
    UnknownAttribute(String),
    /// Value encoding/decoding failed.
    Serialization(SerializationError),
    /// Underlying page I/O failed.
    Storage(StorageError),
    /// On-page structure disagrees with itself.
    Corrupted(String),
}

impl std::fmt::Display for HeapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeapError::RecordTooLarge { size, max } => {
                write!(f, "record of {} bytes exceeds page capacity {}", size, max)
            }
            HeapError::NotFound(rid) => write!(f, "no record at {}", rid),
            HeapError::UnknownAttribute(name) => write!(f, "unknown attribute \"{}\"", name),
            HeapError::Serialization(e) => write!(f, "serialization error: {}", e),
            HeapError::Storage(e) => write!(f, "storage error: {}", e),
            HeapError::Corrupted(msg) => write!(f, "record file corruption: {}", msg),
        }
    }
}

impl std::error::Error for HeapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HeapError::Serialization(e) => Some(e),
            HeapError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SerializationError> for HeapError {
    fn from(e: SerializationError) -> Self {
        HeapError::Serialization(e)
    }
}

impl From<StorageError> for HeapError {
    fn from(e: StorageError) -> Self {
        HeapError::Storage(e)
    }
}
