//! Storage layer errors.

use crate::storage::PageNum;

/// Storage layer errors.
#[derive(Debug)]
pub enum StorageError {
    /// Page not found in the file.
    ///
    /// This occurs when attempting to read or write a page that has not
    /// been allocated yet. Use `append_page` to grow the file.
    PageNotFound(PageNum),

    /// File already exists (create refuses to clobber it).
    AlreadyExists(String),

    /// I/O error from the underlying file system.
    Io(std::io::Error),

    /// Data corruption detected.
    ///
    /// This indicates that the file has an invalid size, magic, or
    /// format version.
    Corrupted(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::PageNotFound(n) => write!(f, "page not found: {}", n),
            StorageError::AlreadyExists(path) => write!(f, "file already exists: {}", path),
            StorageError::Io(e) => write!(f, "I/O error: {}", e),
            StorageError::Corrupted(msg) => write!(f, "data corruption: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}
