//! Storage layer for page-based file I/O.
//!
//! All persistent data lives in fixed-size 4KB pages appended to ordinary
//! files. Page 0 of every file is a reserved header page; the layers above
//! (heap, index) decide what goes in it. There is no buffer pool: every
//! page access goes straight to the file, and callers that care batch
//! their work per page.
//!
//! All multi-byte integers on disk are little-endian.

pub mod error;
pub mod file;

pub use error::StorageError;
pub use file::{IoStats, PagedFile};

/// 4KB page size.
pub const PAGE_SIZE: usize = 4096;

/// Page number within a file. Page 0 is the header page.
pub type PageNum = u32;
