//! File-backed page storage.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;

use super::error::StorageError;
use super::{PageNum, PAGE_SIZE};

/// Per-file page I/O counters.
///
/// Counts pages read, written in place, and appended since the handle was
/// opened. The counters live only in memory; they exist so callers and
/// tests can reason about I/O cost without instrumenting the file system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoStats {
    /// Pages read from disk.
    pub reads: u64,
    /// Pages overwritten in place.
    pub writes: u64,
    /// Pages appended to the end of the file.
    pub appends: u64,
}

/// A handle to an open paged file.
///
/// Stores pages as contiguous 4KB blocks. Page 0 is always present: it is
/// written by [`create`](Self::create) and reserved for layer-specific
/// metadata (a free-space directory for record files, the root pointer for
/// index files).
///
/// # File Layout
///
/// ```text
/// +------------------+------------------+------------------+
/// | Page 0 (header)  | Page 1           | Page 2           | ...
/// +------------------+------------------+------------------+
/// ^ offset 0         ^ offset 4096      ^ offset 8192
/// ```
///
/// # Ownership
///
/// The handle owns the file descriptor and the I/O counters. There is no
/// `Clone`; two handles on the same path are only safe from a single
/// thread.
pub struct PagedFile {
    /// Path this file was opened from.
    path: PathBuf,
    file: File,
    /// Number of pages currently in the file, header page included.
    page_count: PageNum,
    stats: IoStats,
}

impl PagedFile {
    /// Creates a new paged file with a single zeroed header page.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the path is taken.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if path.exists() {
            return Err(StorageError::AlreadyExists(path.display().to_string()));
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;
        file.write_all(&[0u8; PAGE_SIZE])?;
        debug!("created paged file {}", path.display());

        Ok(Self {
            path,
            file,
            page_count: 1,
            stats: IoStats::default(),
        })
    }

    /// Opens an existing paged file.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Corrupted` if the file is empty or its size
    /// is not a multiple of the page size.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let file_size = file.metadata()?.len();
        if file_size == 0 || file_size % PAGE_SIZE as u64 != 0 {
            return Err(StorageError::Corrupted(format!(
                "file size {} is not a positive multiple of page size {}",
                file_size, PAGE_SIZE
            )));
        }

        Ok(Self {
            path,
            file,
            page_count: (file_size / PAGE_SIZE as u64) as PageNum,
            stats: IoStats::default(),
        })
    }

    /// Removes a paged file from disk.
    pub fn destroy(path: impl AsRef<Path>) -> Result<(), StorageError> {
        std::fs::remove_file(path.as_ref())?;
        Ok(())
    }

    /// Returns the path this file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of pages in the file, header page included.
    pub fn page_count(&self) -> PageNum {
        self.page_count
    }

    /// Returns the I/O counters accumulated by this handle.
    pub fn io_stats(&self) -> IoStats {
        self.stats
    }

    /// Reads the page into `buf`, which must be exactly one page long.
    pub fn read_page(&mut self, page_num: PageNum, buf: &mut [u8]) -> Result<(), StorageError> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);
        if page_num >= self.page_count {
            return Err(StorageError::PageNotFound(page_num));
        }

        self.file
            .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
        self.file.read_exact(buf)?;
        self.stats.reads += 1;
        Ok(())
    }

    /// Overwrites an existing page.
    pub fn write_page(&mut self, page_num: PageNum, buf: &[u8]) -> Result<(), StorageError> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);
        if page_num >= self.page_count {
            return Err(StorageError::PageNotFound(page_num));
        }

        self.file
            .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(buf)?;
        self.stats.writes += 1;
        Ok(())
    }

    /// Appends a page to the end of the file and returns its page number.
    pub fn append_page(&mut self, buf: &[u8]) -> Result<PageNum, StorageError> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);
        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(buf)?;

        let page_num = self.page_count;
        self.page_count += 1;
        self.stats.appends += 1;
        Ok(page_num)
    }
}
