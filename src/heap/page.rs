//! Slotted page layout for record files.
//!
//! A record page keeps its bookkeeping at the tail so records can grow
//! upward from byte 0:
//!
//! ```text
//! +--------------------+ offset 0
//! | Records            |  (contiguous, grow upward)
//! +--------------------+ data_end
//! | Free Gap           |
//! +--------------------+
//! | Slot Array         |  (grows downward, 4 bytes per slot)
//! +--------------------+ PAGE_SIZE - 4
//! | slot count (u16)   |
//! | free bytes (u16)   |
//! +--------------------+ PAGE_SIZE
//! ```
//!
//! Each slot is `(offset: u16, length: u16)`. A slot with length 0 is a
//! tombstone. A slot whose offset is `>= PAGE_SIZE` is a forwarding slot:
//! the real offset is `offset - PAGE_SIZE`, and the bytes there are an
//! 8-byte RID naming the record's data page. Deletions compact the record
//! area immediately, so the free gap is always contiguous and
//!
//! ```text
//! free + trailer + slots * 4 + sum(occupied bytes of live slots) = PAGE_SIZE
//! ```

use crate::heap::{Rid, RID_SIZE};
use crate::storage::PAGE_SIZE;

/// Size of the page trailer: free-byte count + slot count.
pub const TRAILER_SIZE: usize = 4;

/// Size of each slot entry in bytes.
pub const SLOT_SIZE: usize = 4;

/// Free bytes in a freshly initialized page.
pub const EMPTY_FREE_BYTES: usize = PAGE_SIZE - TRAILER_SIZE;

/// Maximum record size that fits in a page together with its slot.
pub const MAX_RECORD_SIZE: usize = PAGE_SIZE - TRAILER_SIZE - SLOT_SIZE;

/// A slot entry in the page trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Record offset; values `>= PAGE_SIZE` mark a forwarding slot.
    pub offset: u16,
    /// Record length in bytes; 0 marks a tombstone.
    pub length: u16,
}

impl Slot {
    /// Returns true if this slot holds no record.
    pub fn is_tombstone(&self) -> bool {
        self.length == 0
    }

    /// Returns true if this slot holds a forwarding pointer.
    pub fn is_forwarded(&self) -> bool {
        self.offset as usize >= PAGE_SIZE
    }

    /// Returns the in-page offset with the forwarding bias stripped.
    pub fn local_offset(&self) -> usize {
        self.offset as usize % PAGE_SIZE
    }

    /// Returns the number of page bytes this slot occupies: the record
    /// length for a local record, [`RID_SIZE`] for a forwarding pointer,
    /// 0 for a tombstone.
    pub fn occupied(&self) -> usize {
        if self.is_tombstone() {
            0
        } else if self.is_forwarded() {
            RID_SIZE
        } else {
            self.length as usize
        }
    }
}

/// A slotted record page view over a page-sized buffer.
///
/// The type parameter follows the `AsRef`/`AsMut` pattern so the same
/// wrapper serves read-only slices, mutable slices, and owned buffers.
pub struct RecordPage<T> {
    data: T,
}

impl<T: AsRef<[u8]>> RecordPage<T> {
    /// Creates a page view over the given buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is not exactly one page long.
    pub fn new(data: T) -> Self {
        assert_eq!(data.as_ref().len(), PAGE_SIZE);
        Self { data }
    }

    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Returns the contiguous free bytes between records and slots.
    pub fn free_bytes(&self) -> usize {
        let d = self.data();
        u16::from_le_bytes([d[PAGE_SIZE - 2], d[PAGE_SIZE - 1]]) as usize
    }

    /// Returns the slot count, tombstones included.
    pub fn slot_count(&self) -> u16 {
        let d = self.data();
        u16::from_le_bytes([d[PAGE_SIZE - 4], d[PAGE_SIZE - 3]])
    }

    /// Returns the slot entry at the given index.
    pub fn slot(&self, slot_num: u16) -> Slot {
        let base = Self::slot_pos(slot_num);
        let d = self.data();
        Slot {
            offset: u16::from_le_bytes([d[base], d[base + 1]]),
            length: u16::from_le_bytes([d[base + 2], d[base + 3]]),
        }
    }

    /// Returns the end of the record area (== total live record bytes).
    pub fn data_end(&self) -> usize {
        PAGE_SIZE - TRAILER_SIZE - self.slot_count() as usize * SLOT_SIZE - self.free_bytes()
    }

    /// Returns the lowest-numbered tombstone slot, if any.
    pub fn find_tombstone(&self) -> Option<u16> {
        (0..self.slot_count()).find(|&i| self.slot(i).is_tombstone())
    }

    /// Returns true if a record of `record_len` bytes fits, counting the
    /// slot entry a fresh slot would cost.
    pub fn fits(&self, record_len: usize) -> bool {
        let slot_overhead = if self.find_tombstone().is_some() {
            0
        } else {
            SLOT_SIZE
        };
        self.free_bytes() >= record_len + slot_overhead
    }

    /// Returns the bytes of the record span starting at `offset`.
    pub fn record_bytes(&self, offset: usize, len: usize) -> &[u8] {
        &self.data()[offset..offset + len]
    }

    /// Reads the forwarding RID stored at `offset`.
    pub fn forwarding_rid(&self, offset: usize) -> Rid {
        Rid::read_from(&self.data()[offset..offset + RID_SIZE])
    }

    fn slot_pos(slot_num: u16) -> usize {
        PAGE_SIZE - TRAILER_SIZE - (slot_num as usize + 1) * SLOT_SIZE
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> RecordPage<T> {
    fn data_mut(&mut self) -> &mut [u8] {
        self.data.as_mut()
    }

    /// Initializes this buffer as an empty record page.
    pub fn init(&mut self) {
        self.data_mut().fill(0);
        self.set_free_bytes(EMPTY_FREE_BYTES);
    }

    /// Sets the free-byte count.
    pub fn set_free_bytes(&mut self, free: usize) {
        debug_assert!(free <= EMPTY_FREE_BYTES);
        let bytes = (free as u16).to_le_bytes();
        self.data_mut()[PAGE_SIZE - 2..].copy_from_slice(&bytes);
    }

    /// Sets the slot count.
    pub fn set_slot_count(&mut self, count: u16) {
        let bytes = count.to_le_bytes();
        self.data_mut()[PAGE_SIZE - 4..PAGE_SIZE - 2].copy_from_slice(&bytes);
    }

    /// Sets the slot entry at the given index.
    pub fn set_slot(&mut self, slot_num: u16, slot: Slot) {
        let base = Self::slot_pos(slot_num);
        let d = self.data_mut();
        d[base..base + 2].copy_from_slice(&slot.offset.to_le_bytes());
        d[base + 2..base + 4].copy_from_slice(&slot.length.to_le_bytes());
    }

    /// Inserts record bytes at the end of the record area, reusing the
    /// lowest tombstone slot or growing the slot array.
    ///
    /// Callers must check [`fits`](Self::fits) first.
    pub fn insert_bytes(&mut self, bytes: &[u8]) -> u16 {
        debug_assert!(self.fits(bytes.len()));
        let offset = self.data_end();
        let mut free = self.free_bytes();

        let slot_num = match self.find_tombstone() {
            Some(n) => n,
            None => {
                let n = self.slot_count();
                self.set_slot_count(n + 1);
                free -= SLOT_SIZE;
                n
            }
        };

        self.data_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.set_slot(
            slot_num,
            Slot {
                offset: offset as u16,
                length: bytes.len() as u16,
            },
        );
        self.set_free_bytes(free - bytes.len());
        slot_num
    }

    /// Overwrites `bytes.len()` bytes at `offset`.
    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) {
        self.data_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Removes the byte span `[offset, offset + len)` from the record
    /// area, compacting the records above it and re-pointing every slot
    /// whose (bias-stripped) offset lies beyond the hole.
    ///
    /// The slot that owned the span is not modified; the caller decides
    /// whether it becomes a tombstone or a forwarding pointer.
    pub fn remove_span(&mut self, offset: usize, len: usize) {
        let data_end = self.data_end();
        debug_assert!(offset + len <= data_end);
        self.data_mut().copy_within(offset + len..data_end, offset);

        for i in 0..self.slot_count() {
            let slot = self.slot(i);
            if !slot.is_tombstone() && slot.local_offset() > offset {
                self.set_slot(
                    i,
                    Slot {
                        offset: slot.offset - len as u16,
                        length: slot.length,
                    },
                );
            }
        }
        let free = self.free_bytes();
        self.set_free_bytes(free + len);
    }

    /// Resizes the byte span at `offset` from `old_len` to `new_len`,
    /// shifting the records above it and adjusting their slots.
    ///
    /// Growth requires `free_bytes() >= new_len - old_len`.
    pub fn resize_span(&mut self, offset: usize, old_len: usize, new_len: usize) {
        if old_len == new_len {
            return;
        }
        let data_end = self.data_end();
        debug_assert!(offset + old_len <= data_end);
        debug_assert!(new_len <= old_len || self.free_bytes() >= new_len - old_len);
        self.data_mut()
            .copy_within(offset + old_len..data_end, offset + new_len);

        let delta = new_len as i32 - old_len as i32;
        for i in 0..self.slot_count() {
            let slot = self.slot(i);
            if !slot.is_tombstone() && slot.local_offset() > offset {
                self.set_slot(
                    i,
                    Slot {
                        offset: (slot.offset as i32 + delta) as u16,
                        length: slot.length,
                    },
                );
            }
        }
        let free = self.free_bytes() as i32 - delta;
        self.set_free_bytes(free as usize);
    }
}
