//! Record store operations over a paged file.

use std::path::{Path, PathBuf};

use log::{debug, trace};

use crate::datum::{Attribute, CompOp, Value};
use crate::heap::directory;
use crate::heap::error::HeapError;
use crate::heap::page::{RecordPage, Slot, MAX_RECORD_SIZE, SLOT_SIZE};
use crate::heap::record;
use crate::heap::scan::RecordScan;
use crate::heap::{Rid, DIR_ENTRIES, RID_SIZE};
use crate::storage::{PageNum, PagedFile, PAGE_SIZE};
use crate::tuple::Tuple;

/// A handle to an open record file.
///
/// Records are inserted first-fit via the free-space directory, addressed
/// by stable [`Rid`]s, and forwarded (one hop at most) when an update
/// outgrows the home page. The handle owns the underlying [`PagedFile`]
/// and is move-only.
pub struct RecordStore {
    file: PagedFile,
}

impl RecordStore {
    /// Creates a new record file: one empty directory page carrying the
    /// format stamp.
    pub fn create(path: impl Into<PathBuf>) -> Result<(), HeapError> {
        let path = path.into();
        let mut file = PagedFile::create(&path)?;
        let mut buf = [0u8; PAGE_SIZE];
        directory::stamp_header(&mut buf);
        file.write_page(0, &buf)?;
        debug!("created record file {}", path.display());
        Ok(())
    }

    /// Removes a record file.
    pub fn destroy(path: impl AsRef<Path>) -> Result<(), HeapError> {
        PagedFile::destroy(path)?;
        Ok(())
    }

    /// Opens an existing record file, validating its format stamp.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HeapError> {
        let mut file = PagedFile::open(path)?;
        let mut buf = [0u8; PAGE_SIZE];
        file.read_page(0, &mut buf)?;
        directory::validate_header(&buf)?;
        Ok(Self { file })
    }

    /// Returns the path of the underlying file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Returns the number of pages in the file, directory pages included.
    pub fn page_count(&self) -> PageNum {
        self.file.page_count()
    }

    /// Returns the I/O counters of the underlying file handle.
    pub fn io_stats(&self) -> crate::storage::IoStats {
        self.file.io_stats()
    }

    /// Inserts a tuple and returns its freshly assigned RID.
    pub fn insert(&mut self, descriptor: &[Attribute], tuple: &Tuple) -> Result<Rid, HeapError> {
        let bytes = encode_padded(descriptor, tuple)?;
        self.insert_bytes(&bytes)
    }

    /// Reads the tuple at `rid`, following a forwarding pointer if present.
    pub fn read(&mut self, descriptor: &[Attribute], rid: Rid) -> Result<Tuple, HeapError> {
        let mut buf = [0u8; PAGE_SIZE];
        let slot = self.resolve(rid, &mut buf)?;
        let page = RecordPage::new(&buf[..]);
        let bytes = page.record_bytes(slot.local_offset(), slot.length as usize);
        Ok(record::decode(descriptor, bytes)?)
    }

    /// Reads a single attribute of the record at `rid` via the field
    /// offset directory.
    pub fn read_attribute(
        &mut self,
        descriptor: &[Attribute],
        rid: Rid,
        attr_name: &str,
    ) -> Result<Value, HeapError> {
        let field_num = descriptor
            .iter()
            .position(|a| a.name == attr_name)
            .ok_or_else(|| HeapError::UnknownAttribute(attr_name.to_string()))?;

        let mut buf = [0u8; PAGE_SIZE];
        let slot = self.resolve(rid, &mut buf)?;
        let page = RecordPage::new(&buf[..]);
        let bytes = page.record_bytes(slot.local_offset(), slot.length as usize);
        Ok(record::read_field(descriptor, bytes, field_num)?)
    }

    /// Updates the record at `rid`, keeping the RID stable.
    ///
    /// If the new encoding fits in the page currently holding the payload
    /// it is rewritten in place; otherwise the payload moves to a page
    /// found through the free-space directory and the home slot keeps a
    /// forwarding pointer.
    pub fn update(
        &mut self,
        descriptor: &[Attribute],
        rid: Rid,
        tuple: &Tuple,
    ) -> Result<(), HeapError> {
        let bytes = encode_padded(descriptor, tuple)?;
        let new_len = bytes.len();

        let mut home_buf = [0u8; PAGE_SIZE];
        self.file.read_page(rid.page_num, &mut home_buf)?;
        let home_slot = checked_slot(&home_buf, rid)?;

        if !home_slot.is_forwarded() {
            let old_len = home_slot.length as usize;
            let offset = home_slot.local_offset();
            let mut page = RecordPage::new(&mut home_buf[..]);

            if page.free_bytes() + old_len >= new_len {
                // Fits in the home page: rewrite in place.
                page.resize_span(offset, old_len, new_len);
                page.write_bytes(offset, &bytes);
                page.set_slot(
                    rid.slot_num as u16,
                    Slot {
                        offset: offset as u16,
                        length: new_len as u16,
                    },
                );
                let free = page.free_bytes();
                self.update_free_entry(rid.page_num, free as u16)?;
                self.file.write_page(rid.page_num, &home_buf)?;
            } else {
                // Outgrew the home page: shrink the record down to a
                // forwarding stub, then insert the payload elsewhere.
                trace!("record {} outgrew page {}, forwarding", rid, rid.page_num);
                page.resize_span(offset, old_len, RID_SIZE);
                page.set_slot(
                    rid.slot_num as u16,
                    Slot {
                        offset: (offset + PAGE_SIZE) as u16,
                        length: new_len as u16,
                    },
                );
                let free = page.free_bytes();
                self.update_free_entry(rid.page_num, free as u16)?;
                self.file.write_page(rid.page_num, &home_buf)?;

                let data_rid = self.insert_bytes(&bytes)?;

                // The insert may have touched the home page, so re-read
                // it before writing the pointer target.
                self.file.read_page(rid.page_num, &mut home_buf)?;
                let slot = RecordPage::new(&home_buf[..]).slot(rid.slot_num as u16);
                let mut rid_bytes = [0u8; RID_SIZE];
                data_rid.write_to(&mut rid_bytes);
                let mut page = RecordPage::new(&mut home_buf[..]);
                page.write_bytes(slot.local_offset(), &rid_bytes);
                self.file.write_page(rid.page_num, &home_buf)?;
            }
            return Ok(());
        }

        // Already forwarded: the payload lives at the pointer's target,
        // which may be another page or another slot of the home page.
        let data_rid = RecordPage::new(&home_buf[..]).forwarding_rid(home_slot.local_offset());
        let same_page = data_rid.page_num == rid.page_num;
        let mut data_buf = [0u8; PAGE_SIZE];
        let buf = if same_page {
            &mut home_buf
        } else {
            self.file.read_page(data_rid.page_num, &mut data_buf)?;
            &mut data_buf
        };
        let data_slot = checked_slot(&buf[..], data_rid).map_err(|_| corrupt_forward(rid, data_rid))?;
        let old_len = data_slot.length as usize;
        let offset = data_slot.local_offset();
        let mut page = RecordPage::new(&mut buf[..]);

        if page.free_bytes() + old_len >= new_len {
            // Fits in the data page: rewrite in place there and keep the
            // home slot's length in sync.
            page.resize_span(offset, old_len, new_len);
            page.write_bytes(offset, &bytes);
            page.set_slot(
                data_rid.slot_num as u16,
                Slot {
                    offset: offset as u16,
                    length: new_len as u16,
                },
            );
            if same_page {
                // The resize may have shifted the stub; re-read its slot.
                let stub = page.slot(rid.slot_num as u16);
                page.set_slot(
                    rid.slot_num as u16,
                    Slot {
                        offset: stub.offset,
                        length: new_len as u16,
                    },
                );
            }
            let free = page.free_bytes();
            self.update_free_entry(data_rid.page_num, free as u16)?;
            self.file.write_page(data_rid.page_num, &buf[..])?;

            if !same_page {
                let mut page = RecordPage::new(&mut home_buf[..]);
                page.set_slot(
                    rid.slot_num as u16,
                    Slot {
                        offset: home_slot.offset,
                        length: new_len as u16,
                    },
                );
                self.file.write_page(rid.page_num, &home_buf)?;
            }
        } else {
            // Outgrew the data page too: tombstone the old payload and
            // re-point the home slot at a fresh insert.
            page.remove_span(offset, old_len);
            page.set_slot(
                data_rid.slot_num as u16,
                Slot {
                    offset: 0,
                    length: 0,
                },
            );
            let free = page.free_bytes();
            self.update_free_entry(data_rid.page_num, free as u16)?;
            self.file.write_page(data_rid.page_num, &buf[..])?;

            let new_data_rid = self.insert_bytes(&bytes)?;

            // The insert may have touched the home page again, so edit a
            // fresh image of it.
            self.file.read_page(rid.page_num, &mut home_buf)?;
            let slot = RecordPage::new(&home_buf[..]).slot(rid.slot_num as u16);
            let mut rid_bytes = [0u8; RID_SIZE];
            new_data_rid.write_to(&mut rid_bytes);
            let mut page = RecordPage::new(&mut home_buf[..]);
            page.write_bytes(slot.local_offset(), &rid_bytes);
            page.set_slot(
                rid.slot_num as u16,
                Slot {
                    offset: slot.offset,
                    length: new_len as u16,
                },
            );
            self.file.write_page(rid.page_num, &home_buf)?;
        }
        Ok(())
    }

    /// Deletes the record at `rid`, compacting the affected pages and
    /// tombstoning the slots.
    pub fn delete(&mut self, _descriptor: &[Attribute], rid: Rid) -> Result<(), HeapError> {
        let mut buf = [0u8; PAGE_SIZE];
        self.file.read_page(rid.page_num, &mut buf)?;
        let slot = checked_slot(&buf, rid)?;

        let target = if slot.is_forwarded() {
            // Drop the forwarding pointer from the home page first.
            let data_rid = RecordPage::new(&buf[..]).forwarding_rid(slot.local_offset());
            let mut page = RecordPage::new(&mut buf[..]);
            page.remove_span(slot.local_offset(), RID_SIZE);
            page.set_slot(rid.slot_num as u16, Slot { offset: 0, length: 0 });
            let free = page.free_bytes();
            self.update_free_entry(rid.page_num, free as u16)?;
            self.file.write_page(rid.page_num, &buf)?;

            self.file.read_page(data_rid.page_num, &mut buf)?;
            checked_slot(&buf, data_rid).map_err(|_| corrupt_forward(rid, data_rid))?;
            data_rid
        } else {
            rid
        };

        let slot = RecordPage::new(&buf[..]).slot(target.slot_num as u16);
        let mut page = RecordPage::new(&mut buf[..]);
        page.remove_span(slot.local_offset(), slot.occupied());
        page.set_slot(target.slot_num as u16, Slot { offset: 0, length: 0 });
        let free = page.free_bytes();
        self.update_free_entry(target.page_num, free as u16)?;
        self.file.write_page(target.page_num, &buf)?;
        Ok(())
    }

    /// Starts a predicate-pushdown scan over this file.
    ///
    /// The iterator opens its own handle on the same path, so the store
    /// stays usable (same thread only) while the scan is live.
    pub fn scan(
        &self,
        descriptor: &[Attribute],
        condition_attr: Option<&str>,
        op: CompOp,
        value: &Value,
        projection: &[String],
    ) -> Result<RecordScan, HeapError> {
        RecordScan::open(
            self.file.path(),
            descriptor,
            condition_attr,
            op,
            value,
            projection,
        )
    }

    /// Inserts pre-encoded record bytes (already padded to the minimum
    /// record length) into the first page that fits them.
    fn insert_bytes(&mut self, bytes: &[u8]) -> Result<Rid, HeapError> {
        if bytes.len() > MAX_RECORD_SIZE {
            return Err(HeapError::RecordTooLarge {
                size: bytes.len(),
                max: MAX_RECORD_SIZE,
            });
        }

        let page_num = self.seek_free_page(bytes.len() + SLOT_SIZE)?;
        let fresh = page_num >= self.file.page_count();
        let mut buf = [0u8; PAGE_SIZE];
        if fresh {
            RecordPage::new(&mut buf[..]).init();
        } else {
            self.file.read_page(page_num, &mut buf)?;
        }

        let mut page = RecordPage::new(&mut buf[..]);
        if !page.fits(bytes.len()) {
            return Err(HeapError::Corrupted(format!(
                "directory promised {} free bytes on page {} but the page disagrees",
                bytes.len(),
                page_num
            )));
        }
        let slot_num = page.insert_bytes(bytes);
        let free = page.free_bytes();

        self.update_free_entry(page_num, free as u16)?;
        if fresh {
            let appended = self.file.append_page(&buf)?;
            debug_assert_eq!(appended, page_num);
        } else {
            self.file.write_page(page_num, &buf)?;
        }
        trace!("inserted {} bytes at ({},{})", bytes.len(), page_num, slot_num);
        Ok(Rid::new(page_num, slot_num as u32))
    }

    /// First-fit search through the directory chain for a page with at
    /// least `required` free bytes. When every allocated page is full the
    /// returned page number is `page_count()`: a data page the caller
    /// must initialize and append. A full directory is extended here.
    fn seek_free_page(&mut self, required: usize) -> Result<PageNum, HeapError> {
        let page_count = self.file.page_count();
        let mut dir_num: PageNum = 0;
        let mut buf = [0u8; PAGE_SIZE];
        loop {
            self.file.read_page(dir_num, &mut buf)?;
            for idx in 0..DIR_ENTRIES {
                let (page_num, free) = directory::entry(&buf, idx);
                if page_num == 0 {
                    // First never-allocated entry: the next data page.
                    return Ok(page_count);
                }
                if free as usize >= required {
                    return Ok(page_num);
                }
            }

            let next = directory::next_directory(&buf);
            if next == 0 {
                // Directory chain exhausted: append a new directory page
                // and hand back the data page that will follow it.
                directory::set_next_directory(&mut buf, page_count);
                self.file.write_page(dir_num, &buf)?;
                let appended = self.file.append_page(&[0u8; PAGE_SIZE])?;
                debug_assert_eq!(appended, page_count);
                debug!("appended directory page {}", page_count);
                return Ok(page_count + 1);
            }
            dir_num = next;
        }
    }

    /// Mirrors a data page's free-byte count into its directory entry.
    fn update_free_entry(&mut self, page_num: PageNum, free: u16) -> Result<(), HeapError> {
        let (dir_num, idx) = directory::covering_entry(page_num);
        let mut buf = [0u8; PAGE_SIZE];
        self.file.read_page(dir_num, &mut buf)?;
        directory::set_entry(&mut buf, idx, page_num, free);
        self.file.write_page(dir_num, &buf)?;
        Ok(())
    }

    /// Reads the page holding `rid`'s payload into `buf`, following one
    /// forwarding hop, and returns the payload slot.
    fn resolve(&mut self, rid: Rid, buf: &mut [u8; PAGE_SIZE]) -> Result<Slot, HeapError> {
        self.file.read_page(rid.page_num, buf)?;
        let slot = checked_slot(&buf[..], rid)?;
        if !slot.is_forwarded() {
            return Ok(slot);
        }

        let data_rid = RecordPage::new(&buf[..]).forwarding_rid(slot.local_offset());
        self.file.read_page(data_rid.page_num, buf)?;
        let slot = checked_slot(&buf[..], data_rid).map_err(|_| corrupt_forward(rid, data_rid))?;
        if slot.is_forwarded() {
            return Err(corrupt_forward(rid, data_rid));
        }
        Ok(slot)
    }
}

/// Encodes a tuple into stored form padded up to the minimum record
/// length, so any record can later be replaced by a forwarding pointer
/// in place.
fn encode_padded(descriptor: &[Attribute], tuple: &Tuple) -> Result<Vec<u8>, HeapError> {
    let mut bytes = record::encode(descriptor, tuple)?;
    if bytes.len() < RID_SIZE {
        bytes.resize(RID_SIZE, 0);
    }
    if bytes.len() > MAX_RECORD_SIZE {
        return Err(HeapError::RecordTooLarge {
            size: bytes.len(),
            max: MAX_RECORD_SIZE,
        });
    }
    Ok(bytes)
}

/// Returns the slot for `rid` if it addresses a live record.
fn checked_slot(buf: &[u8], rid: Rid) -> Result<Slot, HeapError> {
    let page = RecordPage::new(buf);
    if rid.slot_num >= page.slot_count() as u32 {
        return Err(HeapError::NotFound(rid));
    }
    let slot = page.slot(rid.slot_num as u16);
    if slot.is_tombstone() {
        return Err(HeapError::NotFound(rid));
    }
    Ok(slot)
}

fn corrupt_forward(rid: Rid, data_rid: Rid) -> HeapError {
    HeapError::Corrupted(format!(
        "forwarding pointer at {} names invalid slot {}",
        rid, data_rid
    ))
}
