//! Ascending range scans over the leaf level.

use std::cmp::Ordering;
use std::path::Path;

use crate::datum::{Attribute, Value};
use crate::heap::{Rid, RID_SIZE};
use crate::index::error::IndexError;
use crate::index::key;
use crate::index::node::{NodePage, LEAF_HEADER_SIZE};
use crate::index::tree::{descent_rid, find_child_pos};
use crate::storage::{PageNum, PagedFile, PAGE_SIZE};

/// A range scan positioned inside the leaf level.
///
/// Between calls the iterator holds only its own file handle, one leaf
/// page image, a byte offset into it, and the high bound. Streaming
/// follows the leaf `next` links. Because leaves are never unlinked, an
/// interleaved delete from the same thread cannot invalidate the cursor;
/// an entry removed at the cursor position after the page image was taken
/// is simply still served from that image.
pub struct IndexScan {
    file: PagedFile,
    attr: Attribute,
    high: Option<Vec<u8>>,
    high_inclusive: bool,
    page: Box<[u8; PAGE_SIZE]>,
    offset: usize,
    finished: bool,
}

impl IndexScan {
    /// Descends to the first qualified entry and positions the cursor.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn open(
        path: &Path,
        root: PageNum,
        attr: &Attribute,
        low: Option<&Value>,
        high: Option<&Value>,
        low_inclusive: bool,
        high_inclusive: bool,
    ) -> Result<Self, IndexError> {
        let low_bytes = low.map(|v| key::encode(attr, v)).transpose()?;
        let high_bytes = high.map(|v| key::encode(attr, v)).transpose()?;

        let mut file = PagedFile::open(path)?;
        let mut page = Box::new([0u8; PAGE_SIZE]);

        // Descend to the leaf that would contain the low bound.
        let mut node_num = root;
        loop {
            file.read_page(node_num, &mut page[..])?;
            let node = NodePage::new(&page[..]);
            if node.is_leaf() {
                break;
            }
            let pos = find_child_pos(
                &node,
                attr,
                low_bytes.as_deref(),
                descent_rid(low_inclusive),
            );
            node_num = node.child_at(pos);
        }

        let mut scan = Self {
            file,
            attr: attr.clone(),
            high: high_bytes,
            high_inclusive,
            page,
            offset: 0,
            finished: false,
        };

        // Position at the first entry inside the range, which may be a
        // few (possibly empty) leaves to the right.
        loop {
            match scan.first_qualified(low_bytes.as_deref(), low_inclusive) {
                FirstEntry::Found(offset) => {
                    scan.offset = offset;
                    break;
                }
                FirstEntry::PastHigh => {
                    scan.finished = true;
                    break;
                }
                FirstEntry::TryNextLeaf => {
                    let node = NodePage::new(&scan.page[..]);
                    if !node.has_next() {
                        scan.finished = true;
                        break;
                    }
                    let next = node.next_num();
                    scan.file.read_page(next, &mut scan.page[..])?;
                }
            }
        }
        Ok(scan)
    }

    /// Returns the next `(rid, key)` pair in ascending composite order,
    /// or `None` past the high bound or at the end of the leaf chain.
    pub fn next(&mut self) -> Result<Option<(Rid, Value)>, IndexError> {
        if self.finished {
            return Ok(None);
        }

        // Skip exhausted (possibly empty) leaves.
        loop {
            let node = NodePage::new(&self.page[..]);
            if self.offset < node.used_end() {
                break;
            }
            if !node.has_next() {
                self.finished = true;
                return Ok(None);
            }
            let next = node.next_num();
            self.file.read_page(next, &mut self.page[..])?;
            self.offset = LEAF_HEADER_SIZE;
        }

        let node = NodePage::new(&self.page[..]);
        let klen = key::encoded_len(&self.attr, &node.as_bytes()[self.offset..]);
        let cur_key = &node.as_bytes()[self.offset..self.offset + klen];

        if let Some(high) = &self.high {
            match key::compare(&self.attr, cur_key, high) {
                Ordering::Greater => {
                    self.finished = true;
                    return Ok(None);
                }
                Ordering::Equal if !self.high_inclusive => {
                    self.finished = true;
                    return Ok(None);
                }
                _ => {}
            }
        }

        let value = key::decode(&self.attr, cur_key);
        let rid = node.rid_at(self.offset + klen);
        self.offset += klen + RID_SIZE;
        Ok(Some((rid, value)))
    }

    /// Releases the iterator. Dropping it has the same effect.
    pub fn close(self) {}

    /// Looks for the first entry of the current leaf inside the range.
    fn first_qualified(&self, low: Option<&[u8]>, low_inclusive: bool) -> FirstEntry {
        let node = NodePage::new(&self.page[..]);
        let used_end = node.used_end();
        let mut offset = LEAF_HEADER_SIZE;
        while offset < used_end {
            let klen = key::encoded_len(&self.attr, &node.as_bytes()[offset..]);
            let cur_key = &node.as_bytes()[offset..offset + klen];

            if let Some(high) = &self.high {
                match key::compare(&self.attr, high, cur_key) {
                    Ordering::Less => return FirstEntry::PastHigh,
                    Ordering::Equal if !self.high_inclusive => return FirstEntry::PastHigh,
                    _ => {}
                }
            }

            let low_bytes = match low {
                None => return FirstEntry::Found(offset),
                Some(low) => low,
            };
            match key::compare(&self.attr, low_bytes, cur_key) {
                Ordering::Less => return FirstEntry::Found(offset),
                Ordering::Equal if low_inclusive => return FirstEntry::Found(offset),
                _ => {}
            }
            offset += klen + RID_SIZE;
        }
        FirstEntry::TryNextLeaf
    }
}

enum FirstEntry {
    Found(usize),
    PastHigh,
    TryNextLeaf,
}
