//! Predicate-pushdown record scans.

use std::path::Path;

use crate::datum::{Attribute, CompOp, SerializationError, Value};
use crate::heap::directory;
use crate::heap::error::HeapError;
use crate::heap::page::RecordPage;
use crate::heap::record;
use crate::heap::Rid;
use crate::storage::{PageNum, PagedFile, PAGE_SIZE};
use crate::tuple::Tuple;

/// A scan over the live records of a record file.
///
/// The iterator owns its own file handle and one page image at a time.
/// Directory pages, tombstones, and forwarding slots are skipped, so a
/// forwarded record is visited exactly once, at its data page. The page
/// count and per-page slot counts are snapshotted when first touched;
/// records inserted behind the cursor by the same thread are not revisited.
pub struct RecordScan {
    file: PagedFile,
    descriptor: Vec<Attribute>,
    /// Index of the condition attribute; `None` means unconditioned.
    condition: Option<usize>,
    op: CompOp,
    value: Value,
    /// Indices of the projected attributes, in output order.
    projection: Vec<usize>,
    page_count: PageNum,
    page_num: PageNum,
    page: Box<[u8; PAGE_SIZE]>,
    have_page: bool,
    slot_count: u16,
    slot_num: u16,
}

impl RecordScan {
    /// Opens a scan over the record file at `path`.
    ///
    /// # Errors
    ///
    /// Fails with `UnknownAttribute` if the condition or a projected
    /// attribute is not in the descriptor, and with a serialization error
    /// if the condition value does not conform to the condition
    /// attribute's type.
    pub(crate) fn open(
        path: &Path,
        descriptor: &[Attribute],
        condition_attr: Option<&str>,
        op: CompOp,
        value: &Value,
        projection: &[String],
    ) -> Result<Self, HeapError> {
        let projection = projection
            .iter()
            .map(|name| {
                descriptor
                    .iter()
                    .position(|a| a.name == *name)
                    .ok_or_else(|| HeapError::UnknownAttribute(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let condition = match (op, condition_attr) {
            (CompOp::NoOp, _) => None,
            (_, None) => {
                return Err(HeapError::UnknownAttribute(
                    "(missing condition attribute)".to_string(),
                ));
            }
            (_, Some(name)) => {
                let idx = descriptor
                    .iter()
                    .position(|a| a.name == name)
                    .ok_or_else(|| HeapError::UnknownAttribute(name.to_string()))?;
                if !value.conforms_to(descriptor[idx].ty) {
                    return Err(HeapError::Serialization(SerializationError::TypeMismatch {
                        expected: descriptor[idx].ty,
                        found: value.data_type(),
                    }));
                }
                Some(idx)
            }
        };

        let file = PagedFile::open(path)?;
        let page_count = file.page_count();
        Ok(Self {
            file,
            descriptor: descriptor.to_vec(),
            condition,
            op,
            value: value.clone(),
            projection,
            page_count,
            page_num: 0,
            page: Box::new([0u8; PAGE_SIZE]),
            have_page: false,
            slot_count: 0,
            slot_num: 0,
        })
    }

    /// Returns the next matching record, projected, or `None` at EOF.
    pub fn next(&mut self) -> Result<Option<(Rid, Tuple)>, HeapError> {
        while self.page_num < self.page_count {
            if directory::is_directory_page(self.page_num) {
                self.page_num += 1;
                continue;
            }

            if !self.have_page {
                self.file.read_page(self.page_num, &mut self.page[..])?;
                self.slot_count = RecordPage::new(&self.page[..]).slot_count();
                self.slot_num = 0;
                self.have_page = true;
            }

            while self.slot_num < self.slot_count {
                let slot_num = self.slot_num;
                self.slot_num += 1;

                let page = RecordPage::new(&self.page[..]);
                let slot = page.slot(slot_num);
                if slot.is_tombstone() || slot.is_forwarded() {
                    continue;
                }

                let bytes = page.record_bytes(slot.local_offset(), slot.length as usize);
                if self.matches(bytes)? {
                    let rid = Rid::new(self.page_num, slot_num as u32);
                    let tuple = self.project(bytes)?;
                    return Ok(Some((rid, tuple)));
                }
            }

            self.have_page = false;
            self.page_num += 1;
        }
        Ok(None)
    }

    /// Releases the iterator. Dropping it has the same effect; this only
    /// exists so call sites can be explicit about scan lifetimes.
    pub fn close(self) {}

    fn matches(&self, bytes: &[u8]) -> Result<bool, HeapError> {
        let idx = match self.condition {
            None => return Ok(true),
            Some(idx) => idx,
        };
        let field = record::read_field(&self.descriptor, bytes, idx)?;
        Ok(self.op.matches(&field, &self.value))
    }

    fn project(&self, bytes: &[u8]) -> Result<Tuple, HeapError> {
        let mut values = Vec::with_capacity(self.projection.len());
        for &idx in &self.projection {
            values.push(record::read_field(&self.descriptor, bytes, idx)?);
        }
        Ok(Tuple::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::RecordStore;
    use tempfile::tempdir;

    fn descriptor() -> Vec<Attribute> {
        vec![
            Attribute::int("id"),
            Attribute::varchar("name", 20),
            Attribute::real("salary"),
        ]
    }

    fn tuple(id: i32, name: &str, salary: f32) -> Tuple {
        Tuple::new(vec![
            Value::Int(id),
            Value::Varchar(name.into()),
            Value::Real(salary),
        ])
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn populated_store(dir: &tempfile::TempDir) -> RecordStore {
        let path = dir.path().join("records.db");
        RecordStore::create(&path).unwrap();
        let mut store = RecordStore::open(&path).unwrap();
        for i in 0..100 {
            store
                .insert(&descriptor(), &tuple(i, &format!("n{}", i), i as f32 * 10.0))
                .unwrap();
        }
        store
    }

    fn drain(scan: &mut RecordScan) -> Vec<(Rid, Tuple)> {
        let mut out = Vec::new();
        while let Some(item) = scan.next().unwrap() {
            out.push(item);
        }
        out
    }

    #[test]
    fn test_unconditioned_scan_visits_everything() {
        let dir = tempdir().unwrap();
        let store = populated_store(&dir);

        let mut scan = store
            .scan(&descriptor(), None, CompOp::NoOp, &Value::Null, &names(&["id", "name", "salary"]))
            .unwrap();
        let rows = drain(&mut scan);
        assert_eq!(rows.len(), 100);
        assert_eq!(rows[0].1, tuple(0, "n0", 0.0));
        assert_eq!(rows[99].1, tuple(99, "n99", 990.0));
    }

    #[test]
    fn test_predicate_pushdown() {
        let dir = tempdir().unwrap();
        let store = populated_store(&dir);

        let mut scan = store
            .scan(&descriptor(), Some("id"), CompOp::Lt, &Value::Int(10), &names(&["id"]))
            .unwrap();
        let rows = drain(&mut scan);
        assert_eq!(rows.len(), 10);
        assert!(rows.iter().all(|(_, t)| matches!(t.values[0], Value::Int(n) if n < 10)));

        let mut scan = store
            .scan(
                &descriptor(),
                Some("name"),
                CompOp::Eq,
                &Value::Varchar("n42".into()),
                &names(&["salary"]),
            )
            .unwrap();
        let rows = drain(&mut scan);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.values, vec![Value::Real(420.0)]);
    }

    #[test]
    fn test_projection_order() {
        let dir = tempdir().unwrap();
        let store = populated_store(&dir);

        let mut scan = store
            .scan(&descriptor(), Some("id"), CompOp::Eq, &Value::Int(3), &names(&["salary", "id"]))
            .unwrap();
        let rows = drain(&mut scan);
        assert_eq!(rows[0].1.values, vec![Value::Real(30.0), Value::Int(3)]);
    }

    #[test]
    fn test_scan_skips_deleted_and_forwarded_home_slots() {
        let dir = tempdir().unwrap();
        let mut store = populated_store(&dir);

        // Delete one record and force another to forward.
        let all: Vec<Rid> = {
            let mut scan = store
                .scan(&descriptor(), None, CompOp::NoOp, &Value::Null, &names(&["id"]))
                .unwrap();
            drain(&mut scan).into_iter().map(|(rid, _)| rid).collect()
        };
        store.delete(&descriptor(), all[5]).unwrap();

        let mut rows = Vec::new();
        let mut scan = store
            .scan(&descriptor(), None, CompOp::NoOp, &Value::Null, &names(&["id"]))
            .unwrap();
        while let Some((_, t)) = scan.next().unwrap() {
            rows.push(t.values[0].clone());
        }
        assert_eq!(rows.len(), 99);
        assert!(!rows.contains(&Value::Int(5)));
    }

    #[test]
    fn test_scan_null_condition_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.db");
        RecordStore::create(&path).unwrap();
        let mut store = RecordStore::open(&path).unwrap();
        store
            .insert(&descriptor(), &Tuple::new(vec![Value::Int(1), Value::Null, Value::Real(0.0)]))
            .unwrap();
        store.insert(&descriptor(), &tuple(2, "x", 0.0)).unwrap();

        // name = NULL matches only the null-named record.
        let mut scan = store
            .scan(&descriptor(), Some("name"), CompOp::Eq, &Value::Null, &names(&["id"]))
            .unwrap();
        let rows = drain(&mut scan);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.values, vec![Value::Int(1)]);

        // name != <value> matches the NULL row too.
        let mut scan = store
            .scan(
                &descriptor(),
                Some("name"),
                CompOp::Ne,
                &Value::Varchar("zzz".into()),
                &names(&["id"]),
            )
            .unwrap();
        assert_eq!(drain(&mut scan).len(), 2);
    }

    #[test]
    fn test_scan_bad_arguments() {
        let dir = tempdir().unwrap();
        let store = populated_store(&dir);

        assert!(matches!(
            store.scan(&descriptor(), Some("ghost"), CompOp::Eq, &Value::Int(1), &names(&["id"])),
            Err(HeapError::UnknownAttribute(_))
        ));
        assert!(matches!(
            store.scan(&descriptor(), None, CompOp::NoOp, &Value::Null, &names(&["ghost"])),
            Err(HeapError::UnknownAttribute(_))
        ));
        assert!(matches!(
            store.scan(&descriptor(), Some("id"), CompOp::Eq, &Value::Varchar("x".into()), &names(&["id"])),
            Err(HeapError::Serialization(_))
        ));
    }
}
