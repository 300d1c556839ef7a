//! The relation manager: DDL, DML, and index maintenance.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::catalog::error::CatalogError;
use crate::catalog::schema::{
    self, column_rows_for, columns_descriptor, index_file_name, indices_descriptor,
    indices_tuple, tables_descriptor, tables_tuple, CATALOG_INFO_FILE, COLUMNS_ID, COLUMNS_TABLE,
    FIRST_USER_TABLE_ID, INDICES_TABLE, TABLES_ID, TABLES_TABLE,
};
use crate::datum::{Attribute, CompOp, Type, Value};
use crate::heap::{RecordScan, RecordStore, Rid};
use crate::index::{IndexFile, IndexScan};
use crate::tuple::Tuple;

/// The relation manager.
///
/// A caller-constructed value over a base directory; every file the
/// catalog describes lives in that directory. The manager holds no open
/// handles between calls: each operation opens what it needs, so there
/// is exactly one mutable handle per file at any instant.
pub struct RelationManager {
    base_dir: PathBuf,
}

/// An index known to the catalog.
struct IndexMeta {
    file_name: String,
    attr_name: String,
    rid: Rid,
}

impl RelationManager {
    /// Creates a relation manager rooted at `base_dir`.
    ///
    /// The directory must exist; the catalog inside it need not (see
    /// [`create_catalog`](Self::create_catalog)).
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Creates the catalog: the three catalog files, their self-
    /// describing rows, and the next-table-id sidecar.
    pub fn create_catalog(&mut self) -> Result<(), CatalogError> {
        RecordStore::create(self.path_of(TABLES_TABLE))?;
        RecordStore::create(self.path_of(COLUMNS_TABLE))?;
        RecordStore::create(self.path_of(INDICES_TABLE))?;

        let mut tables = self.open_store(TABLES_TABLE)?;
        tables.insert(
            &tables_descriptor(),
            &tables_tuple(TABLES_ID, TABLES_TABLE, TABLES_TABLE, true),
        )?;
        tables.insert(
            &tables_descriptor(),
            &tables_tuple(COLUMNS_ID, COLUMNS_TABLE, COLUMNS_TABLE, true),
        )?;

        let mut columns = self.open_store(COLUMNS_TABLE)?;
        for row in column_rows_for(TABLES_ID, &tables_descriptor(), true) {
            columns.insert(&columns_descriptor(), &row)?;
        }
        for row in column_rows_for(COLUMNS_ID, &columns_descriptor(), true) {
            columns.insert(&columns_descriptor(), &row)?;
        }

        self.write_next_table_id(FIRST_USER_TABLE_ID)?;
        debug!("created catalog in {}", self.base_dir.display());
        Ok(())
    }

    /// Destroys the catalog files and the sidecar.
    ///
    /// Tables created through this manager are not touched; delete them
    /// first if their files should go too.
    pub fn delete_catalog(&mut self) -> Result<(), CatalogError> {
        RecordStore::destroy(self.path_of(TABLES_TABLE))?;
        RecordStore::destroy(self.path_of(COLUMNS_TABLE))?;
        RecordStore::destroy(self.path_of(INDICES_TABLE))?;
        fs::remove_file(self.path_of(CATALOG_INFO_FILE))?;
        Ok(())
    }

    /// Creates a table: allocates a table id, registers the schema, and
    /// creates the record file.
    pub fn create_table(
        &mut self,
        name: &str,
        descriptor: &[Attribute],
    ) -> Result<(), CatalogError> {
        if schema::is_system_table(name) {
            return Err(CatalogError::SystemTable(name.to_string()));
        }
        if self.table_row(name)?.is_some() {
            return Err(CatalogError::TableExists(name.to_string()));
        }

        let table_id = self.read_next_table_id()?;
        RecordStore::create(self.path_of(name))?;

        let mut tables = self.open_store(TABLES_TABLE)?;
        tables.insert(
            &tables_descriptor(),
            &tables_tuple(table_id as i32, name, name, false),
        )?;
        let mut columns = self.open_store(COLUMNS_TABLE)?;
        for row in column_rows_for(table_id as i32, descriptor, false) {
            columns.insert(&columns_descriptor(), &row)?;
        }

        self.write_next_table_id(table_id + 1)?;
        debug!("created table \"{}\" (id {})", name, table_id);
        Ok(())
    }

    /// Deletes a table: its catalog rows, its record file, and every
    /// index built on it.
    pub fn delete_table(&mut self, name: &str) -> Result<(), CatalogError> {
        if schema::is_system_table(name) {
            return Err(CatalogError::SystemTable(name.to_string()));
        }
        let (table_id, tables_rid) = self
            .table_row(name)?
            .ok_or_else(|| CatalogError::TableNotFound(name.to_string()))?;
        let indices = self.indices_for(name)?;

        self.delete_catalog_tuple(TABLES_TABLE, &tables_descriptor(), tables_rid)?;

        let column_rids: Vec<Rid> = {
            let mut scan = self.scan_catalog(
                COLUMNS_TABLE,
                &columns_descriptor(),
                Some("table-id"),
                CompOp::Eq,
                &Value::Int(table_id),
                &["column-name"],
            )?;
            let mut rids = Vec::new();
            while let Some((rid, _)) = scan.next()? {
                rids.push(rid);
            }
            rids
        };
        for rid in column_rids {
            self.delete_catalog_tuple(COLUMNS_TABLE, &columns_descriptor(), rid)?;
        }

        for index in &indices {
            self.delete_catalog_tuple(INDICES_TABLE, &indices_descriptor(), index.rid)?;
        }
        RecordStore::destroy(self.path_of(name))?;
        for index in &indices {
            IndexFile::destroy(self.path_of(&index.file_name))?;
        }
        debug!("deleted table \"{}\"", name);
        Ok(())
    }

    /// Returns a table's attributes in declared (column-position) order.
    pub fn get_attributes(&self, name: &str) -> Result<Vec<Attribute>, CatalogError> {
        if name == TABLES_TABLE {
            return Ok(tables_descriptor());
        }
        if name == COLUMNS_TABLE {
            return Ok(columns_descriptor());
        }
        if name == INDICES_TABLE {
            return Ok(indices_descriptor());
        }

        let (table_id, _) = self
            .table_row(name)?
            .ok_or_else(|| CatalogError::TableNotFound(name.to_string()))?;

        let mut scan = self.scan_catalog(
            COLUMNS_TABLE,
            &columns_descriptor(),
            Some("table-id"),
            CompOp::Eq,
            &Value::Int(table_id),
            &["column-name", "column-type", "column-length", "column-position"],
        )?;

        let mut rows: Vec<(i32, Attribute)> = Vec::new();
        while let Some((_, tuple)) = scan.next()? {
            let name = match &tuple.values[0] {
                Value::Varchar(s) => s.clone(),
                other => return Err(corrupt_column("column-name", other)),
            };
            let ty = match &tuple.values[1] {
                Value::Int(code) => Type::from_code(*code)
                    .ok_or_else(|| corrupt_column("column-type", &tuple.values[1]))?,
                other => return Err(corrupt_column("column-type", other)),
            };
            let length = match &tuple.values[2] {
                Value::Int(n) => *n as u32,
                other => return Err(corrupt_column("column-length", other)),
            };
            let position = match &tuple.values[3] {
                Value::Int(n) => *n,
                other => return Err(corrupt_column("column-position", other)),
            };
            rows.push((position, Attribute::new(name, ty, length)));
        }
        rows.sort_by_key(|(position, _)| *position);
        Ok(rows.into_iter().map(|(_, attr)| attr).collect())
    }

    /// Inserts a tuple and mirrors it into every index on the table.
    pub fn insert_tuple(&mut self, table: &str, tuple: &Tuple) -> Result<Rid, CatalogError> {
        if schema::is_system_table(table) {
            return Err(CatalogError::SystemTable(table.to_string()));
        }
        let descriptor = self.get_attributes(table)?;
        let mut store = self.open_store(table)?;
        let rid = store.insert(&descriptor, tuple)?;

        for index in self.indices_for(table)? {
            let attr = resolve_attr(table, &descriptor, &index.attr_name)?;
            if let Some(key) = non_null_field(tuple, &descriptor, &index.attr_name) {
                let mut file = self.open_index(&index.file_name)?;
                file.insert_entry(attr, &key, rid)?;
            }
        }
        Ok(rid)
    }

    /// Deletes a tuple and removes it from every index on the table.
    pub fn delete_tuple(&mut self, table: &str, rid: Rid) -> Result<(), CatalogError> {
        if schema::is_system_table(table) {
            return Err(CatalogError::SystemTable(table.to_string()));
        }
        let descriptor = self.get_attributes(table)?;
        let mut store = self.open_store(table)?;
        let pre_image = store.read(&descriptor, rid)?;
        store.delete(&descriptor, rid)?;

        for index in self.indices_for(table)? {
            let attr = resolve_attr(table, &descriptor, &index.attr_name)?;
            if let Some(key) = non_null_field(&pre_image, &descriptor, &index.attr_name) {
                let mut file = self.open_index(&index.file_name)?;
                file.delete_entry(attr, &key, rid)?;
            }
        }
        Ok(())
    }

    /// Updates a tuple in place (stable RID) and re-keys every index on
    /// the table.
    pub fn update_tuple(&mut self, table: &str, rid: Rid, tuple: &Tuple) -> Result<(), CatalogError> {
        if schema::is_system_table(table) {
            return Err(CatalogError::SystemTable(table.to_string()));
        }
        let descriptor = self.get_attributes(table)?;
        let mut store = self.open_store(table)?;
        let pre_image = store.read(&descriptor, rid)?;
        store.update(&descriptor, rid, tuple)?;

        for index in self.indices_for(table)? {
            let attr = resolve_attr(table, &descriptor, &index.attr_name)?;
            let mut file = self.open_index(&index.file_name)?;
            if let Some(old_key) = non_null_field(&pre_image, &descriptor, &index.attr_name) {
                file.delete_entry(attr, &old_key, rid)?;
            }
            if let Some(new_key) = non_null_field(tuple, &descriptor, &index.attr_name) {
                file.insert_entry(attr, &new_key, rid)?;
            }
        }
        Ok(())
    }

    /// Reads the tuple at `rid`. System tables are readable.
    pub fn read_tuple(&self, table: &str, rid: Rid) -> Result<Tuple, CatalogError> {
        let descriptor = self.get_attributes(table)?;
        let mut store = self.open_store(table)?;
        Ok(store.read(&descriptor, rid)?)
    }

    /// Reads one attribute of the tuple at `rid`.
    pub fn read_attribute(
        &self,
        table: &str,
        rid: Rid,
        attr_name: &str,
    ) -> Result<Value, CatalogError> {
        let descriptor = self.get_attributes(table)?;
        let mut store = self.open_store(table)?;
        Ok(store.read_attribute(&descriptor, rid, attr_name)?)
    }

    /// Starts a table scan with an optional pushdown predicate.
    pub fn scan(
        &self,
        table: &str,
        condition_attr: Option<&str>,
        op: CompOp,
        value: &Value,
        projection: &[String],
    ) -> Result<TableScan, CatalogError> {
        let descriptor = self.get_attributes(table)?;
        let store = self.open_store(table)?;
        let inner = store.scan(&descriptor, condition_attr, op, value, projection)?;
        Ok(TableScan { inner })
    }

    /// Creates an index on `(table, attr)` and backfills it from the
    /// existing rows. Rows whose key field is NULL are not indexed.
    pub fn create_index(&mut self, table: &str, attr_name: &str) -> Result<(), CatalogError> {
        if schema::is_system_table(table) {
            return Err(CatalogError::SystemTable(table.to_string()));
        }
        let descriptor = self.get_attributes(table)?;
        let attr = resolve_attr(table, &descriptor, attr_name)?.clone();
        if self.find_index(table, attr_name)?.is_some() {
            return Err(CatalogError::IndexExists {
                table: table.to_string(),
                attr: attr_name.to_string(),
            });
        }

        let file_name = index_file_name(table, attr_name);
        IndexFile::create(self.path_of(&file_name))?;
        let mut indices = self.open_store(INDICES_TABLE)?;
        indices.insert(
            &indices_descriptor(),
            &indices_tuple(&file_name, attr_name, table, false),
        )?;

        let mut index = self.open_index(&file_name)?;
        let mut scan = self.scan(table, None, CompOp::NoOp, &Value::Null, &[attr_name.to_string()])?;
        while let Some((rid, tuple)) = scan.next()? {
            if !tuple.values[0].is_null() {
                index.insert_entry(&attr, &tuple.values[0], rid)?;
            }
        }
        debug!("created index {} on \"{}\"", file_name, table);
        Ok(())
    }

    /// Drops the index on `(table, attr)`: its catalog row and its file.
    pub fn destroy_index(&mut self, table: &str, attr_name: &str) -> Result<(), CatalogError> {
        let index = self
            .find_index(table, attr_name)?
            .ok_or_else(|| CatalogError::IndexNotFound {
                table: table.to_string(),
                attr: attr_name.to_string(),
            })?;

        self.delete_catalog_tuple(INDICES_TABLE, &indices_descriptor(), index.rid)?;
        IndexFile::destroy(self.path_of(&index.file_name))?;
        Ok(())
    }

    /// Starts a range scan over the index on `(table, attr)`.
    pub fn index_scan(
        &self,
        table: &str,
        attr_name: &str,
        low: Option<&Value>,
        high: Option<&Value>,
        low_inclusive: bool,
        high_inclusive: bool,
    ) -> Result<TableIndexScan, CatalogError> {
        let descriptor = self.get_attributes(table)?;
        let attr = resolve_attr(table, &descriptor, attr_name)?;
        let index = self
            .find_index(table, attr_name)?
            .ok_or_else(|| CatalogError::IndexNotFound {
                table: table.to_string(),
                attr: attr_name.to_string(),
            })?;

        let mut file = self.open_index(&index.file_name)?;
        let inner = file.scan(attr, low, high, low_inclusive, high_inclusive)?;
        Ok(TableIndexScan { inner })
    }

    fn path_of(&self, file_name: &str) -> PathBuf {
        self.base_dir.join(file_name)
    }

    fn open_store(&self, table: &str) -> Result<RecordStore, CatalogError> {
        Ok(RecordStore::open(self.path_of(table))?)
    }

    fn open_index(&self, file_name: &str) -> Result<IndexFile, CatalogError> {
        Ok(IndexFile::open(self.path_of(file_name))?)
    }

    /// Scans a catalog table with its fixed descriptor.
    fn scan_catalog(
        &self,
        table: &str,
        descriptor: &[Attribute],
        condition_attr: Option<&str>,
        op: CompOp,
        value: &Value,
        projection: &[&str],
    ) -> Result<RecordScan, CatalogError> {
        let projection: Vec<String> = projection.iter().map(|s| s.to_string()).collect();
        let store = self.open_store(table)?;
        Ok(store.scan(descriptor, condition_attr, op, value, &projection)?)
    }

    /// Looks up a table's id and catalog RID by name.
    fn table_row(&self, name: &str) -> Result<Option<(i32, Rid)>, CatalogError> {
        let mut scan = self.scan_catalog(
            TABLES_TABLE,
            &tables_descriptor(),
            Some("table-name"),
            CompOp::Eq,
            &Value::Varchar(name.to_string()),
            &["table-id"],
        )?;
        match scan.next()? {
            Some((rid, tuple)) => match tuple.values[0] {
                Value::Int(id) => Ok(Some((id, rid))),
                ref other => Err(corrupt_column("table-id", other)),
            },
            None => Ok(None),
        }
    }

    /// Returns every index registered on a table.
    fn indices_for(&self, table: &str) -> Result<Vec<IndexMeta>, CatalogError> {
        let mut scan = self.scan_catalog(
            INDICES_TABLE,
            &indices_descriptor(),
            Some("table-name"),
            CompOp::Eq,
            &Value::Varchar(table.to_string()),
            &["index-name", "attribute-name"],
        )?;
        let mut out = Vec::new();
        while let Some((rid, tuple)) = scan.next()? {
            let file_name = match &tuple.values[0] {
                Value::Varchar(s) => s.clone(),
                other => return Err(corrupt_column("index-name", other)),
            };
            let attr_name = match &tuple.values[1] {
                Value::Varchar(s) => s.clone(),
                other => return Err(corrupt_column("attribute-name", other)),
            };
            out.push(IndexMeta {
                file_name,
                attr_name,
                rid,
            });
        }
        Ok(out)
    }

    fn find_index(&self, table: &str, attr_name: &str) -> Result<Option<IndexMeta>, CatalogError> {
        Ok(self
            .indices_for(table)?
            .into_iter()
            .find(|index| index.attr_name == attr_name))
    }

    /// Deletes a catalog row, refusing system rows.
    fn delete_catalog_tuple(
        &self,
        table: &str,
        descriptor: &[Attribute],
        rid: Rid,
    ) -> Result<(), CatalogError> {
        let mut store = self.open_store(table)?;
        if store.read_attribute(descriptor, rid, "system-flag")? == Value::Int(1) {
            return Err(CatalogError::SystemTuple(rid));
        }
        store.delete(descriptor, rid)?;
        Ok(())
    }

    fn read_next_table_id(&self) -> Result<u32, CatalogError> {
        let bytes = fs::read(self.path_of(CATALOG_INFO_FILE))?;
        let bytes: [u8; 4] = bytes.get(0..4).and_then(|b| b.try_into().ok()).ok_or_else(|| {
            CatalogError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                "catalog sidecar is truncated",
            ))
        })?;
        Ok(u32::from_le_bytes(bytes))
    }

    fn write_next_table_id(&self, table_id: u32) -> Result<(), CatalogError> {
        fs::write(self.path_of(CATALOG_INFO_FILE), table_id.to_le_bytes())?;
        Ok(())
    }
}

/// A tuple scan handed out by the relation manager.
pub struct TableScan {
    inner: RecordScan,
}

impl TableScan {
    /// Returns the next matching `(rid, tuple)`, or `None` at EOF.
    pub fn next(&mut self) -> Result<Option<(Rid, Tuple)>, CatalogError> {
        Ok(self.inner.next()?)
    }

    /// Releases the scan. Dropping it has the same effect.
    pub fn close(self) {}
}

/// An index range scan handed out by the relation manager.
pub struct TableIndexScan {
    inner: IndexScan,
}

impl TableIndexScan {
    /// Returns the next `(rid, key)` in ascending composite order.
    pub fn next(&mut self) -> Result<Option<(Rid, Value)>, CatalogError> {
        Ok(self.inner.next()?)
    }

    /// Releases the scan. Dropping it has the same effect.
    pub fn close(self) {}
}

fn resolve_attr<'a>(
    table: &str,
    descriptor: &'a [Attribute],
    attr_name: &str,
) -> Result<&'a Attribute, CatalogError> {
    descriptor
        .iter()
        .find(|a| a.name == attr_name)
        .ok_or_else(|| CatalogError::UnknownAttribute {
            table: table.to_string(),
            attr: attr_name.to_string(),
        })
}

fn non_null_field(tuple: &Tuple, descriptor: &[Attribute], attr_name: &str) -> Option<Value> {
    match tuple.field_by_name(descriptor, attr_name) {
        Some(Value::Null) | None => None,
        Some(value) => Some(value.clone()),
    }
}

fn corrupt_column(column: &str, value: &Value) -> CatalogError {
    CatalogError::Heap(crate::heap::HeapError::Corrupted(format!(
        "catalog column {} holds unexpected value {:?}",
        column, value
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn emp_descriptor() -> Vec<Attribute> {
        vec![
            Attribute::int("id"),
            Attribute::varchar("name", 20),
            Attribute::real("salary"),
        ]
    }

    fn emp(id: i32, name: &str, salary: f32) -> Tuple {
        Tuple::new(vec![
            Value::Int(id),
            Value::Varchar(name.into()),
            Value::Real(salary),
        ])
    }

    fn fresh_rm(dir: &tempfile::TempDir) -> RelationManager {
        let mut rm = RelationManager::new(dir.path());
        rm.create_catalog().unwrap();
        rm
    }

    #[test]
    fn test_catalog_bootstrap_self_describes() {
        let dir = tempdir().unwrap();
        let rm = fresh_rm(&dir);

        // The catalog tables answer for their own schemas.
        assert_eq!(rm.get_attributes(TABLES_TABLE).unwrap(), tables_descriptor());
        assert_eq!(rm.get_attributes(COLUMNS_TABLE).unwrap(), columns_descriptor());

        // And their rows are present and flagged as system rows.
        let mut scan = rm
            .scan(TABLES_TABLE, None, CompOp::NoOp, &Value::Null, &["system-flag".into()])
            .unwrap();
        let mut count = 0;
        while let Some((_, t)) = scan.next().unwrap() {
            assert_eq!(t.values[0], Value::Int(1));
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn test_create_table_and_get_attributes() {
        let dir = tempdir().unwrap();
        let mut rm = fresh_rm(&dir);

        rm.create_table("emp", &emp_descriptor()).unwrap();
        assert_eq!(rm.get_attributes("emp").unwrap(), emp_descriptor());

        assert!(matches!(
            rm.create_table("emp", &emp_descriptor()),
            Err(CatalogError::TableExists(_))
        ));
        assert!(matches!(
            rm.get_attributes("ghost"),
            Err(CatalogError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_delete_table_removes_everything() {
        let dir = tempdir().unwrap();
        let mut rm = fresh_rm(&dir);

        rm.create_table("emp", &emp_descriptor()).unwrap();
        rm.create_index("emp", "id").unwrap();
        rm.insert_tuple("emp", &emp(1, "a", 1.0)).unwrap();

        rm.delete_table("emp").unwrap();
        assert!(matches!(
            rm.get_attributes("emp"),
            Err(CatalogError::TableNotFound(_))
        ));
        assert!(!dir.path().join("emp").exists());
        assert!(!dir.path().join(index_file_name("emp", "id")).exists());

        // The name is reusable afterwards.
        rm.create_table("emp", &emp_descriptor()).unwrap();
    }

    #[test]
    fn test_system_table_protection() {
        let dir = tempdir().unwrap();
        let mut rm = fresh_rm(&dir);

        assert!(matches!(
            rm.create_table(TABLES_TABLE, &emp_descriptor()),
            Err(CatalogError::SystemTable(_))
        ));
        assert!(matches!(
            rm.delete_table(COLUMNS_TABLE),
            Err(CatalogError::SystemTable(_))
        ));
        assert!(matches!(
            rm.insert_tuple(TABLES_TABLE, &tables_tuple(99, "x", "x", false)),
            Err(CatalogError::SystemTable(_))
        ));

        // System tuples are unreachable even through internal deletion.
        let mut scan = rm
            .scan(TABLES_TABLE, None, CompOp::NoOp, &Value::Null, &["table-id".into()])
            .unwrap();
        let (rid, _) = scan.next().unwrap().unwrap();
        assert!(matches!(
            rm.delete_tuple(TABLES_TABLE, rid),
            Err(CatalogError::SystemTable(_))
        ));
    }

    #[test]
    fn test_dml_roundtrip() {
        let dir = tempdir().unwrap();
        let mut rm = fresh_rm(&dir);
        rm.create_table("emp", &emp_descriptor()).unwrap();

        let rid = rm.insert_tuple("emp", &emp(7, "Ada", 1000.0)).unwrap();
        assert_eq!(rm.read_tuple("emp", rid).unwrap(), emp(7, "Ada", 1000.0));
        assert_eq!(
            rm.read_attribute("emp", rid, "name").unwrap(),
            Value::Varchar("Ada".into())
        );

        rm.update_tuple("emp", rid, &emp(7, "Ada L.", 2000.0)).unwrap();
        assert_eq!(rm.read_tuple("emp", rid).unwrap(), emp(7, "Ada L.", 2000.0));

        rm.delete_tuple("emp", rid).unwrap();
        assert!(rm.read_tuple("emp", rid).is_err());
    }

    #[test]
    fn test_index_maintenance_on_dml() {
        let dir = tempdir().unwrap();
        let mut rm = fresh_rm(&dir);
        rm.create_table("emp", &emp_descriptor()).unwrap();
        rm.create_index("emp", "id").unwrap();

        let r1 = rm.insert_tuple("emp", &emp(1, "a", 1.0)).unwrap();
        let r2 = rm.insert_tuple("emp", &emp(2, "b", 2.0)).unwrap();
        let _r3 = rm.insert_tuple("emp", &emp(3, "c", 3.0)).unwrap();

        let collect = |rm: &RelationManager| -> Vec<(Rid, Value)> {
            let mut scan = rm.index_scan("emp", "id", None, None, true, true).unwrap();
            let mut out = Vec::new();
            while let Some(item) = scan.next().unwrap() {
                out.push(item);
            }
            out
        };

        assert_eq!(collect(&rm).len(), 3);

        // Update re-keys the entry.
        rm.update_tuple("emp", r2, &emp(20, "b", 2.0)).unwrap();
        let entries = collect(&rm);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2], (r2, Value::Int(20)));

        // Delete removes its entry.
        rm.delete_tuple("emp", r1).unwrap();
        assert_eq!(collect(&rm).len(), 2);
    }

    #[test]
    fn test_create_index_backfills() {
        let dir = tempdir().unwrap();
        let mut rm = fresh_rm(&dir);
        rm.create_table("emp", &emp_descriptor()).unwrap();

        for i in 0..50 {
            rm.insert_tuple("emp", &emp(i, "x", i as f32)).unwrap();
        }
        rm.create_index("emp", "id").unwrap();

        let mut scan = rm
            .index_scan("emp", "id", Some(&Value::Int(10)), Some(&Value::Int(19)), true, true)
            .unwrap();
        let mut count = 0;
        while scan.next().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 10);

        assert!(matches!(
            rm.create_index("emp", "id"),
            Err(CatalogError::IndexExists { .. })
        ));
        assert!(matches!(
            rm.create_index("emp", "ghost"),
            Err(CatalogError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn test_destroy_index() {
        let dir = tempdir().unwrap();
        let mut rm = fresh_rm(&dir);
        rm.create_table("emp", &emp_descriptor()).unwrap();
        rm.create_index("emp", "id").unwrap();

        rm.destroy_index("emp", "id").unwrap();
        assert!(matches!(
            rm.index_scan("emp", "id", None, None, true, true),
            Err(CatalogError::IndexNotFound { .. })
        ));
        assert!(matches!(
            rm.destroy_index("emp", "id"),
            Err(CatalogError::IndexNotFound { .. })
        ));

        // Inserts still work with no index present.
        rm.insert_tuple("emp", &emp(1, "a", 1.0)).unwrap();
    }

    #[test]
    fn test_null_keys_are_unindexed() {
        let dir = tempdir().unwrap();
        let mut rm = fresh_rm(&dir);
        rm.create_table("emp", &emp_descriptor()).unwrap();
        rm.create_index("emp", "id").unwrap();

        rm.insert_tuple(
            "emp",
            &Tuple::new(vec![Value::Null, Value::Varchar("n".into()), Value::Real(0.0)]),
        )
        .unwrap();
        rm.insert_tuple("emp", &emp(1, "a", 1.0)).unwrap();

        let mut scan = rm.index_scan("emp", "id", None, None, true, true).unwrap();
        let mut count = 0;
        while scan.next().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 1);
    }

    #[test]
    fn test_table_ids_are_monotonic() {
        let dir = tempdir().unwrap();
        let mut rm = fresh_rm(&dir);

        rm.create_table("a", &emp_descriptor()).unwrap();
        rm.create_table("b", &emp_descriptor()).unwrap();
        rm.delete_table("a").unwrap();
        rm.create_table("c", &emp_descriptor()).unwrap();

        let (id_b, _) = rm.table_row("b").unwrap().unwrap();
        let (id_c, _) = rm.table_row("c").unwrap().unwrap();
        assert_eq!(id_b, FIRST_USER_TABLE_ID as i32 + 1);
        assert_eq!(id_c, FIRST_USER_TABLE_ID as i32 + 2);
    }
}
