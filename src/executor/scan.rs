//! Access methods: sequential table scan and index scan.

use crate::catalog::{RelationManager, TableIndexScan, TableScan};
use crate::datum::{Attribute, CompOp, Value};
use crate::executor::error::ExecutorError;
use crate::executor::Executor;
use crate::tuple::Tuple;

/// Qualifies a table's attributes as `table.attr`.
fn qualify(table: &str, attrs: &[Attribute]) -> Vec<Attribute> {
    attrs
        .iter()
        .map(|a| Attribute::new(format!("{}.{}", table, a.name), a.ty, a.length))
        .collect()
}

/// A full table scan access method.
pub struct SeqScan<'a> {
    rm: &'a RelationManager,
    table_name: String,
    attrs: Vec<Attribute>,
    scan: TableScan,
}

impl<'a> SeqScan<'a> {
    /// Opens an unconditioned scan over `table`.
    pub fn new(rm: &'a RelationManager, table: &str) -> Result<Self, ExecutorError> {
        let attrs = rm.get_attributes(table)?;
        let scan = Self::open_scan(rm, table, &attrs)?;
        Ok(Self {
            rm,
            table_name: table.to_string(),
            attrs,
            scan,
        })
    }

    /// Restarts the scan from the beginning of the table.
    pub fn reset(&mut self) -> Result<(), ExecutorError> {
        self.scan = Self::open_scan(self.rm, &self.table_name, &self.attrs)?;
        Ok(())
    }

    fn open_scan(
        rm: &RelationManager,
        table: &str,
        attrs: &[Attribute],
    ) -> Result<TableScan, ExecutorError> {
        let projection: Vec<String> = attrs.iter().map(|a| a.name.clone()).collect();
        Ok(rm.scan(table, None, CompOp::NoOp, &Value::Null, &projection)?)
    }
}

impl Executor for SeqScan<'_> {
    fn next_tuple(&mut self) -> Result<Option<Tuple>, ExecutorError> {
        Ok(self.scan.next()?.map(|(_, tuple)| tuple))
    }

    fn attributes(&self) -> Vec<Attribute> {
        qualify(&self.table_name, &self.attrs)
    }
}

/// An index scan access method.
///
/// Yields whole tuples: each index entry's RID is chased back into the
/// table. [`seek`](Self::seek) restarts the scan with a new key range,
/// which is how index nested-loop joins re-probe the inner side.
pub struct IndexScan<'a> {
    rm: &'a RelationManager,
    table_name: String,
    attr_name: String,
    attrs: Vec<Attribute>,
    scan: TableIndexScan,
}

impl<'a> IndexScan<'a> {
    /// Opens a full-range scan over the index on `(table, attr)`.
    pub fn new(rm: &'a RelationManager, table: &str, attr: &str) -> Result<Self, ExecutorError> {
        let attrs = rm.get_attributes(table)?;
        let scan = rm.index_scan(table, attr, None, None, true, true)?;
        Ok(Self {
            rm,
            table_name: table.to_string(),
            attr_name: attr.to_string(),
            attrs,
            scan,
        })
    }

    /// Restarts the scan over a new key range.
    pub fn seek(
        &mut self,
        low: Option<&Value>,
        high: Option<&Value>,
        low_inclusive: bool,
        high_inclusive: bool,
    ) -> Result<(), ExecutorError> {
        self.scan = self.rm.index_scan(
            &self.table_name,
            &self.attr_name,
            low,
            high,
            low_inclusive,
            high_inclusive,
        )?;
        Ok(())
    }
}

impl Executor for IndexScan<'_> {
    fn next_tuple(&mut self) -> Result<Option<Tuple>, ExecutorError> {
        match self.scan.next()? {
            Some((rid, _)) => Ok(Some(self.rm.read_tuple(&self.table_name, rid)?)),
            None => Ok(None),
        }
    }

    fn attributes(&self) -> Vec<Attribute> {
        qualify(&self.table_name, &self.attrs)
    }
}
