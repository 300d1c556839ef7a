//! Catalog table schemas and row builders.
//!
//! The three catalog tables describe themselves and every user table:
//!
//! - `Tables(table-id, table-name, file-name, system-flag)`
//! - `Columns(table-id, column-name, column-type, column-length,
//!   column-position, system-flag)`
//! - `Indices(index-name, attribute-name, table-name, system-flag)`
//!
//! `Tables` is table id 1 and `Columns` id 2; `Indices` rows are keyed by
//! name and carry no table id. Rows with `system-flag = 1` are immutable
//! through the public interface.

use crate::datum::{Attribute, Type, Value};
use crate::tuple::Tuple;

/// Name of the table catalog.
pub const TABLES_TABLE: &str = "Tables";

/// Name of the column catalog.
pub const COLUMNS_TABLE: &str = "Columns";

/// Name of the index catalog.
pub const INDICES_TABLE: &str = "Indices";

/// Name of the sidecar file persisting the next table id.
pub const CATALOG_INFO_FILE: &str = "catalog_information";

/// Reserved table id of `Tables`.
pub const TABLES_ID: i32 = 1;

/// Reserved table id of `Columns`.
pub const COLUMNS_ID: i32 = 2;

/// First table id handed out to user tables.
pub const FIRST_USER_TABLE_ID: u32 = 3;

/// Declared maximum length of catalog name columns.
pub const NAME_LENGTH: u32 = 50;

/// Returns true for the three catalog table names.
pub fn is_system_table(name: &str) -> bool {
    name == TABLES_TABLE || name == COLUMNS_TABLE || name == INDICES_TABLE
}

/// Schema of the `Tables` catalog.
pub fn tables_descriptor() -> Vec<Attribute> {
    vec![
        Attribute::int("table-id"),
        Attribute::varchar("table-name", NAME_LENGTH),
        Attribute::varchar("file-name", NAME_LENGTH),
        Attribute::int("system-flag"),
    ]
}

/// Schema of the `Columns` catalog.
pub fn columns_descriptor() -> Vec<Attribute> {
    vec![
        Attribute::int("table-id"),
        Attribute::varchar("column-name", NAME_LENGTH),
        Attribute::int("column-type"),
        Attribute::int("column-length"),
        Attribute::int("column-position"),
        Attribute::int("system-flag"),
    ]
}

/// Schema of the `Indices` catalog.
pub fn indices_descriptor() -> Vec<Attribute> {
    vec![
        Attribute::varchar("index-name", NAME_LENGTH),
        Attribute::varchar("attribute-name", NAME_LENGTH),
        Attribute::varchar("table-name", NAME_LENGTH),
        Attribute::int("system-flag"),
    ]
}

/// Builds a `Tables` row.
pub fn tables_tuple(table_id: i32, name: &str, file_name: &str, system: bool) -> Tuple {
    Tuple::new(vec![
        Value::Int(table_id),
        Value::Varchar(name.to_string()),
        Value::Varchar(file_name.to_string()),
        Value::Int(system as i32),
    ])
}

/// Builds a `Columns` row.
pub fn columns_tuple(
    table_id: i32,
    name: &str,
    ty: Type,
    length: u32,
    position: i32,
    system: bool,
) -> Tuple {
    Tuple::new(vec![
        Value::Int(table_id),
        Value::Varchar(name.to_string()),
        Value::Int(ty.code()),
        Value::Int(length as i32),
        Value::Int(position),
        Value::Int(system as i32),
    ])
}

/// Builds an `Indices` row.
pub fn indices_tuple(index_name: &str, attr_name: &str, table_name: &str, system: bool) -> Tuple {
    Tuple::new(vec![
        Value::Varchar(index_name.to_string()),
        Value::Varchar(attr_name.to_string()),
        Value::Varchar(table_name.to_string()),
        Value::Int(system as i32),
    ])
}

/// Returns the file name of the index on `(table, attr)`.
pub fn index_file_name(table: &str, attr: &str) -> String {
    format!("{}_{}.idx", table, attr)
}

/// The `Columns` rows describing one table's schema, positions starting
/// at 1.
pub fn column_rows_for(table_id: i32, descriptor: &[Attribute], system: bool) -> Vec<Tuple> {
    descriptor
        .iter()
        .enumerate()
        .map(|(i, attr)| {
            columns_tuple(table_id, &attr.name, attr.ty, attr.length, i as i32 + 1, system)
        })
        .collect()
}
