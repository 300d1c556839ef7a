//! Relation manager errors.

use crate::heap::{HeapError, Rid};
use crate::index::IndexError;

/// Errors from relation manager operations.
#[derive(Debug)]
pub enum CatalogError {
    /// A table with this name already exists.
    TableExists(String),
    /// No table with this name.
    TableNotFound(String),
    /// The index on `(table, attribute)` already exists.
    IndexExists {
        /// Table name.
        table: String,
        /// Attribute name.
        attr: String,
    },
    /// No index on `(table, attribute)`.
    IndexNotFound {
        /// Table name.
        table: String,
        /// Attribute name.
        attr: String,
    },
    /// The attribute is not part of the table's schema.
    UnknownAttribute {
        /// Table name.
        table: String,
        /// Attribute name.
        attr: String,
    },
    /// The operation would mutate a system table.
    SystemTable(String),
    /// The operation would mutate a system tuple.
    SystemTuple(Rid),
    /// Record store failure.
    Heap(HeapError),
    /// Index failure.
    Index(IndexError),
    /// Sidecar file I/O failure.
    Io(std::io::Error),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::TableExists(name) => write!(f, "table \"{}\" already exists", name),
            CatalogError::TableNotFound(name) => write!(f, "no table \"{}\"", name),
            CatalogError::IndexExists { table, attr } => {
                write!(f, "index on \"{}\".\"{}\" already exists", table, attr)
            }
            CatalogError::IndexNotFound { table, attr } => {
                write!(f, "no index on \"{}\".\"{}\"", table, attr)
            }
            CatalogError::UnknownAttribute { table, attr } => {
                write!(f, "table \"{}\" has no attribute \"{}\"", table, attr)
            }
            CatalogError::SystemTable(name) => {
                write!(f, "\"{}\" is a system table", name)
            }
            CatalogError::SystemTuple(rid) => {
                write!(f, "tuple at {} is a system tuple", rid)
            }
            CatalogError::Heap(e) => write!(f, "record store error: {}", e),
            CatalogError::Index(e) => write!(f, "index error: {}", e),
            CatalogError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Heap(e) => Some(e),
            CatalogError::Index(e) => Some(e),
            CatalogError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HeapError> for CatalogError {
    fn from(e: HeapError) -> Self {
        CatalogError::Heap(e)
    }
}

impl From<IndexError> for CatalogError {
    fn from(e: IndexError) -> Self {
        CatalogError::Index(e)
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(e: std::io::Error) -> Self {
        CatalogError::Io(e)
    }
}
