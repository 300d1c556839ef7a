//! Catalog-driven relation manager.
//!
//! Tables, their columns, and their secondary indexes are described by
//! three catalog tables that are themselves ordinary record files:
//! `Tables`, `Columns`, and `Indices`. A small sidecar file persists the
//! next table id. The [`RelationManager`] mediates every user-visible
//! operation, keeping each table's indexes in step with its records.

pub mod core;
pub mod error;
pub mod schema;

pub use self::core::{RelationManager, TableIndexScan, TableScan};
pub use error::CatalogError;
