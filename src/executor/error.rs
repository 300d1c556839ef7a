//! Executor errors.

use crate::catalog::CatalogError;

/// Errors from query iterators.
#[derive(Debug)]
pub enum ExecutorError {
    /// A condition or projection names an attribute the input lacks.
    UnknownAttribute(String),
    /// The operator cannot run with the given arguments.
    Unsupported(String),
    /// The underlying storage layers failed.
    Catalog(CatalogError),
}

impl std::fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutorError::UnknownAttribute(name) => {
                write!(f, "unknown attribute \"{}\"", name)
            }
            ExecutorError::Unsupported(msg) => write!(f, "unsupported: {}", msg),
            ExecutorError::Catalog(e) => write!(f, "storage error: {}", e),
        }
    }
}

impl std::error::Error for ExecutorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecutorError::Catalog(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CatalogError> for ExecutorError {
    fn from(e: CatalogError) -> Self {
        ExecutorError::Catalog(e)
    }
}
