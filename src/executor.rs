//! Query execution iterators.
//!
//! Operators follow the Volcano model: each pulls tuples from its child
//! via [`Executor::next_tuple`] and exposes its output schema through
//! [`Executor::attributes`]. Access methods ([`SeqScan`], [`IndexScan`])
//! sit at the leaves and qualify attribute names as `table.attr`; the
//! relational operators ([`Filter`], [`Project`], [`BnlJoin`],
//! [`InlJoin`], [`Aggregate`]) compose on top.

pub mod aggregate;
pub mod error;
pub mod filter;
pub mod join;
pub mod project;
pub mod scan;

pub use aggregate::{Aggregate, AggregateOp};
pub use error::ExecutorError;
pub use filter::Filter;
pub use join::{BnlJoin, InlJoin};
pub use project::Project;
pub use scan::{IndexScan, SeqScan};

use crate::datum::{Attribute, CompOp, Value};
use crate::tuple::Tuple;

/// A pull-based query iterator.
pub trait Executor {
    /// Returns the next output tuple, or `None` when exhausted.
    fn next_tuple(&mut self) -> Result<Option<Tuple>, ExecutorError>;

    /// Returns the output schema, names qualified as `table.attr`.
    fn attributes(&self) -> Vec<Attribute>;
}

/// The right-hand side of a join or filter condition.
#[derive(Debug, Clone)]
pub enum Operand {
    /// Another attribute, by qualified name.
    Attr(String),
    /// A constant.
    Value(Value),
}

/// A comparison condition over iterator outputs.
#[derive(Debug, Clone)]
pub struct Condition {
    /// Left-hand attribute, by qualified name.
    pub lhs_attr: String,
    /// Comparison operator.
    pub op: CompOp,
    /// Right-hand side: an attribute for joins, usually a constant for
    /// filters.
    pub rhs: Operand,
}

impl Condition {
    /// Builds an attribute-to-constant condition.
    pub fn with_value(lhs_attr: impl Into<String>, op: CompOp, value: Value) -> Self {
        Self {
            lhs_attr: lhs_attr.into(),
            op,
            rhs: Operand::Value(value),
        }
    }

    /// Builds an attribute-to-attribute condition.
    pub fn with_attr(lhs_attr: impl Into<String>, op: CompOp, rhs_attr: impl Into<String>) -> Self {
        Self {
            lhs_attr: lhs_attr.into(),
            op,
            rhs: Operand::Attr(rhs_attr.into()),
        }
    }
}

/// Finds an attribute's index in a qualified schema.
pub(crate) fn attr_index(attrs: &[Attribute], name: &str) -> Result<usize, ExecutorError> {
    attrs
        .iter()
        .position(|a| a.name == name)
        .ok_or_else(|| ExecutorError::UnknownAttribute(name.to_string()))
}

/// Concatenates a left and right tuple into one output row.
pub(crate) fn join_tuples(left: &Tuple, right: &Tuple) -> Tuple {
    let mut values = Vec::with_capacity(left.len() + right.len());
    values.extend(left.values.iter().cloned());
    values.extend(right.values.iter().cloned());
    Tuple::new(values)
}
