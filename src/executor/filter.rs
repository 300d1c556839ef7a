//! Tuple filter operator.

use crate::datum::Attribute;
use crate::executor::error::ExecutorError;
use crate::executor::{attr_index, Condition, Executor, Operand};
use crate::tuple::Tuple;

/// Filters its input by a single comparison condition.
///
/// NULL handling follows the scan semantics: a NULL side satisfies only
/// `Ne` (or `Eq` against a NULL constant).
pub struct Filter<'a> {
    child: Box<dyn Executor + 'a>,
    condition: Condition,
    attrs: Vec<Attribute>,
    lhs: usize,
    /// Resolved index when the right-hand side is an attribute.
    rhs_attr: Option<usize>,
}

impl<'a> Filter<'a> {
    /// Builds a filter over `child`.
    pub fn new(child: Box<dyn Executor + 'a>, condition: Condition) -> Result<Self, ExecutorError> {
        let attrs = child.attributes();
        let lhs = attr_index(&attrs, &condition.lhs_attr)?;
        let rhs_attr = match &condition.rhs {
            Operand::Attr(name) => Some(attr_index(&attrs, name)?),
            Operand::Value(_) => None,
        };
        Ok(Self {
            child,
            condition,
            attrs,
            lhs,
            rhs_attr,
        })
    }
}

impl Executor for Filter<'_> {
    fn next_tuple(&mut self) -> Result<Option<Tuple>, ExecutorError> {
        while let Some(tuple) = self.child.next_tuple()? {
            let lhs = &tuple.values[self.lhs];
            let matched = match (&self.condition.rhs, self.rhs_attr) {
                (_, Some(rhs)) => self.condition.op.matches(lhs, &tuple.values[rhs]),
                (Operand::Value(value), None) => self.condition.op.matches(lhs, value),
                (Operand::Attr(_), None) => unreachable!("resolved in new()"),
            };
            if matched {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    fn attributes(&self) -> Vec<Attribute> {
        self.attrs.clone()
    }
}
