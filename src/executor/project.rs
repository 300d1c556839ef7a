//! Column projection operator.

use crate::datum::Attribute;
use crate::executor::error::ExecutorError;
use crate::executor::{attr_index, Executor};
use crate::tuple::Tuple;

/// Projects its input onto a subset of attributes, in the requested
/// order.
pub struct Project<'a> {
    child: Box<dyn Executor + 'a>,
    keep: Vec<usize>,
    attrs: Vec<Attribute>,
}

impl<'a> Project<'a> {
    /// Builds a projection over `child` keeping `attr_names`.
    pub fn new(
        child: Box<dyn Executor + 'a>,
        attr_names: &[String],
    ) -> Result<Self, ExecutorError> {
        let input_attrs = child.attributes();
        let keep = attr_names
            .iter()
            .map(|name| attr_index(&input_attrs, name))
            .collect::<Result<Vec<_>, _>>()?;
        let attrs = keep.iter().map(|&i| input_attrs[i].clone()).collect();
        Ok(Self { child, keep, attrs })
    }
}

impl Executor for Project<'_> {
    fn next_tuple(&mut self) -> Result<Option<Tuple>, ExecutorError> {
        match self.child.next_tuple()? {
            Some(tuple) => {
                let values = self.keep.iter().map(|&i| tuple.values[i].clone()).collect();
                Ok(Some(Tuple::new(values)))
            }
            None => Ok(None),
        }
    }

    fn attributes(&self) -> Vec<Attribute> {
        self.attrs.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::Value;
    use crate::executor::filter::tests::Rows;

    fn input() -> Rows {
        Rows::new(
            vec![
                Attribute::int("t.a"),
                Attribute::varchar("t.b", 10),
                Attribute::real("t.c"),
            ],
            vec![
                Tuple::new(vec![
                    Value::Int(1),
                    Value::Varchar("x".into()),
                    Value::Real(1.5),
                ]),
                Tuple::new(vec![Value::Int(2), Value::Null, Value::Real(2.5)]),
            ],
        )
    }

    #[test]
    fn test_project_reorders_columns() {
        let mut project =
            Project::new(Box::new(input()), &["t.c".to_string(), "t.a".to_string()]).unwrap();

        assert_eq!(
            project.attributes().iter().map(|a| a.name.clone()).collect::<Vec<_>>(),
            vec!["t.c", "t.a"]
        );

        let first = project.next_tuple().unwrap().unwrap();
        assert_eq!(first.values, vec![Value::Real(1.5), Value::Int(1)]);
        let second = project.next_tuple().unwrap().unwrap();
        assert_eq!(second.values, vec![Value::Real(2.5), Value::Int(2)]);
        assert!(project.next_tuple().unwrap().is_none());
    }

    #[test]
    fn test_project_unknown_attribute() {
        assert!(matches!(
            Project::new(Box::new(input()), &["t.z".to_string()]),
            Err(ExecutorError::UnknownAttribute(_))
        ));
    }
}
