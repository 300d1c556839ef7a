//! Aggregation operator.

use std::collections::HashMap;

use ordered_float::OrderedFloat;

use crate::datum::{Attribute, Type, Value};
use crate::executor::error::ExecutorError;
use crate::executor::{attr_index, Executor};
use crate::tuple::Tuple;

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    /// Minimum.
    Min,
    /// Maximum.
    Max,
    /// Row count.
    Count,
    /// Sum.
    Sum,
    /// Arithmetic mean.
    Avg,
}

impl AggregateOp {
    fn name(self) -> &'static str {
        match self {
            AggregateOp::Min => "MIN",
            AggregateOp::Max => "MAX",
            AggregateOp::Count => "COUNT",
            AggregateOp::Sum => "SUM",
            AggregateOp::Avg => "AVG",
        }
    }
}

/// Running aggregate state; every function accumulates in f32.
#[derive(Debug, Clone, Copy)]
struct AggState {
    sum: f32,
    count: f32,
    min: f32,
    max: f32,
}

impl AggState {
    fn new() -> Self {
        Self {
            sum: 0.0,
            count: 0.0,
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
        }
    }

    fn update(&mut self, value: f32) {
        self.sum += value;
        self.count += 1.0;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn value(&self, op: AggregateOp) -> f32 {
        match op {
            AggregateOp::Min => self.min,
            AggregateOp::Max => self.max,
            AggregateOp::Count => self.count,
            AggregateOp::Sum => self.sum,
            AggregateOp::Avg => self.sum / self.count,
        }
    }
}

/// Per-group aggregate state, typed by the grouping attribute.
enum GroupMap {
    Int(HashMap<i32, AggState>),
    Real(HashMap<OrderedFloat<f32>, AggState>),
    Varchar(HashMap<String, AggState>),
}

impl GroupMap {
    fn new(ty: Type) -> Self {
        match ty {
            Type::Int => GroupMap::Int(HashMap::new()),
            Type::Real => GroupMap::Real(HashMap::new()),
            Type::Varchar => GroupMap::Varchar(HashMap::new()),
        }
    }

    fn update(&mut self, key: &Value, value: f32) {
        match (self, key) {
            (GroupMap::Int(m), Value::Int(k)) => m.entry(*k).or_insert_with(AggState::new).update(value),
            (GroupMap::Real(m), Value::Real(k)) => {
                m.entry(OrderedFloat(*k)).or_insert_with(AggState::new).update(value)
            }
            (GroupMap::Varchar(m), Value::Varchar(k)) => {
                m.entry(k.clone()).or_insert_with(AggState::new).update(value)
            }
            _ => {}
        }
    }

    fn into_rows(self, op: AggregateOp) -> Vec<Tuple> {
        match self {
            GroupMap::Int(m) => m
                .into_iter()
                .map(|(k, s)| Tuple::new(vec![Value::Int(k), Value::Real(s.value(op))]))
                .collect(),
            GroupMap::Real(m) => m
                .into_iter()
                .map(|(k, s)| Tuple::new(vec![Value::Real(k.0), Value::Real(s.value(op))]))
                .collect(),
            GroupMap::Varchar(m) => m
                .into_iter()
                .map(|(k, s)| Tuple::new(vec![Value::Varchar(k), Value::Real(s.value(op))]))
                .collect(),
        }
    }
}

/// Computes one aggregate over its input, optionally grouped.
///
/// The input is drained on the first [`next_tuple`](Executor::next_tuple)
/// call. Ungrouped aggregation yields one row (none at all for empty
/// input); grouped aggregation yields `(group, aggregate)` rows in hash
/// order. NULL aggregate fields are not counted and NULL group keys form
/// no group.
pub struct Aggregate<'a> {
    child: Box<dyn Executor + 'a>,
    op: AggregateOp,
    agg: usize,
    agg_attr: Attribute,
    group: Option<(usize, Attribute)>,
    results: Option<std::vec::IntoIter<Tuple>>,
}

impl<'a> Aggregate<'a> {
    /// Builds an ungrouped aggregate over `agg_attr`.
    pub fn new(
        child: Box<dyn Executor + 'a>,
        agg_attr: &str,
        op: AggregateOp,
    ) -> Result<Self, ExecutorError> {
        let attrs = child.attributes();
        let agg = attr_index(&attrs, agg_attr)?;
        if attrs[agg].ty == Type::Varchar {
            return Err(ExecutorError::Unsupported(
                "aggregates require a numeric attribute".to_string(),
            ));
        }
        Ok(Self {
            child,
            op,
            agg,
            agg_attr: attrs[agg].clone(),
            group: None,
            results: None,
        })
    }

    /// Builds a hash-grouped aggregate over `agg_attr`, one output row
    /// per distinct value of `group_attr`.
    pub fn new_grouped(
        child: Box<dyn Executor + 'a>,
        agg_attr: &str,
        group_attr: &str,
        op: AggregateOp,
    ) -> Result<Self, ExecutorError> {
        let attrs = child.attributes();
        let group = attr_index(&attrs, group_attr)?;
        let mut agg = Self::new(child, agg_attr, op)?;
        agg.group = Some((group, attrs[group].clone()));
        Ok(agg)
    }

    fn drain(&mut self) -> Result<Vec<Tuple>, ExecutorError> {
        match self.group {
            None => {
                let mut state = AggState::new();
                while let Some(tuple) = self.child.next_tuple()? {
                    if let Some(v) = numeric(&tuple.values[self.agg]) {
                        state.update(v);
                    }
                }
                if state.count == 0.0 {
                    return Ok(Vec::new());
                }
                Ok(vec![Tuple::new(vec![Value::Real(state.value(self.op))])])
            }
            Some((group_idx, ref group_attr)) => {
                let mut map = GroupMap::new(group_attr.ty);
                while let Some(tuple) = self.child.next_tuple()? {
                    let key = &tuple.values[group_idx];
                    if key.is_null() {
                        continue;
                    }
                    if let Some(v) = numeric(&tuple.values[self.agg]) {
                        map.update(key, v);
                    }
                }
                Ok(map.into_rows(self.op))
            }
        }
    }
}

impl Executor for Aggregate<'_> {
    fn next_tuple(&mut self) -> Result<Option<Tuple>, ExecutorError> {
        if self.results.is_none() {
            let rows = self.drain()?;
            self.results = Some(rows.into_iter());
        }
        Ok(self.results.as_mut().unwrap().next())
    }

    fn attributes(&self) -> Vec<Attribute> {
        let agg = Attribute::real(format!("{}({})", self.op.name(), self.agg_attr.name));
        match &self.group {
            None => vec![agg],
            Some((_, group_attr)) => vec![group_attr.clone(), agg],
        }
    }
}

fn numeric(value: &Value) -> Option<f32> {
    match value {
        Value::Int(n) => Some(*n as f32),
        Value::Real(n) => Some(*n),
        Value::Null | Value::Varchar(_) => None,
    }
}
