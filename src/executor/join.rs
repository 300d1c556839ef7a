//! Join operators.
//!
//! [`BnlJoin`] is a block nested-loop equi-join: it buffers a block of
//! left tuples, hashes them by join key, and probes the hash map with
//! every right tuple, rescanning the right side once per block.
//! [`InlJoin`] is an index nested-loop join: it re-seeks the right
//! side's index once per left tuple.
//!
//! The hash map is a sum type over the three key types; `Real` keys go
//! through [`OrderedFloat`] to become hashable.

use std::collections::HashMap;

use ordered_float::OrderedFloat;

use crate::datum::{Attribute, CompOp, Type, Value};
use crate::executor::error::ExecutorError;
use crate::executor::scan::{IndexScan, SeqScan};
use crate::executor::{attr_index, join_tuples, Condition, Executor, Operand};
use crate::storage::PAGE_SIZE;
use crate::tuple::Tuple;

/// A hash map from join key to left-block tuple indices, typed by the
/// join attribute.
enum KeyMap {
    Int(HashMap<i32, Vec<usize>>),
    Real(HashMap<OrderedFloat<f32>, Vec<usize>>),
    Varchar(HashMap<String, Vec<usize>>),
}

static NO_MATCHES: [usize; 0] = [];

impl KeyMap {
    fn new(ty: Type) -> Self {
        match ty {
            Type::Int => KeyMap::Int(HashMap::new()),
            Type::Real => KeyMap::Real(HashMap::new()),
            Type::Varchar => KeyMap::Varchar(HashMap::new()),
        }
    }

    fn clear(&mut self) {
        match self {
            KeyMap::Int(m) => m.clear(),
            KeyMap::Real(m) => m.clear(),
            KeyMap::Varchar(m) => m.clear(),
        }
    }

    /// Registers a left tuple under its key. NULL keys join nothing and
    /// are not registered.
    fn insert(&mut self, key: &Value, idx: usize) {
        match (self, key) {
            (KeyMap::Int(m), Value::Int(k)) => m.entry(*k).or_default().push(idx),
            (KeyMap::Real(m), Value::Real(k)) => {
                m.entry(OrderedFloat(*k)).or_default().push(idx)
            }
            (KeyMap::Varchar(m), Value::Varchar(k)) => {
                m.entry(k.clone()).or_default().push(idx)
            }
            _ => {}
        }
    }

    fn get(&self, key: &Value) -> &[usize] {
        match (self, key) {
            (KeyMap::Int(m), Value::Int(k)) => m.get(k).map(Vec::as_slice),
            (KeyMap::Real(m), Value::Real(k)) => m.get(&OrderedFloat(*k)).map(Vec::as_slice),
            (KeyMap::Varchar(m), Value::Varchar(k)) => m.get(k).map(Vec::as_slice),
            _ => None,
        }
        .unwrap_or(&NO_MATCHES)
    }
}

/// Block nested-loop equi-join.
pub struct BnlJoin<'a> {
    left: Box<dyn Executor + 'a>,
    right: SeqScan<'a>,
    attrs: Vec<Attribute>,
    lhs: usize,
    rhs: usize,
    /// Bytes of left tuples loaded per block.
    block_bytes: usize,
    block: Vec<Tuple>,
    map: KeyMap,
    left_exhausted: bool,
    current_right: Option<Tuple>,
    pending: Vec<usize>,
    pending_pos: usize,
}

impl<'a> BnlJoin<'a> {
    /// Builds a block nested-loop join; the condition must be an
    /// attribute-to-attribute equality. `block_pages` bounds the left
    /// block loaded per pass.
    pub fn new(
        left: Box<dyn Executor + 'a>,
        right: SeqScan<'a>,
        condition: &Condition,
        block_pages: usize,
    ) -> Result<Self, ExecutorError> {
        if condition.op != CompOp::Eq {
            return Err(ExecutorError::Unsupported(
                "block nested-loop join requires an equality condition".to_string(),
            ));
        }
        let rhs_name = match &condition.rhs {
            Operand::Attr(name) => name,
            Operand::Value(_) => {
                return Err(ExecutorError::Unsupported(
                    "join conditions compare two attributes".to_string(),
                ))
            }
        };

        let left_attrs = left.attributes();
        let right_attrs = right.attributes();
        let lhs = attr_index(&left_attrs, &condition.lhs_attr)?;
        let rhs = attr_index(&right_attrs, rhs_name)?;
        let key_type = left_attrs[lhs].ty;

        let mut attrs = left_attrs;
        attrs.extend(right_attrs);

        let mut join = Self {
            left,
            right,
            attrs,
            lhs,
            rhs,
            block_bytes: block_pages.max(1) * PAGE_SIZE,
            block: Vec::new(),
            map: KeyMap::new(key_type),
            left_exhausted: false,
            current_right: None,
            pending: Vec::new(),
            pending_pos: 0,
        };
        join.load_block()?;
        Ok(join)
    }

    /// Loads the next block of left tuples into the hash map. Returns
    /// false when the left side is exhausted.
    fn load_block(&mut self) -> Result<bool, ExecutorError> {
        self.block.clear();
        self.map.clear();
        if self.left_exhausted {
            return Ok(false);
        }

        let mut used = 0;
        while used < self.block_bytes {
            match self.left.next_tuple()? {
                Some(tuple) => {
                    used += tuple.wire_size();
                    self.map.insert(&tuple.values[self.lhs], self.block.len());
                    self.block.push(tuple);
                }
                None => {
                    self.left_exhausted = true;
                    break;
                }
            }
        }
        Ok(!self.block.is_empty())
    }
}

impl Executor for BnlJoin<'_> {
    fn next_tuple(&mut self) -> Result<Option<Tuple>, ExecutorError> {
        loop {
            if let Some(right) = &self.current_right {
                if self.pending_pos < self.pending.len() {
                    let left = &self.block[self.pending[self.pending_pos]];
                    self.pending_pos += 1;
                    return Ok(Some(join_tuples(left, right)));
                }
            }
            if self.block.is_empty() {
                return Ok(None);
            }

            match self.right.next_tuple()? {
                Some(right) => {
                    self.pending = self.map.get(&right.values[self.rhs]).to_vec();
                    self.pending_pos = 0;
                    self.current_right = Some(right);
                }
                None => {
                    // Right side drained for this block: next block, new
                    // right pass.
                    self.current_right = None;
                    if !self.load_block()? {
                        return Ok(None);
                    }
                    self.right.reset()?;
                }
            }
        }
    }

    fn attributes(&self) -> Vec<Attribute> {
        self.attrs.clone()
    }
}

/// Index nested-loop join.
pub struct InlJoin<'a> {
    left: Box<dyn Executor + 'a>,
    right: IndexScan<'a>,
    op: CompOp,
    attrs: Vec<Attribute>,
    lhs: usize,
    rhs: usize,
    current_left: Option<Tuple>,
}

impl<'a> InlJoin<'a> {
    /// Builds an index nested-loop join. The right side's index must be
    /// on the condition's right-hand attribute.
    pub fn new(
        left: Box<dyn Executor + 'a>,
        right: IndexScan<'a>,
        condition: &Condition,
    ) -> Result<Self, ExecutorError> {
        let rhs_name = match &condition.rhs {
            Operand::Attr(name) => name,
            Operand::Value(_) => {
                return Err(ExecutorError::Unsupported(
                    "join conditions compare two attributes".to_string(),
                ))
            }
        };

        let left_attrs = left.attributes();
        let right_attrs = right.attributes();
        let lhs = attr_index(&left_attrs, &condition.lhs_attr)?;
        let rhs = attr_index(&right_attrs, rhs_name)?;

        let mut attrs = left_attrs;
        attrs.extend(right_attrs);

        Ok(Self {
            left,
            right,
            op: condition.op,
            attrs,
            lhs,
            rhs,
            current_left: None,
        })
    }

    /// Re-seeks the right index to the range of right keys that can
    /// satisfy `left_key op right_key`.
    fn seek_right(&mut self, left_key: &Value) -> Result<(), ExecutorError> {
        let key = Some(left_key);
        match self.op {
            CompOp::Eq => self.right.seek(key, key, true, true),
            // left < right: right keys strictly above the left key.
            CompOp::Lt => self.right.seek(key, None, false, true),
            CompOp::Le => self.right.seek(key, None, true, true),
            // left > right: right keys strictly below the left key.
            CompOp::Gt => self.right.seek(None, key, true, false),
            CompOp::Ge => self.right.seek(None, key, true, true),
            // Not expressible as one range; post-filtered below.
            CompOp::Ne | CompOp::NoOp => self.right.seek(None, None, true, true),
        }
    }
}

impl Executor for InlJoin<'_> {
    fn next_tuple(&mut self) -> Result<Option<Tuple>, ExecutorError> {
        loop {
            if self.current_left.is_none() {
                let left = match self.left.next_tuple()? {
                    Some(t) => t,
                    None => return Ok(None),
                };
                let key = left.values[self.lhs].clone();
                if key.is_null() && self.op != CompOp::Ne && self.op != CompOp::NoOp {
                    // A NULL key cannot match any range.
                    continue;
                }
                if key.is_null() {
                    self.right.seek(None, None, true, true)?;
                } else {
                    self.seek_right(&key)?;
                }
                self.current_left = Some(left);
            }

            match self.right.next_tuple()? {
                Some(right) => {
                    let left = self.current_left.as_ref().unwrap();
                    if self.op.matches(&left.values[self.lhs], &right.values[self.rhs]) {
                        return Ok(Some(join_tuples(left, &right)));
                    }
                }
                None => self.current_left = None,
            }
        }
    }

    fn attributes(&self) -> Vec<Attribute> {
        self.attrs.clone()
    }
}
