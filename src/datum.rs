//! Attribute types and values.
//!
//! This module defines the type system shared by every layer: [`Type`] and
//! [`Attribute`] describe schema, [`Value`] is a single typed field, and
//! [`CompOp`] carries the comparison semantics used by scan predicates.

use std::cmp::Ordering;
use std::fmt;

/// Errors from value serialization/deserialization.
#[derive(Debug)]
pub enum SerializationError {
    /// Buffer too small for the operation.
    BufferTooSmall {
        /// Bytes required.
        required: usize,
        /// Bytes available.
        available: usize,
    },
    /// Invalid data format.
    InvalidFormat(String),
    /// A value does not match the attribute type it is used with.
    TypeMismatch {
        /// The declared attribute type.
        expected: Type,
        /// The type of the offending value, or `None` for NULL.
        found: Option<Type>,
    },
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationError::BufferTooSmall {
                required,
                available,
            } => {
                write!(
                    f,
                    "buffer too small: need {} bytes, have {}",
                    required, available
                )
            }
            SerializationError::InvalidFormat(msg) => write!(f, "invalid format: {}", msg),
            SerializationError::TypeMismatch { expected, found } => match found {
                Some(found) => write!(f, "type mismatch: expected {}, found {}", expected, found),
                None => write!(f, "type mismatch: expected {}, found NULL", expected),
            },
        }
    }
}

impl std::error::Error for SerializationError {}

/// Attribute data type.
///
/// The numeric codes are the ones persisted in the `Columns` catalog table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// 32-bit signed integer.
    Int,
    /// 32-bit IEEE float.
    Real,
    /// Variable-length string with a declared maximum length.
    Varchar,
}

impl Type {
    /// Returns the catalog code for this type.
    pub const fn code(self) -> i32 {
        match self {
            Type::Int => 0,
            Type::Real => 1,
            Type::Varchar => 2,
        }
    }

    /// Converts a catalog code into a [`Type`].
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Type::Int),
            1 => Some(Type::Real),
            2 => Some(Type::Varchar),
            _ => None,
        }
    }

    /// Returns the fixed field size, or `None` for variable-length types.
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            Type::Int | Type::Real => Some(4),
            Type::Varchar => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Int => "int",
            Type::Real => "real",
            Type::Varchar => "varchar",
        };
        write!(f, "{}", name)
    }
}

/// A schema attribute: name, type, and declared length.
///
/// For `Int` and `Real` the length is always 4. For `Varchar` it is the
/// declared maximum number of characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,
    /// Attribute type.
    pub ty: Type,
    /// Declared length.
    pub length: u32,
}

impl Attribute {
    /// Creates a new attribute.
    pub fn new(name: impl Into<String>, ty: Type, length: u32) -> Self {
        Self {
            name: name.into(),
            ty,
            length,
        }
    }

    /// Shorthand for a 4-byte integer attribute.
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, Type::Int, 4)
    }

    /// Shorthand for a 4-byte real attribute.
    pub fn real(name: impl Into<String>) -> Self {
        Self::new(name, Type::Real, 4)
    }

    /// Shorthand for a varchar attribute with the given maximum length.
    pub fn varchar(name: impl Into<String>, length: u32) -> Self {
        Self::new(name, Type::Varchar, length)
    }
}

/// A single typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL (absent) field.
    Null,
    /// 32-bit signed integer.
    Int(i32),
    /// 32-bit IEEE float.
    Real(f32),
    /// Variable-length string.
    Varchar(String),
}

impl Value {
    /// Returns the data type for this value, or `None` for NULL.
    pub fn data_type(&self) -> Option<Type> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(Type::Int),
            Value::Real(_) => Some(Type::Real),
            Value::Varchar(_) => Some(Type::Varchar),
        }
    }

    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if this value can be stored under the given type.
    pub fn conforms_to(&self, ty: Type) -> bool {
        match self.data_type() {
            None => true,
            Some(t) => t == ty,
        }
    }

    /// Returns the size of this value in the wire tuple form.
    ///
    /// NULL contributes 0 bytes (it is carried by the null bitmap);
    /// varchars include their 4-byte length prefix.
    pub fn wire_size(&self) -> usize {
        match self {
            Value::Null => 0,
            Value::Int(_) | Value::Real(_) => 4,
            Value::Varchar(s) => 4 + s.len(),
        }
    }

    /// Returns the size of the bare field data, without the varchar
    /// length prefix (the stored-record offset directory carries lengths).
    pub fn field_size(&self) -> usize {
        match self {
            Value::Null => 0,
            Value::Int(_) | Value::Real(_) => 4,
            Value::Varchar(s) => s.len(),
        }
    }

    /// Appends the bare field bytes to `out` (no varchar length prefix).
    pub fn write_field(&self, out: &mut Vec<u8>) {
        match self {
            Value::Null => {}
            Value::Int(n) => out.extend_from_slice(&n.to_le_bytes()),
            Value::Real(n) => out.extend_from_slice(&n.to_le_bytes()),
            Value::Varchar(s) => out.extend_from_slice(s.as_bytes()),
        }
    }

    /// Decodes bare field bytes of the given type.
    pub fn read_field(ty: Type, buf: &[u8]) -> Result<Self, SerializationError> {
        match ty {
            Type::Int => {
                let bytes: [u8; 4] = buf.try_into().map_err(|_| {
                    SerializationError::InvalidFormat(format!("int field of {} bytes", buf.len()))
                })?;
                Ok(Value::Int(i32::from_le_bytes(bytes)))
            }
            Type::Real => {
                let bytes: [u8; 4] = buf.try_into().map_err(|_| {
                    SerializationError::InvalidFormat(format!("real field of {} bytes", buf.len()))
                })?;
                Ok(Value::Real(f32::from_le_bytes(bytes)))
            }
            Type::Varchar => {
                let s = std::str::from_utf8(buf)
                    .map_err(|e| SerializationError::InvalidFormat(e.to_string()))?;
                Ok(Value::Varchar(s.to_string()))
            }
        }
    }

    /// Compares two non-null values of the same type.
    ///
    /// Returns `None` when the types differ or a float comparison is
    /// unordered (NaN).
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Real(a), Value::Real(b)) => a.partial_cmp(b),
            (Value::Varchar(a), Value::Varchar(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Real(n) => write!(f, "{}", n),
            Value::Varchar(s) => write!(f, "{}", s),
        }
    }
}

/// Scan comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    /// Equal.
    Eq,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Not equal.
    Ne,
    /// No condition: matches every record.
    NoOp,
}

impl CompOp {
    /// Evaluates `lhs op rhs` with the NULL semantics scans use:
    /// `NoOp` matches everything, NULL = NULL only for `Eq`, and a single
    /// NULL side matches only `Ne`. An unordered or cross-type comparison
    /// behaves like a single NULL side.
    pub fn matches(self, lhs: &Value, rhs: &Value) -> bool {
        if self == CompOp::NoOp {
            return true;
        }
        match (lhs.is_null(), rhs.is_null()) {
            (true, true) => self == CompOp::Eq,
            (true, false) | (false, true) => self == CompOp::Ne,
            (false, false) => match lhs.compare(rhs) {
                Some(ord) => self.matches_ordering(ord),
                None => self == CompOp::Ne,
            },
        }
    }

    /// Maps an ordering onto this operator.
    pub fn matches_ordering(self, ord: Ordering) -> bool {
        match self {
            CompOp::Eq => ord == Ordering::Equal,
            CompOp::Lt => ord == Ordering::Less,
            CompOp::Le => ord != Ordering::Greater,
            CompOp::Gt => ord == Ordering::Greater,
            CompOp::Ge => ord != Ordering::Less,
            CompOp::Ne => ord != Ordering::Equal,
            CompOp::NoOp => true,
        }
    }
}
