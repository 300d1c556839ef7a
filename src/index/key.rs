//! Composite key codec and ordering.
//!
//! A node entry stores the typed key bytes followed by an 8-byte RID.
//! Key bytes are the wire encoding of the value: 4 little-endian bytes
//! for `Int`/`Real`, a u32 length prefix plus the characters for
//! `Varchar`. The composite order compares the typed key first and the
//! RID second (page number, then slot number).
//!
//! `Real` keys order by `f32::total_cmp`, which matches IEEE `<` for
//! every non-NaN key and gives NaN a stable position instead of
//! unordered behavior.

use std::cmp::Ordering;

use crate::datum::{Attribute, Type, Value};
use crate::heap::Rid;
use crate::index::error::IndexError;

/// Returns the length of the encoded key at the start of `buf`.
pub fn encoded_len(attr: &Attribute, buf: &[u8]) -> usize {
    match attr.ty {
        Type::Int | Type::Real => 4,
        Type::Varchar => 4 + u32::from_le_bytes(buf[0..4].try_into().unwrap()) as usize,
    }
}

/// Encodes a key value for storage in a node.
///
/// # Errors
///
/// Returns `InvalidKey` for NULL or a value of the wrong type.
pub fn encode(attr: &Attribute, value: &Value) -> Result<Vec<u8>, IndexError> {
    match (attr.ty, value) {
        (Type::Int, Value::Int(n)) => Ok(n.to_le_bytes().to_vec()),
        (Type::Real, Value::Real(n)) => Ok(n.to_le_bytes().to_vec()),
        (Type::Varchar, Value::Varchar(s)) => {
            let mut out = Vec::with_capacity(4 + s.len());
            out.extend_from_slice(&(s.len() as u32).to_le_bytes());
            out.extend_from_slice(s.as_bytes());
            Ok(out)
        }
        _ => Err(IndexError::InvalidKey {
            expected: attr.ty,
            found: value.data_type(),
        }),
    }
}

/// Decodes the key at the start of `buf`.
pub fn decode(attr: &Attribute, buf: &[u8]) -> Value {
    match attr.ty {
        Type::Int => Value::Int(i32::from_le_bytes(buf[0..4].try_into().unwrap())),
        Type::Real => Value::Real(f32::from_le_bytes(buf[0..4].try_into().unwrap())),
        Type::Varchar => {
            let len = u32::from_le_bytes(buf[0..4].try_into().unwrap()) as usize;
            Value::Varchar(String::from_utf8_lossy(&buf[4..4 + len]).into_owned())
        }
    }
}

/// Compares two encoded keys of the index attribute's type.
pub fn compare(attr: &Attribute, a: &[u8], b: &[u8]) -> Ordering {
    match attr.ty {
        Type::Int => {
            let a = i32::from_le_bytes(a[0..4].try_into().unwrap());
            let b = i32::from_le_bytes(b[0..4].try_into().unwrap());
            a.cmp(&b)
        }
        Type::Real => {
            let a = f32::from_le_bytes(a[0..4].try_into().unwrap());
            let b = f32::from_le_bytes(b[0..4].try_into().unwrap());
            a.total_cmp(&b)
        }
        Type::Varchar => {
            let alen = u32::from_le_bytes(a[0..4].try_into().unwrap()) as usize;
            let blen = u32::from_le_bytes(b[0..4].try_into().unwrap()) as usize;
            a[4..4 + alen].cmp(&b[4..4 + blen])
        }
    }
}

/// Compares two composite `(key, rid)` entries.
pub fn compare_composite(attr: &Attribute, a: &[u8], a_rid: Rid, b: &[u8], b_rid: Rid) -> Ordering {
    compare(attr, a, b).then_with(|| a_rid.cmp(&b_rid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_roundtrip_and_order() {
        let attr = Attribute::int("k");
        let a = encode(&attr, &Value::Int(-5)).unwrap();
        let b = encode(&attr, &Value::Int(3)).unwrap();
        assert_eq!(decode(&attr, &a), Value::Int(-5));
        assert_eq!(encoded_len(&attr, &a), 4);
        assert_eq!(compare(&attr, &a, &b), Ordering::Less);
        assert_eq!(compare(&attr, &b, &a), Ordering::Greater);
        assert_eq!(compare(&attr, &a, &a), Ordering::Equal);
    }

    #[test]
    fn test_real_order() {
        let attr = Attribute::real("k");
        let a = encode(&attr, &Value::Real(-1.5)).unwrap();
        let b = encode(&attr, &Value::Real(2.25)).unwrap();
        assert_eq!(compare(&attr, &a, &b), Ordering::Less);
        assert_eq!(decode(&attr, &b), Value::Real(2.25));
    }

    #[test]
    fn test_varchar_roundtrip_and_order() {
        let attr = Attribute::varchar("k", 20);
        let a = encode(&attr, &Value::Varchar("apple".into())).unwrap();
        let b = encode(&attr, &Value::Varchar("banana".into())).unwrap();
        assert_eq!(encoded_len(&attr, &a), 9);
        assert_eq!(decode(&attr, &a), Value::Varchar("apple".into()));
        assert_eq!(compare(&attr, &a, &b), Ordering::Less);

        // Prefix ordering: "app" < "apple"
        let c = encode(&attr, &Value::Varchar("app".into())).unwrap();
        assert_eq!(compare(&attr, &c, &a), Ordering::Less);
    }

    #[test]
    fn test_null_and_mismatched_keys_rejected() {
        let attr = Attribute::int("k");
        assert!(matches!(
            encode(&attr, &Value::Null),
            Err(IndexError::InvalidKey { found: None, .. })
        ));
        assert!(matches!(
            encode(&attr, &Value::Varchar("x".into())),
            Err(IndexError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_composite_breaks_ties_by_rid() {
        let attr = Attribute::int("k");
        let k = encode(&attr, &Value::Int(7)).unwrap();
        assert_eq!(
            compare_composite(&attr, &k, Rid::new(1, 2), &k, Rid::new(1, 3)),
            Ordering::Less
        );
        assert_eq!(
            compare_composite(&attr, &k, Rid::new(2, 0), &k, Rid::new(1, 9)),
            Ordering::Greater
        );
        assert_eq!(
            compare_composite(&attr, &k, Rid::new(1, 1), &k, Rid::new(1, 1)),
            Ordering::Equal
        );
    }
}
