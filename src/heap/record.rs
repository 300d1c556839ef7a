//! Page-resident record encoding.
//!
//! A stored record differs from the wire tuple form by carrying a field
//! offset directory so any single field is readable in O(1):
//!
//! ```text
//! +---------------------------+
//! | Null Bitmap (ceil(n/8) B) |  same layout as the wire form
//! +---------------------------+
//! | End Offsets (n x u16)     |  cumulative end of each field, relative
//! +---------------------------+  to the field-data region; NULL fields
//! | Field Data                |  repeat the previous end
//! +---------------------------+
//! ```
//!
//! Varchar fields store no length prefix: end minus begin is the length.

use crate::datum::{Attribute, SerializationError, Value};
use crate::tuple::{is_null_bit_set, null_bitmap_len, set_null_bit, Tuple};

/// Size of each entry in the field offset directory.
pub const FIELD_OFFSET_SIZE: usize = 2;

/// Returns the encoded size of a stored record.
pub fn stored_size(descriptor: &[Attribute], tuple: &Tuple) -> usize {
    null_bitmap_len(descriptor.len())
        + descriptor.len() * FIELD_OFFSET_SIZE
        + tuple.values.iter().map(Value::field_size).sum::<usize>()
}

/// Encodes a tuple into the stored record form.
///
/// # Errors
///
/// Returns `TypeMismatch` for values that do not conform to the
/// descriptor and `InvalidFormat` for varchars over their declared length
/// or a field-count mismatch.
pub fn encode(descriptor: &[Attribute], tuple: &Tuple) -> Result<Vec<u8>, SerializationError> {
    if tuple.values.len() != descriptor.len() {
        return Err(SerializationError::InvalidFormat(format!(
            "tuple has {} fields, descriptor has {}",
            tuple.values.len(),
            descriptor.len()
        )));
    }

    let n = descriptor.len();
    let bitmap_len = null_bitmap_len(n);
    let mut out = vec![0u8; bitmap_len + n * FIELD_OFFSET_SIZE];

    let mut end: u16 = 0;
    for (i, (value, attr)) in tuple.values.iter().zip(descriptor).enumerate() {
        if !value.conforms_to(attr.ty) {
            return Err(SerializationError::TypeMismatch {
                expected: attr.ty,
                found: value.data_type(),
            });
        }
        if let Value::Varchar(s) = value {
            if s.len() > attr.length as usize {
                return Err(SerializationError::InvalidFormat(format!(
                    "varchar of {} bytes exceeds declared length {}",
                    s.len(),
                    attr.length
                )));
            }
        }

        if value.is_null() {
            set_null_bit(&mut out[..bitmap_len], i);
        } else {
            end += value.field_size() as u16;
        }
        let pos = bitmap_len + i * FIELD_OFFSET_SIZE;
        out[pos..pos + 2].copy_from_slice(&end.to_le_bytes());
    }

    for value in &tuple.values {
        value.write_field(&mut out);
    }
    Ok(out)
}

/// Decodes a stored record back into a tuple.
pub fn decode(descriptor: &[Attribute], buf: &[u8]) -> Result<Tuple, SerializationError> {
    let mut values = Vec::with_capacity(descriptor.len());
    for i in 0..descriptor.len() {
        values.push(read_field(descriptor, buf, i)?);
    }
    Ok(Tuple::new(values))
}

/// Reads field `field_num` of a stored record via the offset directory.
pub fn read_field(
    descriptor: &[Attribute],
    buf: &[u8],
    field_num: usize,
) -> Result<Value, SerializationError> {
    let n = descriptor.len();
    debug_assert!(field_num < n);
    let bitmap_len = null_bitmap_len(n);
    let data_start = bitmap_len + n * FIELD_OFFSET_SIZE;
    if buf.len() < data_start {
        return Err(SerializationError::BufferTooSmall {
            required: data_start,
            available: buf.len(),
        });
    }

    if is_null_bit_set(&buf[..bitmap_len], field_num) {
        return Ok(Value::Null);
    }

    let end = field_end(buf, bitmap_len, field_num);
    let begin = if field_num == 0 {
        0
    } else {
        field_end(buf, bitmap_len, field_num - 1)
    };
    let (begin, end) = (data_start + begin, data_start + end);
    if end < begin || buf.len() < end {
        return Err(SerializationError::InvalidFormat(format!(
            "field {} spans {}..{} outside record of {} bytes",
            field_num,
            begin,
            end,
            buf.len()
        )));
    }
    Value::read_field(descriptor[field_num].ty, &buf[begin..end])
}

fn field_end(buf: &[u8], bitmap_len: usize, field_num: usize) -> usize {
    let pos = bitmap_len + field_num * FIELD_OFFSET_SIZE;
    u16::from_le_bytes([buf[pos], buf[pos + 1]]) as usize
}
