//! Typed metadata attached to channel descriptors and to individual events
//!
//! A [`MetadataField`] declares the shape of one slot: an element type and a
//! fixed length, plus naming for file formats and downstream consumers. A
//! [`MetadataValue`] holds the bytes of one slot and remembers its own shape,
//! so values can be checked against the fields of the channel they ride on.
//! Values serialize as their raw bytes, concatenated in slot order; no
//! framing is needed because the descriptor fixes the shape of every slot.

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Element type of a metadata slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataType {
    Char,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float,
    Double,
}

impl MetadataType {
    /// Size in bytes of a single element of this type
    pub fn element_size(self) -> usize {
        match self {
            MetadataType::Char | MetadataType::Int8 | MetadataType::Uint8 => 1,
            MetadataType::Int16 | MetadataType::Uint16 => 2,
            MetadataType::Int32 | MetadataType::Uint32 | MetadataType::Float => 4,
            MetadataType::Int64 | MetadataType::Uint64 | MetadataType::Double => 8,
        }
    }
}

/// Declaration of one metadata slot: element type, fixed length and naming
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetadataField {
    ty: MetadataType,
    length: usize,
    /// Human-readable name
    pub name: String,
    /// Machine-readable identifier, dotted (e.g. `source.channel.gain`)
    pub identifier: String,
    /// Description for file formats and UIs
    pub description: String,
}

impl MetadataField {
    pub fn new(
        ty: MetadataType,
        length: usize,
        name: impl Into<String>,
        identifier: impl Into<String>,
        description: impl Into<String>,
    ) -> MetadataField {
        MetadataField {
            ty,
            length,
            name: name.into(),
            identifier: identifier.into(),
            description: description.into(),
        }
    }

    pub fn ty(&self) -> MetadataType {
        self.ty
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Size in bytes of a value of this field
    pub fn size(&self) -> usize {
        self.ty.element_size() * self.length
    }
}

/// Total serialized size of a list of fields
pub fn fields_size(fields: &[MetadataField]) -> usize {
    fields.iter().map(|f| f.size()).sum()
}

/// One filled metadata slot
///
/// Holds the raw bytes of the slot in native byte order along with the shape
/// they were built with. Constructors exist per element type; the raw-byte
/// form is what goes on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetadataValue {
    ty: MetadataType,
    length: usize,
    data: Vec<u8>,
}

macro_rules! value_scalar_impl {
    ($from:ident, $as:ident, $to_vec:ident, $from_slice:ident, $t:ty, $ty:expr) => {
        pub fn $from(v: $t) -> MetadataValue {
            MetadataValue {
                ty: $ty,
                length: 1,
                data: v.to_ne_bytes().to_vec(),
            }
        }

        pub fn $from_slice(v: &[$t]) -> MetadataValue {
            let mut data = Vec::with_capacity(v.len() * std::mem::size_of::<$t>());
            for x in v {
                data.extend_from_slice(&x.to_ne_bytes());
            }
            MetadataValue {
                ty: $ty,
                length: v.len(),
                data,
            }
        }

        pub fn $as(&self) -> Option<$t> {
            if self.ty != $ty || self.length != 1 {
                return None;
            }
            Some(<$t>::from_ne_bytes(self.data.as_slice().try_into().ok()?))
        }

        pub fn $to_vec(&self) -> Option<Vec<$t>> {
            if self.ty != $ty {
                return None;
            }
            let size = std::mem::size_of::<$t>();
            Some(
                self.data
                    .chunks_exact(size)
                    .map(|c| <$t>::from_ne_bytes(c.try_into().unwrap()))
                    .collect(),
            )
        }
    };
}

impl MetadataValue {
    /// A zero-filled value of the given shape
    pub fn new(ty: MetadataType, length: usize) -> MetadataValue {
        MetadataValue {
            ty,
            length,
            data: vec![0; ty.element_size() * length],
        }
    }

    /// A char-typed value holding the UTF-8 bytes of `s`
    pub fn from_str(s: &str) -> MetadataValue {
        MetadataValue {
            ty: MetadataType::Char,
            length: s.len(),
            data: s.as_bytes().to_vec(),
        }
    }

    value_scalar_impl!(from_i8, as_i8, to_i8_vec, from_i8_slice, i8, MetadataType::Int8);
    value_scalar_impl!(from_u8, as_u8, to_u8_vec, from_u8_slice, u8, MetadataType::Uint8);
    value_scalar_impl!(from_i16, as_i16, to_i16_vec, from_i16_slice, i16, MetadataType::Int16);
    value_scalar_impl!(from_u16, as_u16, to_u16_vec, from_u16_slice, u16, MetadataType::Uint16);
    value_scalar_impl!(from_i32, as_i32, to_i32_vec, from_i32_slice, i32, MetadataType::Int32);
    value_scalar_impl!(from_u32, as_u32, to_u32_vec, from_u32_slice, u32, MetadataType::Uint32);
    value_scalar_impl!(from_i64, as_i64, to_i64_vec, from_i64_slice, i64, MetadataType::Int64);
    value_scalar_impl!(from_u64, as_u64, to_u64_vec, from_u64_slice, u64, MetadataType::Uint64);
    value_scalar_impl!(from_f32, as_f32, to_f32_vec, from_f32_slice, f32, MetadataType::Float);
    value_scalar_impl!(from_f64, as_f64, to_f64_vec, from_f64_slice, f64, MetadataType::Double);

    /// The UTF-8 string held by a char-typed value, if valid
    pub fn as_str(&self) -> Option<&str> {
        if self.ty != MetadataType::Char {
            return None;
        }
        std::str::from_utf8(&self.data).ok()
    }

    pub fn ty(&self) -> MetadataType {
        self.ty
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Size in bytes of the slot
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// The raw bytes, as they appear on the wire
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// True when this value has the shape a field declares
    pub fn is_of_type(&self, field: &MetadataField) -> bool {
        self.ty == field.ty && self.length == field.length
    }

    pub(crate) fn from_bytes(ty: MetadataType, length: usize, bytes: &[u8]) -> MetadataValue {
        MetadataValue {
            ty,
            length,
            data: bytes.to_vec(),
        }
    }
}

/// True iff `values` fills `fields` slot for slot: same count, and every
/// value has the type and length its field declares
pub fn compare_metadata(fields: &[MetadataField], values: &[MetadataValue]) -> bool {
    if fields.len() != values.len() {
        return false;
    }
    fields
        .iter()
        .zip(values.iter())
        .all(|(f, v)| v.is_of_type(f))
}

/// Split a serialized metadata block back into values, per the field list.
/// The block must hold exactly the declared bytes.
pub(crate) fn values_from_block(
    fields: &[MetadataField],
    block: &[u8],
) -> Result<Vec<MetadataValue>, Error> {
    if block.len() != fields_size(fields) {
        return Err(Error::MalformedMessage);
    }
    let mut values = Vec::with_capacity(fields.len());
    let mut offset = 0;
    for field in fields {
        let size = field.size();
        values.push(MetadataValue::from_bytes(
            field.ty,
            field.length,
            &block[offset..offset + size],
        ));
        offset += size;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(MetadataType::Char.element_size(), 1);
        assert_eq!(MetadataType::Uint16.element_size(), 2);
        assert_eq!(MetadataType::Float.element_size(), 4);
        assert_eq!(MetadataType::Double.element_size(), 8);
        let f = MetadataField::new(MetadataType::Int32, 3, "f", "test.f", "");
        assert_eq!(f.size(), 12);
    }

    #[test]
    fn typed_roundtrip() {
        let v = MetadataValue::from_i16(-513);
        assert_eq!(v.as_i16(), Some(-513));
        assert_eq!(v.as_u16(), None);
        assert_eq!(v.size(), 2);

        let v = MetadataValue::from_f32_slice(&[1.0, -2.5]);
        assert_eq!(v.length(), 2);
        assert_eq!(v.to_f32_vec(), Some(vec![1.0, -2.5]));
        assert_eq!(v.as_f32(), None);

        let v = MetadataValue::from_str("probe A");
        assert_eq!(v.as_str(), Some("probe A"));
        assert_eq!(v.size(), 7);
    }

    #[test]
    fn compare() {
        let fields = vec![
            MetadataField::new(MetadataType::Int16, 1, "a", "t.a", ""),
            MetadataField::new(MetadataType::Float, 2, "b", "t.b", ""),
        ];
        let good = vec![
            MetadataValue::from_i16(1),
            MetadataValue::from_f32_slice(&[0.0, 1.0]),
        ];
        assert!(compare_metadata(&fields, &good));

        // wrong type in one slot
        let bad = vec![
            MetadataValue::from_u16(1),
            MetadataValue::from_f32_slice(&[0.0, 1.0]),
        ];
        assert!(!compare_metadata(&fields, &bad));

        // wrong length in one slot
        let bad = vec![
            MetadataValue::from_i16(1),
            MetadataValue::from_f32_slice(&[0.0]),
        ];
        assert!(!compare_metadata(&fields, &bad));

        // count mismatch, both directions
        assert!(!compare_metadata(&fields, &good[..1]));
        assert!(!compare_metadata(&fields[..1], &good));
        assert!(compare_metadata(&[], &[]));
    }

    #[test]
    fn block_roundtrip() {
        let fields = vec![
            MetadataField::new(MetadataType::Uint8, 1, "a", "t.a", ""),
            MetadataField::new(MetadataType::Int32, 2, "b", "t.b", ""),
        ];
        let values = vec![
            MetadataValue::from_u8(7),
            MetadataValue::from_i32_slice(&[-1, 2]),
        ];
        let mut block = Vec::new();
        for v in &values {
            block.extend_from_slice(v.bytes());
        }
        assert_eq!(block.len(), fields_size(&fields));
        let back = values_from_block(&fields, &block).unwrap();
        assert_eq!(back, values);

        assert!(values_from_block(&fields, &block[1..]).is_err());
    }
}
