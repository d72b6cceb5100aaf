use bytes::Bytes;

use super::{Feature, FeatureType};
use crate::domain::errors::DomainError;

/// Value stored under one field of a logical record.
///
/// Archive entries always arrive as `Bytes`; the other variants exist so stages
/// can place already-decoded values on a record before conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bytes(Bytes),
    BytesList(Vec<Bytes>),
    Int64(i64),
    Int64List(Vec<i64>),
    Float32(f32),
    Float32List(Vec<f32>),
}

impl FieldValue {
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Convert into a wire feature.
    ///
    /// With no target type every value maps to its natural list kind (raw bytes
    /// become a one-element bytes list). With a target type, raw bytes are decoded
    /// according to that type and typed values must already match it.
    pub fn into_feature(
        self,
        field: &str,
        target: Option<FeatureType>,
    ) -> Result<Feature, DomainError> {
        let target = match target {
            Some(target) => target,
            None => return Ok(self.into_natural_feature()),
        };

        let invalid = |reason: String| DomainError::InvalidFieldEncoding {
            field: field.to_string(),
            expected: target,
            reason,
        };

        match (target, self) {
            (FeatureType::Int64, FieldValue::Int64(i)) => Ok(Feature::int64(i)),
            (FeatureType::Int64, FieldValue::Bytes(b)) => {
                decode_zigzag_varint(&b).map(Feature::int64).map_err(invalid)
            }

            (FeatureType::Int64List, FieldValue::Int64List(v)) => Ok(Feature::Int64List(v)),
            (FeatureType::Int64List, FieldValue::Int64(i)) => Ok(Feature::int64(i)),
            (FeatureType::Int64List, FieldValue::Bytes(b)) => {
                decode_packed::<8, i64>(&b, i64::from_le_bytes)
                    .map(Feature::Int64List)
                    .map_err(invalid)
            }

            (FeatureType::Float32, FieldValue::Float32(f)) => Ok(Feature::float(f)),
            (FeatureType::Float32, FieldValue::Bytes(b)) => {
                let raw = <[u8; 4]>::try_from(&b[..])
                    .map_err(|_| invalid(format!("expected 4 bytes, got {}", b.len())))?;
                Ok(Feature::float(f32::from_le_bytes(raw)))
            }

            (FeatureType::Float32List, FieldValue::Float32List(v)) => Ok(Feature::FloatList(v)),
            (FeatureType::Float32List, FieldValue::Float32(f)) => Ok(Feature::float(f)),
            (FeatureType::Float32List, FieldValue::Bytes(b)) => {
                decode_packed::<4, f32>(&b, f32::from_le_bytes)
                    .map(Feature::FloatList)
                    .map_err(invalid)
            }

            (FeatureType::Bytes, FieldValue::Bytes(b)) => Ok(Feature::BytesList(vec![b])),

            (FeatureType::BytesList, FieldValue::BytesList(v)) => Ok(Feature::BytesList(v)),
            (FeatureType::BytesList, FieldValue::Bytes(b)) => Ok(Feature::BytesList(vec![b])),

            (_, other) => Err(invalid(format!("value holds {}", other.kind_name()))),
        }
    }

    fn into_natural_feature(self) -> Feature {
        match self {
            FieldValue::Bytes(b) => Feature::BytesList(vec![b]),
            FieldValue::BytesList(v) => Feature::BytesList(v),
            FieldValue::Int64(i) => Feature::int64(i),
            FieldValue::Int64List(v) => Feature::Int64List(v),
            FieldValue::Float32(f) => Feature::float(f),
            FieldValue::Float32List(v) => Feature::FloatList(v),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Bytes(_) => "bytes",
            FieldValue::BytesList(_) => "bytes_list",
            FieldValue::Int64(_) => "int64",
            FieldValue::Int64List(_) => "int64_list",
            FieldValue::Float32(_) => "float32",
            FieldValue::Float32List(_) => "float32_list",
        }
    }
}

impl From<Bytes> for FieldValue {
    fn from(value: Bytes) -> Self {
        FieldValue::Bytes(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        FieldValue::Bytes(Bytes::from(value))
    }
}

impl From<&'static [u8]> for FieldValue {
    fn from(value: &'static [u8]) -> Self {
        FieldValue::Bytes(Bytes::from_static(value))
    }
}

/// Decode a single zig-zag encoded signed varint occupying the whole buffer.
fn decode_zigzag_varint(buf: &[u8]) -> Result<i64, String> {
    let mut raw: u64 = 0;
    for (i, byte) in buf.iter().enumerate() {
        if i >= 10 || (i == 9 && *byte > 1) {
            return Err("varint overflows 64 bits".to_string());
        }
        raw |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            if i + 1 != buf.len() {
                return Err(format!("{} trailing bytes after varint", buf.len() - i - 1));
            }
            let value = (raw >> 1) as i64;
            return Ok(if raw & 1 != 0 { !value } else { value });
        }
    }
    Err("truncated varint".to_string())
}

fn decode_packed<const N: usize, T>(
    buf: &[u8],
    from_le: fn([u8; N]) -> T,
) -> Result<Vec<T>, String> {
    if buf.len() % N != 0 {
        return Err(format!("length {} is not a multiple of {}", buf.len(), N));
    }
    Ok(buf
        .chunks_exact(N)
        .map(|chunk| {
            let mut raw = [0u8; N];
            raw.copy_from_slice(chunk);
            from_le(raw)
        })
        .collect())
}
