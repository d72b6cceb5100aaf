use bytes::Bytes;

use super::FeatureType;

/// One typed feature of a wire record.
///
/// A feature holds exactly one list kind; scalars are single-element lists.
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Int64List(Vec<i64>),
    FloatList(Vec<f32>),
    BytesList(Vec<Bytes>),
}

impl Feature {
    pub fn int64(value: i64) -> Self {
        Feature::Int64List(vec![value])
    }

    pub fn float(value: f32) -> Self {
        Feature::FloatList(vec![value])
    }

    pub fn bytes(value: impl Into<Bytes>) -> Self {
        Feature::BytesList(vec![value.into()])
    }

    /// The list kind this feature carries.
    pub fn kind(&self) -> FeatureType {
        match self {
            Feature::Int64List(_) => FeatureType::Int64List,
            Feature::FloatList(_) => FeatureType::Float32List,
            Feature::BytesList(_) => FeatureType::BytesList,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Feature::Int64List(v) => v.len(),
            Feature::FloatList(v) => v.len(),
            Feature::BytesList(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_int64_list(&self) -> Option<&[i64]> {
        match self {
            Feature::Int64List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float_list(&self) -> Option<&[f32]> {
        match self {
            Feature::FloatList(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes_list(&self) -> Option<&[Bytes]> {
        match self {
            Feature::BytesList(v) => Some(v),
            _ => None,
        }
    }
}
