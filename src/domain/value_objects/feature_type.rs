use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Target kind for a field when a logical record becomes a wire record.
///
/// The scalar kinds still produce single-element lists on the wire; they only
/// differ from their list counterparts in how raw bytes are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    /// Zig-zag signed varint.
    Int64,
    /// Packed little-endian i64 values.
    Int64List,
    /// Four little-endian bytes.
    Float32,
    /// Packed little-endian f32 values.
    Float32List,
    /// Verbatim bytes, one element.
    Bytes,
    /// Verbatim bytes list.
    BytesList,
}

/// Explicit field-name → feature-type table used by typed conversion.
pub type TypesMap = BTreeMap<String, FeatureType>;

impl FeatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::Int64 => "int64",
            FeatureType::Int64List => "int64_list",
            FeatureType::Float32 => "float32",
            FeatureType::Float32List => "float32_list",
            FeatureType::Bytes => "bytes",
            FeatureType::BytesList => "bytes_list",
        }
    }
}

impl std::fmt::Display for FeatureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeatureType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "int64" | "int" => Ok(FeatureType::Int64),
            "int64_list" | "int64list" => Ok(FeatureType::Int64List),
            "float32" | "float" => Ok(FeatureType::Float32),
            "float32_list" | "float32list" | "float_list" => Ok(FeatureType::Float32List),
            "bytes" => Ok(FeatureType::Bytes),
            "bytes_list" | "byteslist" => Ok(FeatureType::BytesList),
            _ => Err(format!("Invalid feature type: {}", s)),
        }
    }
}
