use thiserror::Error;

use super::value_objects::FeatureType;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("Field name {0:?} is reserved for the record key")]
    ReservedField(String),

    #[error("Duplicate member {field:?} for record {basename:?}")]
    DuplicateMember { basename: String, field: String },

    #[error("Field {field:?} cannot be read as {expected}: {reason}")]
    InvalidFieldEncoding {
        field: String,
        expected: FeatureType,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_field_message() {
        let err = DomainError::ReservedField("__key__".to_string());
        assert!(err.to_string().contains("reserved"));
        assert!(err.to_string().contains("__key__"));
    }

    #[test]
    fn test_invalid_field_encoding_message() {
        let err = DomainError::InvalidFieldEncoding {
            field: "cls".to_string(),
            expected: FeatureType::Float32,
            reason: "expected 4 bytes, got 3".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("cls"));
        assert!(msg.contains("float32"));
        assert!(msg.contains("expected 4 bytes"));
    }
}
