use bytes::Bytes;
use std::collections::BTreeMap;

use super::field_map::{FieldMap, KEY_FIELD};
use crate::domain::errors::DomainError;
use crate::domain::value_objects::FieldValue;

/// Multi-field record reconstructed from archive entries sharing a basename.
///
/// Always carries the reserved `__key__` field when produced by the archive
/// reader; stages may remove it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogicalRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl LogicalRecord {
    /// Create a record holding only its key field.
    pub fn new(key: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(
            KEY_FIELD.to_string(),
            FieldValue::Bytes(Bytes::from(key.into())),
        );
        Self { fields }
    }

    /// Create a record without a key field.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a finalized record from accumulated archive members.
    pub fn from_members(
        basename: impl Into<String>,
        members: BTreeMap<String, Bytes>,
    ) -> Result<Self, DomainError> {
        if members.contains_key(KEY_FIELD) {
            return Err(DomainError::ReservedField(KEY_FIELD.to_string()));
        }

        let mut record = Self::new(basename);
        record.fields.extend(
            members
                .into_iter()
                .map(|(name, payload)| (name, FieldValue::Bytes(payload))),
        );
        Ok(record)
    }

    /// The record basename, if the key field holds UTF-8 bytes.
    pub fn key(&self) -> Option<&str> {
        self.fields
            .get(KEY_FIELD)
            .and_then(FieldValue::as_bytes)
            .and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn into_fields(self) -> BTreeMap<String, FieldValue> {
        self.fields
    }
}

impl FieldMap for LogicalRecord {
    type Value = FieldValue;

    fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    fn set_field(&mut self, name: &str, value: FieldValue) {
        self.fields.insert(name.to_string(), value);
    }

    fn retain_fields(&mut self, keep: &dyn Fn(&str) -> bool) {
        self.fields.retain(|name, _| keep(name));
    }

    fn field_count(&self) -> usize {
        self.fields.len()
    }
}

impl FromIterator<(String, FieldValue)> for LogicalRecord {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
