use std::collections::BTreeMap;

use super::field_map::{FieldMap, KEY_FIELD};
use crate::domain::value_objects::Feature;

/// Typed feature map ready for binary serialization (a tf.Example).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireRecord {
    features: BTreeMap<String, Feature>,
}

impl WireRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a feature, replacing any previous value (and kind) under that name.
    pub fn insert(&mut self, name: impl Into<String>, feature: Feature) -> Option<Feature> {
        self.features.insert(name.into(), feature)
    }

    pub fn with_feature(mut self, name: impl Into<String>, feature: Feature) -> Self {
        self.insert(name, feature);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Feature> {
        self.features.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Feature> {
        self.features.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// The record key, when `__key__` holds a single UTF-8 bytes element.
    pub fn key(&self) -> Option<&str> {
        match self.features.get(KEY_FIELD)?.as_bytes_list()? {
            [single] => std::str::from_utf8(single).ok(),
            _ => None,
        }
    }

    pub fn features(&self) -> &BTreeMap<String, Feature> {
        &self.features
    }

    pub fn into_features(self) -> BTreeMap<String, Feature> {
        self.features
    }
}

impl FieldMap for WireRecord {
    type Value = Feature;

    fn field_names(&self) -> Vec<&str> {
        self.features.keys().map(String::as_str).collect()
    }

    fn field(&self, name: &str) -> Option<&Feature> {
        self.features.get(name)
    }

    fn set_field(&mut self, name: &str, value: Feature) {
        self.features.insert(name.to_string(), value);
    }

    fn retain_fields(&mut self, keep: &dyn Fn(&str) -> bool) {
        self.features.retain(|name, _| keep(name));
    }

    fn field_count(&self) -> usize {
        self.features.len()
    }
}

impl FromIterator<(String, Feature)> for WireRecord {
    fn from_iter<I: IntoIterator<Item = (String, Feature)>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}
