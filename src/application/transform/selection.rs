use crate::domain::entities::FieldMap;

/// Chooses a subset of a record's field names.
pub trait Selection<T>: Send + Sync {
    fn select(&self, record: &T) -> Vec<String>;
}

/// Selects fields by name. Empty patterns never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMatch {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Substring(String),
}

impl KeyMatch {
    pub fn exact(key: impl Into<String>) -> Self {
        KeyMatch::Exact(key.into())
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        KeyMatch::Prefix(prefix.into())
    }

    pub fn suffix(suffix: impl Into<String>) -> Self {
        KeyMatch::Suffix(suffix.into())
    }

    pub fn substring(substring: impl Into<String>) -> Self {
        KeyMatch::Substring(substring.into())
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            KeyMatch::Exact(key) => !key.is_empty() && name == key,
            KeyMatch::Prefix(p) => !p.is_empty() && name.starts_with(p.as_str()),
            KeyMatch::Suffix(s) => !s.is_empty() && name.ends_with(s.as_str()),
            KeyMatch::Substring(s) => !s.is_empty() && name.contains(s.as_str()),
        }
    }
}

impl<T: FieldMap> Selection<T> for KeyMatch {
    fn select(&self, record: &T) -> Vec<String> {
        record
            .field_names()
            .into_iter()
            .filter(|name| self.matches(name))
            .map(str::to_string)
            .collect()
    }
}

/// Selection backed by a closure returning the chosen names.
pub struct FnSelection<F>(F);

impl<F> FnSelection<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<T, F> Selection<T> for FnSelection<F>
where
    F: Fn(&T) -> Vec<String> + Send + Sync,
{
    fn select(&self, record: &T) -> Vec<String> {
        (self.0)(record)
    }
}

/// Selects `key` only when its value equals `value`.
#[derive(Debug, Clone)]
pub struct KeyValue<V> {
    key: String,
    value: V,
}

impl<V> KeyValue<V> {
    pub fn new(key: impl Into<String>, value: V) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

impl<T: FieldMap> Selection<T> for KeyValue<T::Value> {
    fn select(&self, record: &T) -> Vec<String> {
        match record.field(&self.key) {
            Some(value) if *value == self.value => vec![self.key.clone()],
            _ => Vec::new(),
        }
    }
}
