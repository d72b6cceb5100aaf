use std::collections::BTreeSet;
use std::sync::Arc;

use super::selection::Selection;
use crate::domain::entities::FieldMap;

/// Pure record → record step applied inside a stage chain.
pub trait Transformation<T>: Send + Sync {
    fn transform(&self, record: T) -> T;
}

pub type TransformationRef<T> = Arc<dyn Transformation<T>>;

/// Returns the record unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<T> Transformation<T> for Identity {
    fn transform(&self, record: T) -> T {
        record
    }
}

/// Copies the value of each present source field to `dest`.
///
/// Sources are visited in order, so with several present sources the last
/// one wins. With none present the record is returned untouched.
#[derive(Debug, Clone)]
pub struct Rename {
    dest: String,
    sources: Vec<String>,
}

impl Rename {
    pub fn new(dest: impl Into<String>, sources: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            dest: dest.into(),
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }

    pub fn dest(&self) -> &str {
        &self.dest
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }
}

impl<T: FieldMap> Transformation<T> for Rename {
    fn transform(&self, mut record: T) -> T {
        for source in &self.sources {
            if let Some(value) = record.field(source).cloned() {
                record.set_field(&self.dest, value);
            }
        }
        record
    }
}

/// Prunes a record down to a fixed set of field names.
#[derive(Debug, Clone)]
pub struct Retain {
    keep: BTreeSet<String>,
}

impl Retain {
    pub fn new(keep: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keep: keep.into_iter().map(Into::into).collect(),
        }
    }
}

impl<T: FieldMap> Transformation<T> for Retain {
    fn transform(&self, mut record: T) -> T {
        record.retain_fields(&|name| self.keep.contains(name));
        record
    }
}

/// Projection onto the union of the keys chosen by several selections.
pub struct SelectFields<T> {
    selections: Vec<Box<dyn Selection<T>>>,
}

impl<T> SelectFields<T> {
    pub fn new(selections: Vec<Box<dyn Selection<T>>>) -> Self {
        Self { selections }
    }

    pub fn with(mut self, selection: impl Selection<T> + 'static) -> Self {
        self.selections.push(Box::new(selection));
        self
    }
}

impl<T> Default for SelectFields<T> {
    fn default() -> Self {
        Self {
            selections: Vec::new(),
        }
    }
}

impl<T: FieldMap> Transformation<T> for SelectFields<T> {
    fn transform(&self, mut record: T) -> T {
        let selected: BTreeSet<String> = self
            .selections
            .iter()
            .flat_map(|selection| selection.select(&record))
            .collect();
        record.retain_fields(&|name| selected.contains(name));
        record
    }
}

/// Transformation backed by a closure.
pub struct FnTransformation<F>(F);

impl<F> FnTransformation<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<T, F> Transformation<T> for FnTransformation<F>
where
    F: Fn(T) -> T + Send + Sync,
{
    fn transform(&self, record: T) -> T {
        (self.0)(record)
    }
}
