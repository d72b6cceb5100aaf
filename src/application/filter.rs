//! Filter stages: pass a record through or pull the next one instead.

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::errors::Result;
use crate::application::ports::{RecordSource, SourceRef};
use crate::domain::entities::FieldMap;

/// Predicate deciding whether a record continues down the chain.
pub trait RecordFilter<T>: Send + Sync {
    fn keep(&self, record: &T) -> bool;
}

pub type FilterRef<T> = Arc<dyn RecordFilter<T>>;

/// Drops records with no fields, or with only the key field.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipEmpty;

impl<T: FieldMap> RecordFilter<T> for SkipEmpty {
    fn keep(&self, record: &T) -> bool {
        !record.is_empty_record()
    }
}

/// Filter backed by a closure.
pub struct FnFilter<F>(F);

impl<F> FnFilter<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<T, F> RecordFilter<T> for FnFilter<F>
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn keep(&self, record: &T) -> bool {
        (self.0)(record)
    }
}

/// Source yielding only the upstream records accepted by `filter`.
pub struct FilteredSource<T> {
    upstream: SourceRef<T>,
    filter: FilterRef<T>,
}

impl<T> FilteredSource<T> {
    pub fn new(upstream: SourceRef<T>, filter: FilterRef<T>) -> Self {
        Self { upstream, filter }
    }
}

#[async_trait]
impl<T: Send + 'static> RecordSource<T> for FilteredSource<T> {
    async fn read(&self) -> Result<Option<T>> {
        while let Some(record) = self.upstream.read().await? {
            if self.filter.keep(&record) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}
