use async_trait::async_trait;

use super::transformation::TransformationRef;
use crate::application::errors::Result;
use crate::application::ports::{RecordSource, SourceRef};

/// Source that applies transformations, in order, to every upstream record.
pub struct TransformingSource<T> {
    upstream: SourceRef<T>,
    transformations: Vec<TransformationRef<T>>,
}

impl<T> TransformingSource<T> {
    pub fn new(upstream: SourceRef<T>, transformations: Vec<TransformationRef<T>>) -> Self {
        Self {
            upstream,
            transformations,
        }
    }
}

#[async_trait]
impl<T: Send + 'static> RecordSource<T> for TransformingSource<T> {
    async fn read(&self) -> Result<Option<T>> {
        let record = match self.upstream.read().await? {
            Some(record) => record,
            None => return Ok(None),
        };

        Ok(Some(
            self.transformations
                .iter()
                .fold(record, |record, t| t.transform(record)),
        ))
    }
}
