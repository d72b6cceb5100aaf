use std::sync::Arc;

use crate::application::filter::{FilterRef, FilteredSource, RecordFilter, SkipEmpty};
use crate::application::ports::SourceRef;
use crate::application::transform::{Transformation, TransformationRef, TransformingSource};
use crate::domain::entities::FieldMap;

/// One step of a stage chain.
pub enum Stage<T> {
    Transform(TransformationRef<T>),
    Filter(FilterRef<T>),
}

impl<T> Clone for Stage<T> {
    fn clone(&self) -> Self {
        match self {
            Stage::Transform(t) => Stage::Transform(Arc::clone(t)),
            Stage::Filter(f) => Stage::Filter(Arc::clone(f)),
        }
    }
}

/// Ordered, linear list of stages over one record type.
///
/// ```rust,ignore
/// let chain = StageChain::new()
///     .transform(Rename::new("image", ["jpg", "png"]))
///     .skip_empty();
/// let source = chain.attach(upstream);
/// ```
pub struct StageChain<T> {
    stages: Vec<Stage<T>>,
}

impl<T> Default for StageChain<T> {
    fn default() -> Self {
        Self { stages: Vec::new() }
    }
}

impl<T> Clone for StageChain<T> {
    fn clone(&self) -> Self {
        Self {
            stages: self.stages.clone(),
        }
    }
}

impl<T: Send + 'static> StageChain<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(mut self, transformation: impl Transformation<T> + 'static) -> Self {
        self.stages.push(Stage::Transform(Arc::new(transformation)));
        self
    }

    pub fn filter(mut self, filter: impl RecordFilter<T> + 'static) -> Self {
        self.stages.push(Stage::Filter(Arc::new(filter)));
        self
    }

    pub fn push(&mut self, stage: Stage<T>) {
        self.stages.push(stage);
    }

    /// Append every stage of `other` after this chain's stages.
    pub fn then(mut self, other: StageChain<T>) -> Self {
        self.stages.extend(other.stages);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Wrap `source` so that reads pass through every stage in order.
    ///
    /// Consecutive transformations share one adapter; each filter gets its own.
    pub fn attach(&self, source: SourceRef<T>) -> SourceRef<T> {
        let mut source = source;
        let mut batch: Vec<TransformationRef<T>> = Vec::new();

        for stage in &self.stages {
            match stage {
                Stage::Transform(t) => batch.push(Arc::clone(t)),
                Stage::Filter(f) => {
                    if !batch.is_empty() {
                        let transformations = std::mem::take(&mut batch);
                        source = Arc::new(TransformingSource::new(source, transformations));
                    }
                    source = Arc::new(FilteredSource::new(source, Arc::clone(f)));
                }
            }
        }

        if !batch.is_empty() {
            source = Arc::new(TransformingSource::new(source, batch));
        }
        source
    }
}

impl<T: FieldMap + Send + 'static> StageChain<T> {
    /// Drop records that are empty or hold only their key.
    pub fn skip_empty(self) -> Self {
        self.filter(SkipEmpty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::filter::FnFilter;
    use crate::application::ports::MemorySource;
    use crate::application::transform::{FnTransformation, Rename, Retain};
    use crate::domain::entities::LogicalRecord;

    async fn drain<T: Send + 'static>(source: SourceRef<T>) -> Vec<T> {
        let mut out = Vec::new();
        while let Some(record) = source.read().await.unwrap() {
            out.push(record);
        }
        out
    }

    #[tokio::test]
    async fn test_empty_chain_passes_through() {
        let chain = StageChain::<u32>::new();
        let source = chain.attach(Arc::new(MemorySource::new(vec![1u32, 2])));
        assert_eq!(drain(source).await, vec![1u32, 2]);
    }

    #[tokio::test]
    async fn test_stages_run_in_declared_order() {
        // filter before the transform sees the original values
        let chain = StageChain::<u32>::new()
            .filter(FnFilter::new(|v: &u32| v % 2 == 0))
            .transform(FnTransformation::new(|v: u32| v + 1))
            .filter(FnFilter::new(|v: &u32| *v > 3));
        assert_eq!(chain.len(), 3);

        let source = chain.attach(Arc::new(MemorySource::new(0..8u32)));
        assert_eq!(drain(source).await, vec![5, 7]);
    }

    #[tokio::test]
    async fn test_rename_then_prune_then_skip_empty() {
        let mut with_jpg = LogicalRecord::new("a");
        with_jpg.insert("jpg", b"img".to_vec());
        let only_key = LogicalRecord::new("b");

        let chain = StageChain::<LogicalRecord>::new()
            .transform(Rename::new("image", ["jpg"]))
            .transform(Retain::new(["image"]))
            .skip_empty();

        let source = chain.attach(Arc::new(MemorySource::new(vec![with_jpg, only_key])));
        let records = drain(source).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].field_names(), vec!["image"]);
    }

    #[test]
    fn test_then_concatenates() {
        let first = StageChain::<LogicalRecord>::new().skip_empty();
        let second = StageChain::<LogicalRecord>::new().transform(Retain::new(["cls"]));
        let chain = first.then(second);
        assert_eq!(chain.len(), 2);
        assert!(matches!(chain.stages[0], Stage::Filter(_)));
        assert!(matches!(chain.clone().stages[1], Stage::Transform(_)));
    }
}
