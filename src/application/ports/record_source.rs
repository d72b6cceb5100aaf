use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::application::errors::Result;

/// Port for anything that yields records one at a time.
///
/// `Ok(None)` is end-of-stream and is returned again on every later call.
/// Takes `&self` so several pipeline workers can pull from one shared upstream;
/// implementations serialize access internally where they need to.
#[async_trait]
pub trait RecordSource<T>: Send + Sync {
    async fn read(&self) -> Result<Option<T>>;
}

#[cfg(test)]
mockall::mock! {
    pub RecordSource<T: Send + Sync + 'static> {}

    #[async_trait]
    impl<T: Send + Sync + 'static> RecordSource<T> for RecordSource<T> {
        async fn read(&self) -> Result<Option<T>>;
    }
}

/// Shared handle to an upstream source.
pub type SourceRef<T> = Arc<dyn RecordSource<T>>;

/// Source over records already held in memory.
pub struct MemorySource<T> {
    records: Mutex<VecDeque<T>>,
}

impl<T> MemorySource<T> {
    pub fn new(records: impl IntoIterator<Item = T>) -> Self {
        Self {
            records: Mutex::new(records.into_iter().collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.records.lock().len()
    }
}

#[async_trait]
impl<T: Send + 'static> RecordSource<T> for MemorySource<T> {
    async fn read(&self) -> Result<Option<T>> {
        Ok(self.records.lock().pop_front())
    }
}
