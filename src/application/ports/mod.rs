mod record_source;

pub use record_source::{MemorySource, RecordSource, SourceRef};

#[cfg(test)]
pub use record_source::MockRecordSource;
