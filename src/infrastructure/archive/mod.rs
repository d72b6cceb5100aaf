//! Tar container → logical records.
//!
//! Entries are grouped by basename (the path minus its final extension); each
//! group becomes one record keyed by `__key__`. Two strategies decide when a
//! group is complete: greedy buffers the whole container, seek makes a
//! names-only first pass and emits each record as soon as its last member is
//! read on the second.

mod assembler;
mod entry;
mod greedy;
mod options;
mod reader;
mod seek;

pub use assembler::{ExpectedMemberSet, PendingRecordSet, SeekAssembler};
pub use entry::{scan_entries, ContainerEntry, ScanMode};
pub use options::{ArchiveOptions, Compression, Strategy, DEFAULT_QUEUE_CAPACITY};
pub use reader::{ArchiveInput, ArchiveReader, SeekRead};
