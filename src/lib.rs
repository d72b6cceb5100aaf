//! # tarpipe - tar archives to checksummed record streams
//!
//! Reads a tar container (optionally gzip-wrapped) whose entries share
//! basenames across extensions, groups each basename into one multi-field
//! record, and writes those records as a TFRecord stream: length-framed,
//! masked-CRC32C-checked, `tf.Example`-encoded payloads.
//!
//! ## Architecture Layers
//!
//! - **Domain**: logical and wire records, field values, feature types
//! - **Application**: the record source port, transformation/selection/filter
//!   stages, the pipeline and its sequential or concurrent sink
//! - **Infrastructure**: the checksum, the record codec, the archive decomposer
//!
//! ## Example Usage
//!
//! ```no_run
//! use tarpipe::{ArchiveOptions, ArchiveReader, Pipeline, RecordWriter, SinkMode, StageChain};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = ArchiveReader::open("shard-000.tar", ArchiveOptions::default())?;
//! let output = tokio::fs::File::create("shard-000.tfrecord").await?;
//! let mut writer = RecordWriter::new(output);
//!
//! let written = Pipeline::from_archive(reader)
//!     .wire_stages(StageChain::new().skip_empty())
//!     .sink_mode(SinkMode::concurrent(4))
//!     .run(&mut writer)
//!     .await?;
//! println!("wrote {written} records");
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export key types explicitly to avoid ambiguity
pub use application::errors::{PipelineError, Result};
pub use application::filter::{FnFilter, RecordFilter, SkipEmpty};
pub use application::pipeline::{Pipeline, PipelineSink, SinkMode, Stage, StageChain};
pub use application::ports::{MemorySource, RecordSource, SourceRef};
pub use application::transform;
pub use config::Config;
pub use domain::errors as domain_errors;
pub use domain::{entities, value_objects};
pub use infrastructure::archive::{ArchiveInput, ArchiveOptions, ArchiveReader, Compression, Strategy};
pub use infrastructure::checksum::RecordChecksum;
pub use infrastructure::tfrecord::{RecordReader, RecordWriter};
