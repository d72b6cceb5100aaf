use std::sync::Arc;

use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::sink::{PipelineSink, SinkMode};
use super::stages::StageChain;
use crate::application::errors::Result;
use crate::application::ports::SourceRef;
use crate::application::transform::{Conversion, ConvertingSource};
use crate::domain::entities::{LogicalRecord, WireRecord};
use crate::infrastructure::archive::ArchiveReader;
use crate::infrastructure::tfrecord::RecordWriter;

/// Source → logical stages → conversion → wire stages → record writer.
///
/// ```rust,ignore
/// let reader = ArchiveReader::open("shard-000.tar", ArchiveOptions::default())?;
/// let written = Pipeline::from_archive(reader)
///     .logical_stages(StageChain::new().transform(Rename::new("image", ["jpg", "png"])))
///     .conversion(Conversion::from_types(types))
///     .wire_stages(StageChain::new().skip_empty())
///     .sink_mode(SinkMode::concurrent(4))
///     .run(&mut RecordWriter::new(output))
///     .await?;
/// ```
pub struct Pipeline {
    source: SourceRef<LogicalRecord>,
    logical_stages: StageChain<LogicalRecord>,
    conversion: Conversion,
    wire_stages: StageChain<WireRecord>,
    mode: SinkMode,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(source: SourceRef<LogicalRecord>) -> Self {
        Self {
            source,
            logical_stages: StageChain::new(),
            conversion: Conversion::default(),
            wire_stages: StageChain::new(),
            mode: SinkMode::Sequential,
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_archive(reader: ArchiveReader) -> Self {
        Self::new(Arc::new(reader))
    }

    pub fn logical_stages(mut self, stages: StageChain<LogicalRecord>) -> Self {
        self.logical_stages = stages;
        self
    }

    pub fn conversion(mut self, conversion: Conversion) -> Self {
        self.conversion = conversion;
        self
    }

    pub fn wire_stages(mut self, stages: StageChain<WireRecord>) -> Self {
        self.wire_stages = stages;
        self
    }

    pub fn sink_mode(mut self, mode: SinkMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops a running pipeline when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The fully wired wire-record source, without a sink.
    pub fn build_source(&self) -> SourceRef<WireRecord> {
        let logical = self.logical_stages.attach(Arc::clone(&self.source));
        let converted: SourceRef<WireRecord> =
            Arc::new(ConvertingSource::new(logical, self.conversion.clone()));
        self.wire_stages.attach(converted)
    }

    /// Drain everything into `writer`; returns the number of records written.
    pub async fn run<W>(self, writer: &mut RecordWriter<W>) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        info!(
            logical_stages = self.logical_stages.len(),
            wire_stages = self.wire_stages.len(),
            mode = ?self.mode,
            "Starting pipeline"
        );
        let source = self.build_source();
        PipelineSink::new(self.mode)
            .with_cancellation(self.cancel)
            .drain(source, writer)
            .await
    }
}
