use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::proto::encode_wire_record;
use crate::application::errors::Result;
use crate::application::ports::RecordSource;
use crate::domain::entities::WireRecord;
use crate::infrastructure::checksum::RecordChecksum;

/// Bytes of framing around each payload: length, length CRC, payload CRC.
pub const FRAME_OVERHEAD: usize = 8 + 4 + 4;

/// Writes length-framed, checksummed records to an async stream.
///
/// A frame is emitted with a single `write_all`; if that fails midway the
/// stream is left corrupt and the writer should be discarded.
pub struct RecordWriter<W> {
    inner: W,
    records_written: u64,
}

impl<W: AsyncWrite + Unpin + Send> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            records_written: 0,
        }
    }

    /// Build the complete frame for one payload.
    pub fn encode_frame(payload: &[u8]) -> BytesMut {
        let length = (payload.len() as u64).to_le_bytes();
        let mut frame = BytesMut::with_capacity(payload.len() + FRAME_OVERHEAD);
        frame.put_slice(&length);
        frame.put_u32_le(RecordChecksum::compute(&length));
        frame.put_slice(payload);
        frame.put_u32_le(RecordChecksum::compute(payload));
        frame
    }

    pub async fn write_payload(&mut self, payload: &[u8]) -> Result<()> {
        let frame = Self::encode_frame(payload);
        self.inner.write_all(&frame).await?;
        self.records_written += 1;
        Ok(())
    }

    pub async fn write_record(&mut self, record: WireRecord) -> Result<()> {
        let payload = encode_wire_record(record);
        self.write_payload(&payload).await
    }

    /// Write every record `source` yields, then flush. Returns the count.
    pub async fn write_all_from<S>(&mut self, source: &S) -> Result<u64>
    where
        S: RecordSource<WireRecord> + ?Sized,
    {
        let mut count = 0u64;
        while let Some(record) = source.read().await? {
            self.write_record(record).await?;
            count += 1;
        }
        self.flush().await?;
        info!(records = count, "Record stream written");
        Ok(count)
    }

    /// Write records until every sender is dropped, then flush.
    pub async fn write_from_channel(&mut self, mut rx: mpsc::Receiver<WireRecord>) -> Result<u64> {
        let mut count = 0u64;
        while let Some(record) = rx.recv().await {
            self.write_record(record).await?;
            count += 1;
        }
        self.flush().await?;
        debug!(records = count, "Channel drained");
        Ok(count)
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.inner.flush().await?;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
