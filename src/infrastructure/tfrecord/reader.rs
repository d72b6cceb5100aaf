use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use super::proto::decode_wire_record;
use crate::application::errors::{ChecksumRegion, PipelineError, Result};
use crate::application::ports::RecordSource;
use crate::domain::entities::WireRecord;
use crate::infrastructure::checksum::RecordChecksum;

const HEADER_LEN: usize = 12;
const FOOTER_LEN: usize = 4;

struct ReaderState<R> {
    inner: R,
    records_read: u64,
    done: bool,
}

/// Reads and verifies framed records from an async stream.
///
/// Zero bytes left at a record boundary is a clean end of stream. After the
/// first error the reader stops and reports end of stream on later calls.
pub struct RecordReader<R> {
    state: Mutex<ReaderState<R>>,
}

impl<R: AsyncRead + Unpin + Send> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            state: Mutex::new(ReaderState {
                inner,
                records_read: 0,
                done: false,
            }),
        }
    }

    /// Next verified payload, or `None` at end of stream.
    pub async fn read_payload(&self) -> Result<Option<Bytes>> {
        let mut state = self.state.lock().await;
        next_payload(&mut state).await
    }

    /// Next decoded record. A payload that fails to decode ends the stream
    /// like any other error.
    pub async fn read_record(&self) -> Result<Option<WireRecord>> {
        let mut state = self.state.lock().await;
        let Some(payload) = next_payload(&mut state).await? else {
            return Ok(None);
        };
        decode_wire_record(&payload).map(Some).map_err(|e| {
            state.done = true;
            warn!(records = state.records_read, error = %e, "Record payload failed to decode");
            e
        })
    }

    /// Read every remaining record into memory.
    pub async fn read_all(&self) -> Result<Vec<WireRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_record().await? {
            records.push(record);
        }
        Ok(records)
    }

    /// Forward every remaining record to `tx`. Returns the count sent.
    ///
    /// Fails with `Cancelled` if the receiving side goes away first.
    pub async fn read_into(&self, tx: mpsc::Sender<WireRecord>) -> Result<u64> {
        let mut count = 0u64;
        while let Some(record) = self.read_record().await? {
            tx.send(record)
                .await
                .map_err(|_| PipelineError::Cancelled)?;
            count += 1;
        }
        Ok(count)
    }

    pub async fn records_read(&self) -> u64 {
        self.state.lock().await.records_read
    }

    pub fn into_inner(self) -> R {
        self.state.into_inner().inner
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send + 'static> RecordSource<WireRecord> for RecordReader<R> {
    async fn read(&self) -> Result<Option<WireRecord>> {
        self.read_record().await
    }
}

async fn next_payload<R: AsyncRead + Unpin>(state: &mut ReaderState<R>) -> Result<Option<Bytes>> {
    if state.done {
        return Ok(None);
    }

    match read_frame(&mut state.inner).await {
        Ok(Some(payload)) => {
            state.records_read += 1;
            Ok(Some(payload))
        }
        Ok(None) => {
            state.done = true;
            debug!(records = state.records_read, "Record stream exhausted");
            Ok(None)
        }
        Err(e) => {
            state.done = true;
            warn!(records = state.records_read, error = %e, "Record stream failed");
            Err(e)
        }
    }
}

async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Bytes>> {
    let mut header = [0u8; HEADER_LEN];
    let got = read_up_to(reader, &mut header).await?;
    if got == 0 {
        return Ok(None);
    }
    if got < HEADER_LEN {
        return Err(short_read(HEADER_LEN, got));
    }

    let (length_bytes, length_crc) = header.split_at(8);
    RecordChecksum::verify(length_bytes, le_u32(length_crc), ChecksumRegion::Length)?;
    let mut raw_length = [0u8; 8];
    raw_length.copy_from_slice(length_bytes);
    let length = u64::from_le_bytes(raw_length);

    let mut payload = Vec::new();
    let got = (&mut *reader).take(length).read_to_end(&mut payload).await?;
    if (got as u64) < length {
        return Err(PipelineError::ShortRead {
            expected: length,
            actual: got as u64,
        });
    }

    let mut footer = [0u8; FOOTER_LEN];
    let got = read_up_to(reader, &mut footer).await?;
    if got < FOOTER_LEN {
        return Err(short_read(FOOTER_LEN, got));
    }
    RecordChecksum::verify(&payload, le_u32(&footer), ChecksumRegion::Payload)?;

    Ok(Some(Bytes::from(payload)))
}

/// Fill `buf` unless the stream ends first; returns the bytes read.
async fn read_up_to<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

fn le_u32(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(raw)
}

fn short_read(expected: usize, actual: usize) -> PipelineError {
    PipelineError::ShortRead {
        expected: expected as u64,
        actual: actual as u64,
    }
}
