use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::errors::{PipelineError, Result};
use crate::application::ports::SourceRef;
use crate::domain::entities::WireRecord;
use crate::infrastructure::archive::DEFAULT_QUEUE_CAPACITY;
use crate::infrastructure::tfrecord::RecordWriter;

/// How converted records reach the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkMode {
    /// Pull and write one record at a time; source order is preserved.
    #[default]
    Sequential,
    /// `workers` tasks pull from the shared upstream and feed one writer
    /// through a queue of `queue_capacity` records. Output order is not
    /// guaranteed to match source order.
    Concurrent {
        workers: usize,
        queue_capacity: usize,
    },
}

impl SinkMode {
    /// Zero workers selects sequential mode.
    pub fn from_workers(workers: usize, queue_capacity: usize) -> Self {
        match workers {
            0 => SinkMode::Sequential,
            workers => SinkMode::Concurrent {
                workers,
                queue_capacity,
            },
        }
    }

    pub fn concurrent(workers: usize) -> Self {
        Self::from_workers(workers, DEFAULT_QUEUE_CAPACITY)
    }
}

/// Drains a wire-record source into a [`RecordWriter`].
///
/// # Cancellation
///
/// Every worker and the writer watch one cancellation token at each await
/// point (upstream read, queue send, queue receive). The token is raised
/// internally on the first failure, and may be raised by the caller through
/// [`PipelineSink::with_cancellation`]. Once raised, no task stays blocked on
/// a full queue.
///
/// # Errors
///
/// The first error observed is returned after every worker has exited. A
/// caller-side cancellation with no other failure yields
/// [`PipelineError::Cancelled`].
#[derive(Debug, Clone)]
pub struct PipelineSink {
    mode: SinkMode,
    cancel: CancellationToken,
}

impl PipelineSink {
    pub fn new(mode: SinkMode) -> Self {
        Self {
            mode,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn mode(&self) -> SinkMode {
        self.mode
    }

    /// Write every record from `source`, flush, and return the count.
    pub async fn drain<W>(&self, source: SourceRef<WireRecord>, writer: &mut RecordWriter<W>) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let written = match self.mode {
            SinkMode::Sequential => self.drain_sequential(source, writer).await?,
            SinkMode::Concurrent {
                workers,
                queue_capacity,
            } => {
                self.drain_concurrent(source, writer, workers.max(1), queue_capacity.max(1))
                    .await?
            }
        };
        writer.flush().await?;
        info!(records = written, mode = ?self.mode, "Pipeline finished");
        Ok(written)
    }

    async fn drain_sequential<W>(
        &self,
        source: SourceRef<WireRecord>,
        writer: &mut RecordWriter<W>,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut written = 0u64;
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(PipelineError::Cancelled),
                next = source.read() => next?,
            };
            let Some(record) = next else { break };
            writer.write_record(record).await?;
            written += 1;
        }
        Ok(written)
    }

    async fn drain_concurrent<W>(
        &self,
        source: SourceRef<WireRecord>,
        writer: &mut RecordWriter<W>,
        workers: usize,
        queue_capacity: usize,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let token = self.cancel.child_token();
        let first_error = FirstError::default();
        let (tx, mut rx) = mpsc::channel::<WireRecord>(queue_capacity);

        let mut tasks = JoinSet::new();
        for id in 0..workers {
            let source = Arc::clone(&source);
            let tx = tx.clone();
            let token = token.clone();
            let first_error = first_error.clone();
            tasks.spawn(async move {
                if let Err(e) = run_worker(id, source, tx, &token).await {
                    if !e.is_cancelled() {
                        warn!(worker = id, error = %e, "Pipeline worker failed");
                        first_error.record(e);
                    }
                    token.cancel();
                }
            });
        }
        // The queue closes once every worker has dropped its sender.
        drop(tx);

        let mut written = 0u64;
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                next = rx.recv() => next,
            };
            let Some(record) = next else { break };
            if let Err(e) = writer.write_record(record).await {
                warn!(error = %e, "Writer failed, stopping workers");
                first_error.record(e);
                token.cancel();
                break;
            }
            written += 1;
        }
        drop(rx);

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                first_error.record(PipelineError::Internal(format!("pipeline worker aborted: {e}")));
                token.cancel();
            }
        }

        if let Some(e) = first_error.take() {
            return Err(e);
        }
        if token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        debug!(records = written, workers, "Concurrent sink drained");
        Ok(written)
    }
}

async fn run_worker(
    id: usize,
    source: SourceRef<WireRecord>,
    tx: mpsc::Sender<WireRecord>,
    token: &CancellationToken,
) -> Result<u64> {
    let mut forwarded = 0u64;
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(PipelineError::Cancelled),
            next = source.read() => next?,
        };
        let Some(record) = next else { break };

        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(PipelineError::Cancelled),
            sent = tx.send(record) => {
                if sent.is_err() {
                    return Err(PipelineError::Cancelled);
                }
            }
        }
        forwarded += 1;
    }
    debug!(worker = id, records = forwarded, "Pipeline worker finished");
    Ok(forwarded)
}

/// First error reported by any task; later ones are dropped.
#[derive(Clone, Default)]
struct FirstError(Arc<Mutex<Option<PipelineError>>>);

impl FirstError {
    fn record(&self, err: PipelineError) {
        let mut slot = self.0.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    fn take(&self) -> Option<PipelineError> {
        self.0.lock().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MemorySource, MockRecordSource};
    use crate::domain::value_objects::Feature;
    use crate::infrastructure::tfrecord::RecordReader;
    use std::collections::BTreeSet;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::task::{Context, Poll};

    fn records(n: i64) -> Vec<WireRecord> {
        (0..n)
            .map(|i| WireRecord::new().with_feature("id", Feature::int64(i)))
            .collect()
    }

    fn ids(records: &[WireRecord]) -> BTreeSet<i64> {
        records
            .iter()
            .map(|r| r.get("id").and_then(|f| f.as_int64_list()).unwrap()[0])
            .collect()
    }

    async fn decode(bytes: Vec<u8>) -> Vec<WireRecord> {
        RecordReader::new(&bytes[..]).read_all().await.unwrap()
    }

    /// Upstream that yields `ok` records, then fails on every later read.
    fn failing_source(ok: u64) -> MockRecordSource<WireRecord> {
        let served = AtomicU64::new(0);
        let mut source = MockRecordSource::new();
        source.expect_read().returning(move || {
            let n = served.fetch_add(1, Ordering::SeqCst);
            if n < ok {
                Ok(Some(WireRecord::new().with_feature("id", Feature::int64(n as i64))))
            } else {
                Err(PipelineError::Malformed("broken upstream".to_string()))
            }
        });
        source
    }

    /// Accepts `limit` bytes, then fails every write.
    struct BrokenWriter {
        limit: usize,
        written: usize,
    }

    impl AsyncWrite for BrokenWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            if self.written + buf.len() > self.limit {
                return Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "disk full",
                )));
            }
            self.written += buf.len();
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[test]
    fn test_mode_from_workers() {
        assert_eq!(SinkMode::from_workers(0, 10), SinkMode::Sequential);
        assert_eq!(
            SinkMode::from_workers(4, 10),
            SinkMode::Concurrent {
                workers: 4,
                queue_capacity: 10
            }
        );
        assert_eq!(
            SinkMode::concurrent(2),
            SinkMode::Concurrent {
                workers: 2,
                queue_capacity: DEFAULT_QUEUE_CAPACITY
            }
        );
    }

    #[tokio::test]
    async fn test_sequential_preserves_order() {
        let source: SourceRef<WireRecord> = Arc::new(MemorySource::new(records(50)));
        let mut writer = RecordWriter::new(Vec::new());
        let written = PipelineSink::new(SinkMode::Sequential)
            .drain(source, &mut writer)
            .await
            .unwrap();
        assert_eq!(written, 50);
        assert_eq!(decode(writer.into_inner()).await, records(50));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_matches_sequential_set() {
        for workers in [1, 2, 8] {
            for count in [0, 1, 1000] {
                let source: SourceRef<WireRecord> = Arc::new(MemorySource::new(records(count)));
                let mut writer = RecordWriter::new(Vec::new());
                let written = PipelineSink::new(SinkMode::Concurrent {
                    workers,
                    queue_capacity: 4,
                })
                .drain(source, &mut writer)
                .await
                .unwrap();

                assert_eq!(written, count as u64, "workers={workers} count={count}");
                let decoded = decode(writer.into_inner()).await;
                assert_eq!(decoded.len(), count as usize);
                assert_eq!(ids(&decoded), ids(&records(count)));
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_error_is_returned_without_deadlock() {
        let source: SourceRef<WireRecord> = Arc::new(failing_source(500));
        let mut writer = RecordWriter::new(Vec::new());
        let err = PipelineSink::new(SinkMode::Concurrent {
            workers: 8,
            queue_capacity: 1,
        })
        .drain(source, &mut writer)
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::Malformed(msg) if msg == "broken upstream"));
    }

    #[tokio::test]
    async fn test_sequential_error_stops_stream() {
        let served = Arc::new(AtomicU64::new(0));
        let mut mock = MockRecordSource::<WireRecord>::new();
        let counter = Arc::clone(&served);
        mock.expect_read().times(4).returning(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 3 {
                Ok(Some(WireRecord::new().with_feature("id", Feature::int64(n as i64))))
            } else {
                Err(PipelineError::Malformed("broken upstream".to_string()))
            }
        });
        let source: SourceRef<WireRecord> = Arc::new(mock);
        let mut writer = RecordWriter::new(Vec::new());
        let err = PipelineSink::new(SinkMode::Sequential)
            .drain(source, &mut writer)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Malformed(_)));
        assert_eq!(writer.records_written(), 3);
        assert_eq!(served.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_writer_error_stops_workers() {
        let source: SourceRef<WireRecord> = Arc::new(MemorySource::new(records(1000)));
        let mut writer = RecordWriter::new(BrokenWriter {
            limit: 100,
            written: 0,
        });
        let err = PipelineSink::new(SinkMode::Concurrent {
            workers: 4,
            queue_capacity: 2,
        })
        .drain(source, &mut writer)
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::Io(ref e) if e.kind() == std::io::ErrorKind::BrokenPipe));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_caller_cancellation() {
        let token = CancellationToken::new();
        let sink = PipelineSink::new(SinkMode::Concurrent {
            workers: 3,
            queue_capacity: 1,
        })
        .with_cancellation(token.clone());

        // Endless upstream: only the caller's token ends the drain.
        let mut mock = MockRecordSource::<WireRecord>::new();
        mock.expect_read()
            .returning(|| Ok(Some(WireRecord::new().with_feature("id", Feature::int64(0)))));
        let source: SourceRef<WireRecord> = Arc::new(mock);
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            token.cancel();
        });

        let mut writer = RecordWriter::new(Vec::new());
        let err = sink.drain(source, &mut writer).await.unwrap_err();
        assert!(err.is_cancelled());
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn test_sequential_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let sink = PipelineSink::new(SinkMode::Sequential).with_cancellation(token);

        let mut mock = MockRecordSource::<WireRecord>::new();
        mock.expect_read().never();
        let source: SourceRef<WireRecord> = Arc::new(mock);

        let mut writer = RecordWriter::new(Vec::new());
        assert!(sink.drain(source, &mut writer).await.unwrap_err().is_cancelled());
        assert_eq!(writer.records_written(), 0);
    }

    #[test]
    fn test_first_error_keeps_earliest() {
        let slot = FirstError::default();
        slot.record(PipelineError::Cancelled);
        slot.record(PipelineError::Internal("later".into()));
        assert!(slot.take().unwrap().is_cancelled());
        assert!(slot.take().is_none());
    }
}
