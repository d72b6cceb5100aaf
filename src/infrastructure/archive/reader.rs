use async_trait::async_trait;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::options::{decoded, ArchiveOptions, Compression, Strategy};
use super::{greedy, seek};
use crate::application::errors::{PipelineError, Result};
use crate::application::ports::RecordSource;
use crate::domain::entities::LogicalRecord;

/// Readable and seekable input.
pub trait SeekRead: Read + Seek + Send {}

impl<T: Read + Seek + Send> SeekRead for T {}

/// Container input, tagged by whether it supports random access.
pub enum ArchiveInput {
    Stream(Box<dyn Read + Send>),
    Seekable(Box<dyn SeekRead>),
}

impl ArchiveInput {
    pub fn stream(reader: impl Read + Send + 'static) -> Self {
        ArchiveInput::Stream(Box::new(reader))
    }

    pub fn seekable(reader: impl Read + Seek + Send + 'static) -> Self {
        ArchiveInput::Seekable(Box::new(reader))
    }

    /// Open a file; files always support seeking.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::seekable(File::open(path)?))
    }

    pub fn is_seekable(&self) -> bool {
        matches!(self, ArchiveInput::Seekable(_))
    }
}

impl std::fmt::Debug for ArchiveInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveInput::Stream(_) => f.write_str("ArchiveInput::Stream"),
            ArchiveInput::Seekable(_) => f.write_str("ArchiveInput::Seekable"),
        }
    }
}

/// Work handed to the producer thread at the first read.
struct ProducerJob {
    input: ArchiveInput,
    strategy: Strategy,
    compression: Compression,
    capacity: usize,
}

type RecordReceiver = mpsc::Receiver<Result<LogicalRecord>>;

impl ProducerJob {
    fn spawn(self) -> (RecordReceiver, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(self.capacity.max(1));
        let handle = tokio::task::spawn_blocking(move || {
            let strategy = self.strategy;
            if let Err(e) = self.run(&tx) {
                warn!(strategy = %strategy, error = %e, "Archive producer failed");
                if tx.blocking_send(Err(e)).is_err() {
                    debug!("Record consumer dropped before the error was delivered");
                }
            }
        });
        (rx, handle)
    }

    fn run(self, tx: &mpsc::Sender<Result<LogicalRecord>>) -> Result<()> {
        info!(strategy = %self.strategy, compression = %self.compression, "Reading archive");
        match (self.input, self.strategy) {
            (ArchiveInput::Seekable(input), Strategy::Seek) => {
                let mut input = BufReader::new(input);
                let gzip = self.compression.is_gzip(&mut input)?;
                seek::produce(input, gzip, tx)
            }
            (ArchiveInput::Seekable(input), _) => {
                let mut input = BufReader::new(input);
                let gzip = self.compression.is_gzip(&mut input)?;
                greedy::produce(decoded(input, gzip), tx)
            }
            (ArchiveInput::Stream(input), _) => {
                let mut input = BufReader::new(input);
                let gzip = self.compression.is_gzip(&mut input)?;
                greedy::produce(decoded(input, gzip), tx)
            }
        }
    }
}

struct ReaderState {
    job: Option<ProducerJob>,
    rx: Option<RecordReceiver>,
    producer: Option<JoinHandle<()>>,
    records: u64,
}

/// Turns a tar container into a stream of logical records.
///
/// Parsing happens on a blocking thread started by the first `read`. The
/// first error is returned once; afterwards the reader reports end of stream.
pub struct ArchiveReader {
    strategy: Strategy,
    state: Mutex<ReaderState>,
}

impl ArchiveReader {
    pub fn new(input: ArchiveInput, options: ArchiveOptions) -> Result<Self> {
        let strategy = match (options.strategy, input.is_seekable()) {
            (Strategy::Auto, true) => Strategy::Seek,
            (Strategy::Auto, false) => Strategy::Greedy,
            (Strategy::Seek, false) => {
                return Err(PipelineError::Config(
                    "seek strategy needs a seekable input".to_string(),
                ))
            }
            (strategy, _) => strategy,
        };

        let capacity = match strategy {
            Strategy::Seek => 1,
            _ => options.queue_capacity,
        };

        Ok(Self {
            strategy,
            state: Mutex::new(ReaderState {
                job: Some(ProducerJob {
                    input,
                    strategy,
                    compression: options.compression,
                    capacity,
                }),
                rx: None,
                producer: None,
                records: 0,
            }),
        })
    }

    pub fn open(path: impl AsRef<Path>, options: ArchiveOptions) -> Result<Self> {
        Self::new(ArchiveInput::open(path)?, options)
    }

    /// The strategy in use, with `Auto` already resolved.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub async fn records_read(&self) -> u64 {
        self.state.lock().await.records
    }
}

impl std::fmt::Debug for ArchiveReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RecordSource<LogicalRecord> for ArchiveReader {
    async fn read(&self) -> Result<Option<LogicalRecord>> {
        let mut state = self.state.lock().await;
        if let Some(job) = state.job.take() {
            let (rx, handle) = job.spawn();
            state.rx = Some(rx);
            state.producer = Some(handle);
        }

        let next = match state.rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => return Ok(None),
        };

        match next {
            Some(Ok(record)) => {
                state.records += 1;
                Ok(Some(record))
            }
            Some(Err(e)) => {
                state.rx = None;
                state.producer = None;
                Err(e)
            }
            None => {
                state.rx = None;
                if let Some(handle) = state.producer.take() {
                    handle.await.map_err(|e| {
                        PipelineError::Internal(format!("archive producer failed: {e}"))
                    })?;
                }
                info!(records = state.records, strategy = %self.strategy, "Archive exhausted");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::FieldMap;
    use std::io::Cursor;

    fn build(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        use flate2::write::GzEncoder;
        use std::io::Write;
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    async fn drain(reader: &ArchiveReader) -> Result<Vec<LogicalRecord>> {
        let mut out = Vec::new();
        while let Some(record) = reader.read().await? {
            out.push(record);
        }
        Ok(out)
    }

    fn sample_tar() -> Vec<u8> {
        build(&[
            ("a.cls", b"1"),
            ("a.jpg", b"A"),
            ("b.cls", b"2"),
            ("b.jpg", b"B"),
        ])
    }

    #[test]
    fn test_strategy_resolution() {
        let seekable = ArchiveInput::seekable(Cursor::new(Vec::new()));
        let reader = ArchiveReader::new(seekable, ArchiveOptions::default()).unwrap();
        assert_eq!(reader.strategy(), Strategy::Seek);

        let stream = ArchiveInput::stream(std::io::empty());
        let reader = ArchiveReader::new(stream, ArchiveOptions::default()).unwrap();
        assert_eq!(reader.strategy(), Strategy::Greedy);

        let stream = ArchiveInput::stream(std::io::empty());
        let err = ArchiveReader::new(stream, ArchiveOptions::default().with_strategy(Strategy::Seek))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert_eq!(format!("{reader:?}"), "ArchiveReader { strategy: Greedy, .. }");
    }

    #[tokio::test]
    async fn test_greedy_stream() {
        let input = ArchiveInput::stream(Cursor::new(sample_tar()));
        let reader = ArchiveReader::new(input, ArchiveOptions::default()).unwrap();

        let records = drain(&reader).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key(), Some("a"));
        assert_eq!(records[1].key(), Some("b"));
        for record in &records {
            assert_eq!(record.field_names(), vec!["__key__", "cls", "jpg"]);
        }
        assert!(reader.read().await.unwrap().is_none());
        assert_eq!(reader.records_read().await, 2);
    }

    #[tokio::test]
    async fn test_seek_emits_in_completion_order() {
        let bytes = build(&[
            ("b.cls", b"2"),
            ("a.cls", b"1"),
            ("b.jpg", b"B"),
            ("a.jpg", b"A"),
        ]);
        let reader = ArchiveReader::new(
            ArchiveInput::seekable(Cursor::new(bytes)),
            ArchiveOptions::default(),
        )
        .unwrap();

        let keys: Vec<_> = drain(&reader)
            .await
            .unwrap()
            .iter()
            .map(|r| r.key().unwrap().to_string())
            .collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_gzip_both_strategies() {
        let compressed = gzip(&sample_tar());
        for strategy in [Strategy::Greedy, Strategy::Seek] {
            let reader = ArchiveReader::new(
                ArchiveInput::seekable(Cursor::new(compressed.clone())),
                ArchiveOptions::default().with_strategy(strategy),
            )
            .unwrap();
            assert_eq!(drain(&reader).await.unwrap().len(), 2, "{strategy}");
        }
    }

    #[tokio::test]
    async fn test_explicit_gzip_on_plain_input_fails() {
        let reader = ArchiveReader::new(
            ArchiveInput::stream(Cursor::new(sample_tar())),
            ArchiveOptions::default().with_compression(Compression::Gzip),
        )
        .unwrap();
        assert!(reader.read().await.is_err());
        assert!(reader.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_container() {
        for input in [
            ArchiveInput::stream(Cursor::new(build(&[]))),
            ArchiveInput::seekable(Cursor::new(build(&[]))),
            ArchiveInput::stream(std::io::empty()),
        ] {
            let reader = ArchiveReader::new(input, ArchiveOptions::default()).unwrap();
            assert!(drain(&reader).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_duplicate_member_is_malformed() {
        let bytes = build(&[("a.cls", b"1"), ("a.cls", b"2")]);
        for strategy in [Strategy::Greedy, Strategy::Seek] {
            let reader = ArchiveReader::new(
                ArchiveInput::seekable(Cursor::new(bytes.clone())),
                ArchiveOptions::default().with_strategy(strategy),
            )
            .unwrap();
            let err = drain(&reader).await.unwrap_err();
            assert!(matches!(err, PipelineError::Malformed(_)), "{strategy}: {err:?}");
        }
    }

    #[tokio::test]
    async fn test_dropping_reader_mid_stream_stops_producer() {
        let entries: Vec<(String, Vec<u8>)> = (0..500)
            .map(|i| (format!("s{i:04}.bin"), vec![0u8; 16]))
            .collect();
        let refs: Vec<(&str, &[u8])> = entries
            .iter()
            .map(|(p, d)| (p.as_str(), d.as_slice()))
            .collect();
        let bytes = build(&refs);

        let reader = ArchiveReader::new(
            ArchiveInput::stream(Cursor::new(bytes)),
            ArchiveOptions::default().with_queue_capacity(2),
        )
        .unwrap();
        assert!(reader.read().await.unwrap().is_some());
        drop(reader);
    }
}
