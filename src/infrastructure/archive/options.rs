use flate2::read::MultiGzDecoder;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Read};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Default capacity of the greedy strategy's completion queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// How record completion is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Seek when the input supports it, greedy otherwise.
    #[default]
    Auto,
    /// Buffer the whole container, then emit every record.
    Greedy,
    /// Two passes over a seekable input; records are emitted as they complete.
    Seek,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Auto => "auto",
            Strategy::Greedy => "greedy",
            Strategy::Seek => "seek",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Strategy::Auto),
            "greedy" => Ok(Strategy::Greedy),
            "seek" => Ok(Strategy::Seek),
            _ => Err(format!("Invalid strategy: {}", s)),
        }
    }
}

/// Compression wrapped around the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    Gzip,
    /// Gzip if the stream starts with the gzip magic bytes.
    #[default]
    Auto,
}

impl Compression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Auto => "auto",
        }
    }

    /// Decide whether `reader` holds gzip data, peeking without consuming.
    pub fn is_gzip<R: BufRead>(&self, reader: &mut R) -> io::Result<bool> {
        match self {
            Compression::None => Ok(false),
            Compression::Gzip => Ok(true),
            Compression::Auto => Ok(reader.fill_buf()?.starts_with(&GZIP_MAGIC)),
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "gzip" | "gz" => Ok(Compression::Gzip),
            "auto" => Ok(Compression::Auto),
            _ => Err(format!("Invalid compression: {}", s)),
        }
    }
}

/// Wrap `input` in a gzip decoder when needed.
pub(super) fn decoded<'a, R: Read + 'a>(input: R, gzip: bool) -> Box<dyn Read + 'a> {
    if gzip {
        Box::new(MultiGzDecoder::new(input))
    } else {
        Box::new(input)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveOptions {
    pub strategy: Strategy,
    pub compression: Compression,
    pub queue_capacity: usize,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::Auto,
            compression: Compression::Auto,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl ArchiveOptions {
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }
}
