//! Crate-wide error type for sources, stages, codecs and the pipeline sink.
//!
//! Every layer below the CLI returns [`PipelineError`]; domain failures are
//! folded in through `#[from]`.

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Which part of a framed record failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumRegion {
    Length,
    Payload,
}

impl std::fmt::Display for ChecksumRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecksumRegion::Length => f.write_str("length header"),
            ChecksumRegion::Payload => f.write_str("payload"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Stream I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed container: {0}")]
    Malformed(String),

    #[error("Checksum mismatch in {region}: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        region: ChecksumRegion,
        expected: u32,
        actual: u32,
    },

    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: u64, actual: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid record payload: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Classify an I/O error raised while parsing an archive.
    ///
    /// The tar and gzip readers report structural problems through
    /// `io::Error`; those kinds become `Malformed`, the rest stay `Io`.
    pub fn from_archive_io(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::InvalidData
            | ErrorKind::InvalidInput
            | ErrorKind::UnexpectedEof
            | ErrorKind::Other => PipelineError::Malformed(err.to_string()),
            _ => PipelineError::Io(err),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
