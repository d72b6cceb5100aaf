use std::io::{Read, Seek, SeekFrom};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::assembler::{ExpectedMemberSet, SeekAssembler};
use super::entry::{scan_entries, ScanMode};
use super::options::decoded;
use crate::application::errors::Result;
use crate::domain::entities::LogicalRecord;

/// Collect the member names of every record without reading payloads.
pub(super) fn first_pass<R: Read>(reader: R) -> Result<ExpectedMemberSet> {
    let mut expected = ExpectedMemberSet::new();
    let mut entries = 0u64;
    scan_entries(reader, ScanMode::NamesOnly, |entry| {
        expected.add(&entry.name)?;
        entries += 1;
        Ok(true)
    })?;
    info!(entries, records = expected.len(), "First archive pass complete");
    Ok(expected)
}

/// Two passes over a seekable container; each record is sent the moment its
/// last expected member has been read.
pub(super) fn produce<R: Read + Seek>(
    mut input: R,
    gzip: bool,
    out: &mpsc::Sender<Result<LogicalRecord>>,
) -> Result<()> {
    let start = input.stream_position()?;
    let expected = first_pass(decoded(&mut input, gzip))?;
    input.seek(SeekFrom::Start(start))?;

    let mut assembler = SeekAssembler::new(expected);
    let mut stopped = false;
    scan_entries(decoded(&mut input, gzip), ScanMode::WithPayload, |entry| {
        if let Some(record) = assembler.push(entry)? {
            debug!(key = ?record.key(), fields = record.len(), "Record complete");
            if out.blocking_send(Ok(record)).is_err() {
                stopped = true;
                return Ok(false);
            }
        }
        Ok(true)
    })?;

    if stopped {
        debug!("Record consumer dropped, stopping");
        return Ok(());
    }
    assembler.finish()
}
