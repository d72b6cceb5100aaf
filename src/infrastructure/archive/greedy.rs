use std::io::Read;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::assembler::PendingRecordSet;
use super::entry::{scan_entries, ScanMode};
use crate::application::errors::Result;
use crate::domain::entities::LogicalRecord;

/// Drain the whole container, then hand every record to `out`.
///
/// No record can be proven complete before the end of a one-pass stream, so
/// nothing is emitted until the container is exhausted.
pub(super) fn produce<R: Read>(reader: R, out: &mpsc::Sender<Result<LogicalRecord>>) -> Result<()> {
    let mut pending = PendingRecordSet::new();
    let mut entries = 0u64;

    scan_entries(reader, ScanMode::WithPayload, |entry| {
        if out.is_closed() {
            return Ok(false);
        }
        pending.add(entry.name, entry.payload)?;
        entries += 1;
        Ok(true)
    })?;

    info!(entries, records = pending.len(), "Archive drained");

    for record in pending.into_records() {
        if out.blocking_send(Ok(record?)).is_err() {
            debug!("Record consumer dropped, stopping");
            break;
        }
    }
    Ok(())
}
