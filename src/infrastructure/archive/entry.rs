use bytes::Bytes;
use std::io::Read;

use crate::application::errors::{PipelineError, Result};
use crate::domain::value_objects::EntryName;

/// Cap on the up-front buffer reservation for one member.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// One regular file from the container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerEntry {
    pub path: String,
    pub name: EntryName,
    pub payload: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Names only; payloads are skipped and left empty.
    NamesOnly,
    WithPayload,
}

/// Walk every regular entry of a tar stream.
///
/// Directories and other non-regular entries are skipped. `visit` returns
/// `Ok(false)` to stop early.
pub fn scan_entries<R, F>(reader: R, mode: ScanMode, mut visit: F) -> Result<()>
where
    R: Read,
    F: FnMut(ContainerEntry) -> Result<bool>,
{
    let mut archive = tar::Archive::new(reader);
    let entries = archive.entries().map_err(PipelineError::from_archive_io)?;

    for entry in entries {
        let mut entry = entry.map_err(PipelineError::from_archive_io)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let payload = match mode {
            ScanMode::NamesOnly => Bytes::new(),
            ScanMode::WithPayload => read_payload(&mut entry, &path)?,
        };

        let name = EntryName::parse(&path);
        if !visit(ContainerEntry {
            path,
            name,
            payload,
        })? {
            break;
        }
    }
    Ok(())
}

fn read_payload<R: Read>(entry: &mut tar::Entry<'_, R>, path: &str) -> Result<Bytes> {
    let declared = entry
        .header()
        .size()
        .map_err(PipelineError::from_archive_io)?;

    let mut buf = Vec::with_capacity(declared.min(MAX_PREALLOC) as usize);
    entry
        .read_to_end(&mut buf)
        .map_err(PipelineError::from_archive_io)?;

    if buf.len() as u64 != declared {
        return Err(PipelineError::Malformed(format!(
            "{}: expected to read {} bytes, read {}",
            path,
            declared,
            buf.len()
        )));
    }
    Ok(Bytes::from(buf))
}
