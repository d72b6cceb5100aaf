//! Working state for grouping container entries into logical records.

use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::entry::ContainerEntry;
use crate::application::errors::{PipelineError, Result};
use crate::domain::entities::{LogicalRecord, KEY_FIELD};
use crate::domain::errors::DomainError;
use crate::domain::value_objects::EntryName;

type Members = BTreeMap<String, Bytes>;

fn malformed(err: DomainError) -> PipelineError {
    PipelineError::Malformed(err.to_string())
}

fn check_field(name: &EntryName) -> Result<()> {
    if name.field() == KEY_FIELD {
        return Err(malformed(DomainError::ReservedField(KEY_FIELD.to_string())));
    }
    Ok(())
}

/// Basename → partially accumulated members.
///
/// A present basename always has at least one member.
#[derive(Debug, Default)]
pub struct PendingRecordSet {
    records: BTreeMap<String, Members>,
}

impl PendingRecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one member; returns how many members its record now holds.
    pub fn add(&mut self, name: EntryName, payload: Bytes) -> Result<usize> {
        check_field(&name)?;
        let (basename, field) = name.into_parts();
        let members = self.records.entry(basename.clone()).or_default();
        if members.contains_key(&field) {
            return Err(malformed(DomainError::DuplicateMember { basename, field }));
        }
        members.insert(field, payload);
        Ok(members.len())
    }

    /// Remove and finalize one record.
    pub fn take(&mut self, basename: &str) -> Option<Result<LogicalRecord>> {
        let members = self.records.remove(basename)?;
        Some(LogicalRecord::from_members(basename, members).map_err(malformed))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn basenames(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Finalize everything, in ascending basename order.
    pub fn into_records(self) -> impl Iterator<Item = Result<LogicalRecord>> {
        self.records.into_iter().map(|(basename, members)| {
            LogicalRecord::from_members(basename, members).map_err(malformed)
        })
    }
}

/// Basename → complete member set, collected by the first seek pass.
#[derive(Debug, Default)]
pub struct ExpectedMemberSet {
    expected: HashMap<String, BTreeSet<String>>,
}

impl ExpectedMemberSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &EntryName) -> Result<()> {
        check_field(name)?;
        let fields = self.expected.entry(name.basename().to_string()).or_default();
        if !fields.insert(name.field().to_string()) {
            return Err(malformed(DomainError::DuplicateMember {
                basename: name.basename().to_string(),
                field: name.field().to_string(),
            }));
        }
        Ok(())
    }

    pub fn get(&self, basename: &str) -> Option<&BTreeSet<String>> {
        self.expected.get(basename)
    }

    fn remove(&mut self, basename: &str) {
        self.expected.remove(basename);
    }

    /// Number of records still expected.
    pub fn len(&self) -> usize {
        self.expected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expected.is_empty()
    }
}

/// Second-pass state of the seek strategy.
///
/// A record is released by the `push` that supplies its last expected member.
/// Members of one basename need not be adjacent; a completed record leaves the
/// expected set, so any later entry for it is rejected.
#[derive(Debug)]
pub struct SeekAssembler {
    expected: ExpectedMemberSet,
    pending: PendingRecordSet,
}

impl SeekAssembler {
    pub fn new(expected: ExpectedMemberSet) -> Self {
        Self {
            expected,
            pending: PendingRecordSet::new(),
        }
    }

    pub fn push(&mut self, entry: ContainerEntry) -> Result<Option<LogicalRecord>> {
        let basename = entry.name.basename();
        let expected = match self.expected.get(basename) {
            Some(fields) if fields.contains(entry.name.field()) => fields.len(),
            _ => {
                return Err(PipelineError::Malformed(format!(
                    "{}: entry was not present in the first pass",
                    entry.path
                )))
            }
        };

        let basename = basename.to_string();
        let held = self.pending.add(entry.name, entry.payload)?;
        if held < expected {
            return Ok(None);
        }

        self.expected.remove(&basename);
        let record = match self.pending.take(&basename) {
            Some(record) => record?,
            None => {
                return Err(PipelineError::Internal(format!(
                    "record {basename:?} vanished before completion"
                )))
            }
        };
        Ok(Some(record))
    }

    /// Records still waiting for members.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Check that the pass ended with nothing half-assembled.
    pub fn finish(self) -> Result<()> {
        if let Some(basename) = self.pending.basenames().next() {
            return Err(PipelineError::Malformed(format!(
                "record {:?} incomplete at end of archive ({} records pending)",
                basename,
                self.pending.len()
            )));
        }
        if !self.expected.is_empty() {
            return Err(PipelineError::Malformed(format!(
                "{} records from the first pass never appeared",
                self.expected.len()
            )));
        }
        Ok(())
    }
}
