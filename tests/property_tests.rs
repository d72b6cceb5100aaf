//! Property-based tests using proptest
//!
//! These tests generate many random inputs to test invariants that should hold
//! for all records, containers and streams.

use bytes::Bytes;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tarpipe::entities::{LogicalRecord, WireRecord};
use tarpipe::infrastructure::archive::{ContainerEntry, ExpectedMemberSet, SeekAssembler};
use tarpipe::value_objects::{EntryName, Feature};
use tarpipe::{MemorySource, PipelineError, RecordWriter, SourceRef, StageChain};

use test_fixtures::{build_tar, decode_stream, drain, reader_with, sorted_by_key};

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
        .block_on(future)
}

/// Strategy for generating features of every kind. Floats stay finite so
/// equality is meaningful.
fn feature_strategy() -> impl Strategy<Value = Feature> {
    prop_oneof![
        prop::collection::vec(any::<i64>(), 0..6).prop_map(Feature::Int64List),
        prop::collection::vec(-1.0e6f32..1.0e6f32, 0..6).prop_map(Feature::FloatList),
        prop::collection::vec(prop::collection::vec(any::<u8>(), 0..48), 0..4)
            .prop_map(|v| Feature::BytesList(v.into_iter().map(Bytes::from).collect())),
    ]
}

fn wire_record_strategy() -> impl Strategy<Value = WireRecord> {
    prop::collection::btree_map("[a-z_]{1,10}", feature_strategy(), 0..6)
        .prop_map(|features| features.into_iter().collect())
}

/// Unique (basename, field) members in a random container order.
fn members_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::btree_set((0u8..6, 0u8..4), 0..20)
        .prop_map(|set| {
            set.into_iter()
                .map(|(b, f)| (format!("sample{b}"), format!("f{f}")))
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

fn logical_record_strategy() -> impl Strategy<Value = LogicalRecord> {
    prop_oneof![
        Just(LogicalRecord::empty()),
        "[a-z]{1,6}".prop_map(LogicalRecord::new),
        ("[a-z]{1,6}", prop::collection::btree_map("[a-z]{1,4}", any::<u8>(), 1..4)).prop_map(
            |(key, fields)| {
                let mut record = LogicalRecord::new(key);
                for (name, value) in fields {
                    record.insert(name, vec![value]);
                }
                record
            }
        ),
    ]
}

fn encode(records: &[WireRecord]) -> Vec<u8> {
    block_on(async {
        let mut writer = RecordWriter::new(Vec::new());
        for record in records {
            writer.write_record(record.clone()).await.unwrap();
        }
        writer.into_inner()
    })
}

proptest! {
    #[test]
    fn test_record_stream_round_trip(records in prop::collection::vec(wire_record_strategy(), 0..8)) {
        let bytes = encode(&records);
        let decoded = block_on(decode_stream(&bytes)).unwrap();
        prop_assert_eq!(decoded, records);
    }

    #[test]
    fn test_any_bit_flip_is_a_checksum_mismatch(
        record in wire_record_strategy(),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let mut bytes = encode(&[record]);
        let index = position.index(bytes.len());
        bytes[index] ^= 1 << bit;

        let result = block_on(decode_stream(&bytes));
        prop_assert!(
            matches!(result, Err(PipelineError::ChecksumMismatch { .. })),
            "flip at byte {} bit {}: {:?}", index, bit, result
        );
    }

    #[test]
    fn test_greedy_and_seek_yield_same_records(members in members_strategy()) {
        let tar_members: Vec<(String, Vec<u8>)> = members
            .iter()
            .map(|(b, f)| (format!("{b}.{f}"), format!("{b}:{f}").into_bytes()))
            .collect();
        let bytes = build_tar(&tar_members);

        let greedy = block_on(async {
            drain(&reader_with(bytes.clone(), tarpipe::Strategy::Greedy)).await
        })
        .unwrap();
        let seek = block_on(async {
            drain(&reader_with(bytes.clone(), tarpipe::Strategy::Seek)).await
        })
        .unwrap();

        let basenames: BTreeSet<_> = members.iter().map(|(b, _)| b.clone()).collect();
        prop_assert_eq!(greedy.len(), basenames.len());
        prop_assert_eq!(sorted_by_key(greedy), sorted_by_key(seek));
    }

    #[test]
    fn test_seek_completes_at_last_member(members in members_strategy()) {
        let mut expected = ExpectedMemberSet::new();
        let mut sizes: HashMap<String, usize> = HashMap::new();
        for (b, f) in &members {
            expected.add(&EntryName::parse(&format!("{b}.{f}"))).unwrap();
            *sizes.entry(b.clone()).or_default() += 1;
        }

        let mut assembler = SeekAssembler::new(expected);
        let mut seen: HashMap<String, usize> = HashMap::new();
        for (b, f) in &members {
            let path = format!("{b}.{f}");
            let entry = ContainerEntry {
                name: EntryName::parse(&path),
                path,
                payload: Bytes::from_static(b"x"),
            };
            let count = seen.entry(b.clone()).or_default();
            *count += 1;

            let completed = assembler.push(entry).unwrap();
            if *count == sizes[b] {
                let record = completed.expect("record should complete at its last member");
                prop_assert_eq!(record.key(), Some(b.as_str()));
                prop_assert_eq!(record.len(), sizes[b] + 1);
            } else {
                prop_assert!(completed.is_none());
            }
        }
        prop_assert_eq!(assembler.pending(), 0);
        prop_assert!(assembler.finish().is_ok());
    }

    #[test]
    fn test_skip_empty_is_idempotent(records in prop::collection::vec(logical_record_strategy(), 0..12)) {
        let once = block_on(async {
            let source: SourceRef<LogicalRecord> = Arc::new(MemorySource::new(records.clone()));
            drain(&*StageChain::<LogicalRecord>::new().skip_empty().attach(source)).await
        })
        .unwrap();
        let twice = block_on(async {
            let source: SourceRef<LogicalRecord> = Arc::new(MemorySource::new(records.clone()));
            let chain = StageChain::<LogicalRecord>::new().skip_empty().skip_empty();
            drain(&*chain.attach(source)).await
        })
        .unwrap();

        let expected: Vec<_> = records
            .into_iter()
            .filter(|r| !(r.is_empty() || (r.len() == 1 && r.key().is_some())))
            .collect();
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once, expected);
    }

    #[test]
    fn test_wire_record_field_map_collects(features in prop::collection::btree_map("[a-z]{1,6}", feature_strategy(), 0..5)) {
        let record: WireRecord = features.clone().into_iter().collect();
        let back: BTreeMap<String, Feature> = record.into_features();
        prop_assert_eq!(back, features);
    }
}
