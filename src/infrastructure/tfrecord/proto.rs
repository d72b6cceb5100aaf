//! `tf.Example` messages, declared with prost derives.
//!
//! Field numbers follow `tensorflow/core/example/{example,feature}.proto`, so
//! payloads are readable by any TFRecord consumer.

use bytes::Bytes;
use prost::Message;
use std::collections::BTreeMap;

use crate::application::errors::Result;
use crate::domain::entities::WireRecord;
use crate::domain::value_objects::Feature as WireFeature;

#[derive(Clone, PartialEq, prost::Message)]
pub struct BytesList {
    #[prost(bytes = "bytes", repeated, tag = "1")]
    pub value: Vec<Bytes>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FloatList {
    #[prost(float, repeated, tag = "1")]
    pub value: Vec<f32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Int64List {
    #[prost(int64, repeated, tag = "1")]
    pub value: Vec<i64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Feature {
    #[prost(oneof = "feature::Kind", tags = "1, 2, 3")]
    pub kind: Option<feature::Kind>,
}

pub mod feature {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        BytesList(super::BytesList),
        #[prost(message, tag = "2")]
        FloatList(super::FloatList),
        #[prost(message, tag = "3")]
        Int64List(super::Int64List),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Features {
    #[prost(btree_map = "string, message", tag = "1")]
    pub feature: BTreeMap<String, Feature>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Example {
    #[prost(message, optional, tag = "1")]
    pub features: Option<Features>,
}

impl From<WireFeature> for Feature {
    fn from(value: WireFeature) -> Self {
        let kind = match value {
            WireFeature::BytesList(value) => feature::Kind::BytesList(BytesList { value }),
            WireFeature::FloatList(value) => feature::Kind::FloatList(FloatList { value }),
            WireFeature::Int64List(value) => feature::Kind::Int64List(Int64List { value }),
        };
        Feature { kind: Some(kind) }
    }
}

impl From<Feature> for WireFeature {
    fn from(value: Feature) -> Self {
        match value.kind {
            Some(feature::Kind::BytesList(list)) => WireFeature::BytesList(list.value),
            Some(feature::Kind::FloatList(list)) => WireFeature::FloatList(list.value),
            Some(feature::Kind::Int64List(list)) => WireFeature::Int64List(list.value),
            None => WireFeature::BytesList(Vec::new()),
        }
    }
}

impl From<WireRecord> for Example {
    fn from(record: WireRecord) -> Self {
        let feature = record
            .into_features()
            .into_iter()
            .map(|(name, f)| (name, Feature::from(f)))
            .collect();
        Example {
            features: Some(Features { feature }),
        }
    }
}

impl From<Example> for WireRecord {
    fn from(example: Example) -> Self {
        example
            .features
            .map(|f| f.feature)
            .unwrap_or_default()
            .into_iter()
            .map(|(name, f)| (name, WireFeature::from(f)))
            .collect()
    }
}

pub fn encode_wire_record(record: WireRecord) -> Vec<u8> {
    Example::from(record).encode_to_vec()
}

pub fn decode_wire_record(payload: &[u8]) -> Result<WireRecord> {
    Ok(Example::decode(payload)?.into())
}
