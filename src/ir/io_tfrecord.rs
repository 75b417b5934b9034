//! TFRecord files of `tf.train.Example` messages.
//!
//! # Message schema
//!
//! The `Example` family is declared here with `prost` derives instead of a
//! `build.rs` step; the wire tags match TensorFlow's `feature.proto`.
//! `Features::feature` is a `BTreeMap`, so an `Example` always serializes to
//! the same bytes.
//!
//! # Framing
//!
//! A TFRecord file is a sequence of
//!
//! ```text
//! u64  length            (little endian)
//! u32  masked_crc32c(length bytes)
//! [u8] payload
//! u32  masked_crc32c(payload)
//! ```
//!
//! where `masked_crc(c) = ((c >> 15) | (c << 17)) + 0xa282ead8`.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use prost::Message;

use crate::error::LabelRecordsError;

const MASK_DELTA: u32 = 0xa282_ead8;
const LENGTH_SIZE: usize = 8;
const CRC_SIZE: usize = 4;

// ============================================================================
// tf.train.Example messages
// ============================================================================

#[derive(Clone, PartialEq, Message)]
pub struct BytesList {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub value: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct FloatList {
    #[prost(float, repeated, tag = "1")]
    pub value: Vec<f32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Int64List {
    #[prost(int64, repeated, tag = "1")]
    pub value: Vec<i64>,
}

#[derive(Clone, PartialEq, Message)]
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

#[derive(Clone, PartialEq, Message)]
pub struct Features {
    #[prost(btree_map = "string, message", tag = "1")]
    pub feature: BTreeMap<String, Feature>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Example {
    #[prost(message, optional, tag = "1")]
    pub features: Option<Features>,
}

impl Feature {
    pub fn int64(value: i64) -> Self {
        Self::int64_list(vec![value])
    }

    pub fn int64_list(value: Vec<i64>) -> Self {
        Self {
            kind: Some(feature::Kind::Int64List(Int64List { value })),
        }
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Self::bytes_list(vec![value.into()])
    }

    pub fn bytes_list(value: Vec<Vec<u8>>) -> Self {
        Self {
            kind: Some(feature::Kind::BytesList(BytesList { value })),
        }
    }

    pub fn float_list(value: Vec<f32>) -> Self {
        Self {
            kind: Some(feature::Kind::FloatList(FloatList { value })),
        }
    }

    /// Returns the int64 values, or `None` for other feature kinds.
    pub fn as_int64_list(&self) -> Option<&[i64]> {
        match &self.kind {
            Some(feature::Kind::Int64List(list)) => Some(&list.value),
            _ => None,
        }
    }

    /// Returns the float values, or `None` for other feature kinds.
    pub fn as_float_list(&self) -> Option<&[f32]> {
        match &self.kind {
            Some(feature::Kind::FloatList(list)) => Some(&list.value),
            _ => None,
        }
    }

    /// Returns the byte-string values, or `None` for other feature kinds.
    pub fn as_bytes_list(&self) -> Option<&[Vec<u8>]> {
        match &self.kind {
            Some(feature::Kind::BytesList(list)) => Some(&list.value),
            _ => None,
        }
    }
}

impl Example {
    /// Builds an example from `(key, feature)` pairs.
    pub fn from_features<K: Into<String>>(features: impl IntoIterator<Item = (K, Feature)>) -> Self {
        Self {
            features: Some(Features {
                feature: features
                    .into_iter()
                    .map(|(key, feature)| (key.into(), feature))
                    .collect(),
            }),
        }
    }

    /// Looks up a feature by key.
    pub fn get(&self, key: &str) -> Option<&Feature> {
        self.features.as_ref()?.feature.get(key)
    }
}

// ============================================================================
// Writer
// ============================================================================

/// Appends framed records to an underlying writer.
pub struct TfRecordWriter<W: Write> {
    inner: W,
}

impl<W: Write> TfRecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Frames and writes one serialized payload.
    pub fn write_record(&mut self, payload: &[u8]) -> io::Result<()> {
        let length = (payload.len() as u64).to_le_bytes();
        self.inner.write_all(&length)?;
        self.inner.write_all(&masked_crc32c(&length).to_le_bytes())?;
        self.inner.write_all(payload)?;
        self.inner.write_all(&masked_crc32c(payload).to_le_bytes())?;
        Ok(())
    }

    /// Serializes and writes one example.
    pub fn write_example(&mut self, example: &Example) -> io::Result<()> {
        self.write_record(&example.encode_to_vec())
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// CRC32C in the masked form TFRecord stores.
pub fn masked_crc32c(data: &[u8]) -> u32 {
    let crc = crc32c::crc32c(data);
    ((crc >> 15) | (crc << 17)).wrapping_add(MASK_DELTA)
}

// ============================================================================
// Reader
// ============================================================================

/// Reads every example from a TFRecord file.
pub fn read_tfrecord_file(path: &Path) -> Result<Vec<Example>, LabelRecordsError> {
    let bytes = fs::read(path).map_err(|source| LabelRecordsError::RecordRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_tfrecords(&bytes, path)
}

/// Decodes examples from TFRecord bytes.
///
/// Useful for fuzzing and for checking output in tests.
pub fn from_tfrecord_slice(bytes: &[u8]) -> Result<Vec<Example>, LabelRecordsError> {
    parse_tfrecords(bytes, Path::new("<bytes>"))
}

fn parse_tfrecords(bytes: &[u8], path: &Path) -> Result<Vec<Example>, LabelRecordsError> {
    let mut examples = Vec::new();
    let mut rest = bytes;

    while !rest.is_empty() {
        let index = examples.len();
        let corrupt = |message: String| LabelRecordsError::RecordParse {
            path: path.to_path_buf(),
            index,
            message,
        };

        let (length_bytes, tail) = split_checked(rest, LENGTH_SIZE)
            .ok_or_else(|| corrupt("truncated length header".to_string()))?;
        let (length_crc, tail) = split_checked(tail, CRC_SIZE)
            .ok_or_else(|| corrupt("truncated length checksum".to_string()))?;
        if read_u32(length_crc) != masked_crc32c(length_bytes) {
            return Err(corrupt("length checksum mismatch".to_string()));
        }

        let length = u64::from_le_bytes(
            length_bytes
                .try_into()
                .map_err(|_| corrupt("bad length header".to_string()))?,
        );
        let length = usize::try_from(length)
            .ok()
            .filter(|len| *len <= tail.len())
            .ok_or_else(|| corrupt(format!("record length {length} exceeds remaining input")))?;

        let (payload, tail) = tail.split_at(length);
        let (payload_crc, tail) = split_checked(tail, CRC_SIZE)
            .ok_or_else(|| corrupt("truncated payload checksum".to_string()))?;
        if read_u32(payload_crc) != masked_crc32c(payload) {
            return Err(corrupt("payload checksum mismatch".to_string()));
        }

        let example = Example::decode(payload).map_err(|e| corrupt(e.to_string()))?;
        examples.push(example);
        rest = tail;
    }

    Ok(examples)
}

fn split_checked(bytes: &[u8], at: usize) -> Option<(&[u8], &[u8])> {
    if bytes.len() < at {
        None
    } else {
        Some(bytes.split_at(at))
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; CRC_SIZE];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_example() -> Example {
        Example::from_features([
            ("image/height", Feature::int64(480)),
            ("image/format", Feature::bytes("png")),
            ("image/object/bbox/xmin", Feature::float_list(vec![0.1, 0.5])),
        ])
    }

    fn write_all(examples: &[Example]) -> Vec<u8> {
        let mut writer = TfRecordWriter::new(Vec::new());
        for example in examples {
            writer.write_example(example).unwrap();
        }
        writer.into_inner().unwrap()
    }

    #[test]
    fn masked_crc_of_empty_input_is_mask_delta() {
        assert_eq!(masked_crc32c(&[]), MASK_DELTA);
    }

    #[test]
    fn frame_layout_matches_tfrecord() {
        let example = sample_example();
        let payload = example.encode_to_vec();
        let bytes = write_all(&[example]);

        assert_eq!(bytes.len(), LENGTH_SIZE + CRC_SIZE + payload.len() + CRC_SIZE);
        assert_eq!(
            u64::from_le_bytes(bytes[..8].try_into().unwrap()),
            payload.len() as u64
        );
        assert_eq!(&bytes[12..12 + payload.len()], payload.as_slice());
    }

    #[test]
    fn reads_back_multiple_records() {
        let first = sample_example();
        let second = Example::from_features([("image/width", Feature::int64(640))]);
        let bytes = write_all(&[first.clone(), second.clone()]);

        let examples = from_tfrecord_slice(&bytes).unwrap();
        assert_eq!(examples, vec![first, second]);
        assert_eq!(
            examples[0].get("image/height").and_then(Feature::as_int64_list),
            Some(&[480][..])
        );
    }

    #[test]
    fn serialization_is_independent_of_insertion_order() {
        let a = Example::from_features([
            ("b", Feature::int64(1)),
            ("a", Feature::int64(2)),
        ]);
        let b = Example::from_features([
            ("a", Feature::int64(2)),
            ("b", Feature::int64(1)),
        ]);
        assert_eq!(a.encode_to_vec(), b.encode_to_vec());
    }

    #[test]
    fn detects_payload_corruption() {
        let mut bytes = write_all(&[sample_example()]);
        bytes[14] ^= 0xff;
        let err = from_tfrecord_slice(&bytes).unwrap_err();
        assert!(matches!(err, LabelRecordsError::RecordParse { index: 0, .. }));
    }

    #[test]
    fn detects_truncation() {
        let bytes = write_all(&[sample_example()]);
        assert!(from_tfrecord_slice(&bytes[..bytes.len() - 1]).is_err());
        assert!(from_tfrecord_slice(&bytes[..5]).is_err());
    }

    #[test]
    fn missing_record_file_names_its_path() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("train-07.record");
        let err = read_tfrecord_file(&path).unwrap_err();
        assert!(matches!(err, LabelRecordsError::RecordRead { .. }));
        assert!(err.to_string().contains("train-07.record"));
    }

    #[test]
    fn empty_input_has_no_records() {
        assert!(from_tfrecord_slice(&[]).unwrap().is_empty());
    }
}
