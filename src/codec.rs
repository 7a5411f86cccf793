// src/codec.rs

//! Compact binary encoding for crawled records.
//!
//! Records are dynamic mappings, so they are modeled as a [`Value`] tree and
//! encoded with `bincode` (serde mode, varint). Date-times ride inside the
//! stream as a tagged mapping:
//!
//! ```text
//! { "__datetime__": true, "as_str": "20260115T09:30:00.000000" }
//! ```
//!
//! [`DecodeStream`] replays an append-only file of encoded values lazily and
//! scans forward past corruption left by a crash mid-write, so the rest of a
//! large buffer file stays usable.

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tag key marking an encoded date-time mapping.
const DATETIME_TAG: &str = "__datetime__";

/// Key holding the formatted date-time string.
const DATETIME_AS_STR: &str = "as_str";

/// Compact date-time format, microsecond precision.
const DATETIME_FORMAT: &str = "%Y%m%dT%H:%M:%S%.6f";

/// Upper bound for a single decoded value. A length prefix beyond this is
/// treated as corruption rather than allocated.
const MAX_VALUE_BYTES: usize = 64 * 1024 * 1024;

fn codec_config() -> impl bincode::config::Config {
    bincode::config::standard().with_limit::<MAX_VALUE_BYTES>()
}

/// Dynamic value model for crawled records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    DateTime(NaiveDateTime),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
}

impl Value {
    /// Convert a JSON value into the codec value model.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Borrow the inner string, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Recursively strip literal NUL characters from every string, keys
    /// included. Some crawl sources emit embedded nulls in text fields.
    pub fn scrub_nul(self) -> Self {
        match self {
            Value::Str(s) => Value::Str(s.replace('\0', "")),
            Value::List(items) => Value::List(items.into_iter().map(Value::scrub_nul).collect()),
            Value::Map(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k.replace('\0', ""), v.scrub_nul()))
                    .collect(),
            ),
            other => other,
        }
    }
}

/// Encode a value to bytes. Date-times are rewritten into their tagged
/// mapping form before serialization, so the wire format never carries a
/// date-time directly.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let tagged = tag_datetimes(value);
    Ok(bincode::serde::encode_to_vec(&tagged, codec_config())?)
}

/// Decode a single value from bytes, reviving tagged date-time mappings.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    let (value, _len): (Value, usize) = bincode::serde::decode_from_slice(bytes, codec_config())?;
    Ok(revive_datetimes(value))
}

fn tag_datetimes(value: &Value) -> Value {
    match value {
        Value::DateTime(dt) => {
            let mut fields = HashMap::new();
            fields.insert(DATETIME_TAG.to_string(), Value::Bool(true));
            fields.insert(
                DATETIME_AS_STR.to_string(),
                Value::Str(dt.format(DATETIME_FORMAT).to_string()),
            );
            Value::Map(fields)
        }
        Value::List(items) => Value::List(items.iter().map(tag_datetimes).collect()),
        Value::Map(fields) => Value::Map(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), tag_datetimes(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn revive_datetimes(value: Value) -> Value {
    match value {
        Value::Map(fields) if fields.contains_key(DATETIME_TAG) => {
            let parsed = fields
                .get(DATETIME_AS_STR)
                .and_then(Value::as_str)
                .and_then(|s| NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).ok());
            match parsed {
                Some(dt) => Value::DateTime(dt),
                None => {
                    log::warn!("error decoding datetime: {:?}", fields.get(DATETIME_AS_STR));
                    Value::Null
                }
            }
        }
        Value::List(items) => Value::List(items.into_iter().map(revive_datetimes).collect()),
        Value::Map(fields) => Value::Map(
            fields
                .into_iter()
                .map(|(k, v)| (k, revive_datetimes(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Lazy decoder over an append-only stream of encoded values.
///
/// A buffer file can be truncated mid-write by a crash. On a decode error
/// the stream switches to recovery: it advances one byte at a time looking
/// for the next offset at which a value decodes. A recovered mapping is
/// yielded and normal decoding resumes; anything else decoded during the
/// scan is a partial primitive and is discarded. Corruption never surfaces
/// to the caller — when the bytes run out, iteration ends cleanly.
pub struct DecodeStream<R: Read + Seek> {
    reader: R,
    pos: u64,
    len: u64,
    recovering: bool,
}

impl<R: Read + Seek> DecodeStream<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        Ok(Self {
            reader,
            pos: 0,
            len,
            recovering: false,
        })
    }

    /// Decode one value starting at `offset`, returning it with the offset
    /// just past its encoding.
    fn decode_at(&mut self, offset: u64) -> Result<(Value, u64)> {
        self.reader.seek(SeekFrom::Start(offset))?;
        let value: Value =
            bincode::serde::decode_from_std_read(&mut self.reader, codec_config())?;
        let end = self.reader.stream_position()?;
        Ok((value, end))
    }
}

impl<R: Read + Seek> Iterator for DecodeStream<R> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        while self.pos < self.len {
            match self.decode_at(self.pos) {
                Ok((value, end)) => {
                    if self.recovering && !matches!(value, Value::Map(_)) {
                        // Partial primitive inside the corrupt region.
                        self.pos += 1;
                        continue;
                    }
                    if self.recovering {
                        log::warn!(
                            "recovered record at byte {} after skipping corrupt data",
                            self.pos
                        );
                        self.recovering = false;
                    }
                    self.pos = end;
                    return Some(revive_datetimes(value));
                }
                Err(_) => {
                    if !self.recovering {
                        log::warn!(
                            "decode failed at byte {}, scanning forward for next record",
                            self.pos
                        );
                        self.recovering = true;
                    }
                    self.pos += 1;
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use chrono::NaiveDate;

    fn sample_datetime() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 15)
            .unwrap()
            .and_hms_micro_opt(9, 30, 0, 123_456)
            .unwrap()
    }

    fn sample_map(id: &str) -> Value {
        let mut fields = HashMap::new();
        fields.insert("id".to_string(), Value::Str(id.to_string()));
        fields.insert("likes".to_string(), Value::Int(42));
        fields.insert("ratio".to_string(), Value::Float(0.5));
        fields.insert("created_at".to_string(), Value::DateTime(sample_datetime()));
        fields.insert(
            "reply_to".to_string(),
            Value::List(vec![Value::Str("someone".to_string()), Value::Null]),
        );
        Value::Map(fields)
    }

    #[test]
    fn round_trip_nested_value() {
        let value = Value::List(vec![sample_map("a"), sample_map("b"), Value::Bool(true)]);
        let decoded = decode(&encode(&value).unwrap()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn round_trip_preserves_microseconds() {
        let value = Value::DateTime(sample_datetime());
        let decoded = decode(&encode(&value).unwrap()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn unparseable_datetime_decodes_to_null() {
        let mut fields = HashMap::new();
        fields.insert(DATETIME_TAG.to_string(), Value::Bool(true));
        fields.insert(
            DATETIME_AS_STR.to_string(),
            Value::Str("not a datetime".to_string()),
        );
        let bytes = encode(&Value::Map(fields)).unwrap();
        assert_eq!(decode(&bytes).unwrap(), Value::Null);
    }

    #[test]
    fn from_json_converts_all_shapes() {
        let json: serde_json::Value = serde_json::from_str(
            r#"{"id": "1", "n": 3, "f": 1.5, "ok": true, "none": null, "tags": ["x"]}"#,
        )
        .unwrap();
        let value = Value::from_json(json);
        let Value::Map(fields) = value else {
            panic!("expected map");
        };
        assert_eq!(fields["id"], Value::Str("1".to_string()));
        assert_eq!(fields["n"], Value::Int(3));
        assert_eq!(fields["f"], Value::Float(1.5));
        assert_eq!(fields["ok"], Value::Bool(true));
        assert_eq!(fields["none"], Value::Null);
        assert_eq!(fields["tags"], Value::List(vec![Value::Str("x".to_string())]));
    }

    #[test]
    fn scrub_nul_strips_embedded_nulls() {
        let mut fields = HashMap::new();
        fields.insert(
            "te\0xt".to_string(),
            Value::Str("he\0llo".to_string()),
        );
        fields.insert(
            "inner".to_string(),
            Value::List(vec![Value::Str("\0".to_string())]),
        );
        let Value::Map(clean) = Value::Map(fields).scrub_nul() else {
            panic!("expected map");
        };
        assert_eq!(clean["text"], Value::Str("hello".to_string()));
        assert_eq!(clean["inner"], Value::List(vec![Value::Str(String::new())]));
    }

    #[test]
    fn stream_decodes_values_in_order() {
        let mut bytes = Vec::new();
        bytes.extend(encode(&sample_map("a")).unwrap());
        bytes.extend(encode(&sample_map("b")).unwrap());
        let stream = DecodeStream::new(Cursor::new(bytes)).unwrap();
        let values: Vec<Value> = stream.collect();
        assert_eq!(values, vec![sample_map("a"), sample_map("b")]);
    }

    #[test]
    fn stream_stops_cleanly_on_trailing_garbage() {
        let mut bytes = Vec::new();
        bytes.extend(encode(&Value::List(vec![sample_map("a")])).unwrap());
        bytes.extend(encode(&Value::List(vec![sample_map("b")])).unwrap());
        bytes.extend([0xFF; 32]);
        let stream = DecodeStream::new(Cursor::new(bytes)).unwrap();
        assert_eq!(stream.count(), 2);
    }

    #[test]
    fn stream_recovers_record_after_corrupt_region() {
        let mut bytes = Vec::new();
        bytes.extend(encode(&sample_map("a")).unwrap());
        bytes.extend([0xFF; 16]);
        bytes.extend(encode(&sample_map("b")).unwrap());
        let stream = DecodeStream::new(Cursor::new(bytes)).unwrap();
        let values: Vec<Value> = stream.collect();
        assert_eq!(values.len(), 2);
        assert!(matches!(values[1], Value::Map(_)));
    }

    #[test]
    fn stream_on_empty_input_yields_nothing() {
        let stream = DecodeStream::new(Cursor::new(Vec::new())).unwrap();
        assert_eq!(stream.count(), 0);
    }
}
